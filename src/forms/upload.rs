//! Image upload forms: the user-facing one (`/image/upload`, tied to the
//! logged-in user) and the admin one (`/admin/upload_image`).

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{SubmitOutcome, ADMIN_UPLOAD_FORM, UPLOAD_FORM};
use crate::console::Console;
use crate::error::{ConsoleError, Result};

pub const UPLOAD_PATH: &str = "/image/upload";
pub const ADMIN_UPLOAD_PATH: &str = "/admin/upload_image";

/// A file picked in a file input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk; its file name becomes the upload name.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { name, bytes })
    }

    fn part(&self) -> Part {
        Part::bytes(self.bytes.clone()).file_name(self.name.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub file: Option<SelectedFile>,
}

impl UploadForm {
    pub fn with_file(file: SelectedFile) -> Self {
        Self { file: Some(file) }
    }

    pub fn reset(&mut self) {
        self.file = None;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminUploadForm {
    pub file: Option<SelectedFile>,
}

impl AdminUploadForm {
    pub fn with_file(file: SelectedFile) -> Self {
        Self { file: Some(file) }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl UploadResponse {
    fn reason(self) -> Option<String> {
        self.detail.or(self.message).filter(|m| !m.is_empty())
    }
}

impl Console {
    /// Upload an image on behalf of the logged-in user.
    pub async fn submit_upload(&self, form: &mut UploadForm) -> SubmitOutcome {
        let Some(username) = self.session.logged_in_user() else {
            return self.reject("You must be logged in to upload images.");
        };
        let Some(file) = form.file.clone() else {
            return self.reject("Please select a file to upload.");
        };
        let Some(_permit) = self.guards.upload.try_acquire() else {
            debug!("upload already in flight, ignoring submit");
            return SubmitOutcome::Ignored;
        };
        let _controls = self.page.disable_form(UPLOAD_FORM);

        let multipart = Form::new()
            .part("image", file.part())
            .text("username", username.clone());
        let resp = match self.api.post_multipart(UPLOAD_PATH, multipart).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, file = %file.name, "upload request failed");
                self.notify_error("Error uploading image. Check console for details.");
                return SubmitOutcome::Failed(e);
            }
        };

        let body = match resp.json::<UploadResponse>() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, status = resp.status, "upload response undecodable");
                self.notify_error("Error uploading image. Check console for details.");
                return SubmitOutcome::Failed(e);
            }
        };

        if resp.is_success() && body.success != Some(false) {
            info!(%username, file = %file.name, bytes = file.bytes.len(), "image uploaded");
            self.notify_success("Image uploaded successfully!");
            form.reset();
            SubmitOutcome::Succeeded
        } else {
            let message = body.reason().unwrap_or_else(|| "Upload failed.".to_string());
            warn!(status = resp.status, %message, "upload refused");
            self.notify_error(message.clone());
            SubmitOutcome::Failed(ConsoleError::protocol(Some(resp.status), message))
        }
    }

    /// Upload an image through the admin panel, then refresh the admin
    /// gallery. The file input is cleared on success.
    pub async fn submit_admin_upload(&self, form: &mut AdminUploadForm) -> SubmitOutcome {
        let Some(file) = form.file.clone() else {
            return self.reject("Please select a file to upload.");
        };
        let Some(_permit) = self.guards.admin_upload.try_acquire() else {
            debug!("admin upload already in flight, ignoring submit");
            return SubmitOutcome::Ignored;
        };

        let outcome = {
            let _controls = self.page.disable_form(ADMIN_UPLOAD_FORM);
            self.send_admin_upload(&file).await
        };
        if outcome.is_success() {
            form.file = None;
            if let Err(e) = self.load_admin_gallery().await {
                debug!(error = %e, "gallery refresh after upload failed");
            }
        }
        outcome
    }

    async fn send_admin_upload(&self, file: &SelectedFile) -> SubmitOutcome {
        let multipart = Form::new().part("image", file.part());
        let result = self
            .api
            .post_multipart(ADMIN_UPLOAD_PATH, multipart)
            .await
            .and_then(|resp| resp.json::<UploadResponse>().map(|body| (resp.status, body)));

        match result {
            Ok((_, body)) if body.success == Some(true) => {
                info!(file = %file.name, "admin image uploaded");
                self.notify_success("Image uploaded successfully");
                SubmitOutcome::Succeeded
            }
            Ok((status, body)) => {
                let message = body
                    .reason()
                    .unwrap_or_else(|| "Image upload failed".to_string());
                warn!(status, %message, "admin upload refused");
                self.notify_error(message.clone());
                SubmitOutcome::Failed(ConsoleError::protocol(Some(status), message))
            }
            Err(e) => {
                warn!(error = %e, "admin upload failed");
                self.notify_error("Image upload failed");
                SubmitOutcome::Failed(e)
            }
        }
    }
}
