//! Image gallery loaders.
//!
//! Both galleries render from a single listing request; card image sources
//! are plain paths, so no per-item request is made.

use serde::Deserialize;
use tracing::{info, warn};

use crate::console::Console;
use crate::error::{ConsoleError, Result};
use crate::page::{Gallery, ImageCard};

pub const LIST_PATH: &str = "/image/list";
pub const ADMIN_LIST_PATH: &str = "/admin/list_images";

pub const EMPTY_GALLERY: &str = "No images found in the gallery.";
pub const LOAD_FAILED: &str = "Failed to load images.";
pub const LOAD_ERROR: &str = "Error loading images. Check console for details.";

/// One entry of `GET /image/list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageEntry {
    pub key: String,
}

/// Body of `GET /admin/list_images`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminImageList {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

pub fn user_card(entry: &ImageEntry) -> ImageCard {
    ImageCard {
        name: entry.key.clone(),
        src: format!("/images/{}", entry.key),
        link: None,
    }
}

pub fn admin_card(filename: &str) -> ImageCard {
    let path = format!("/admin/view_image/{filename}");
    ImageCard {
        name: filename.to_string(),
        src: path.clone(),
        link: Some(path),
    }
}

impl Console {
    /// Fetch the user gallery and render it. Failures replace the gallery
    /// with a fixed message; the returned count is the number of cards shown.
    pub async fn load_user_gallery(&self) -> Result<usize> {
        let resp = match self.api.get(LIST_PATH).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "gallery request failed");
                self.page.set_gallery(Gallery::Message(LOAD_ERROR.into()));
                return Err(e);
            }
        };
        if !resp.is_success() {
            warn!(status = resp.status, "gallery listing refused");
            self.page.set_gallery(Gallery::Message(LOAD_FAILED.into()));
            return Err(ConsoleError::protocol(Some(resp.status), LOAD_FAILED));
        }
        let entries: Vec<ImageEntry> = match resp.json() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "gallery listing undecodable");
                self.page.set_gallery(Gallery::Message(LOAD_ERROR.into()));
                return Err(e);
            }
        };

        let count = entries.len();
        if entries.is_empty() {
            self.page.set_gallery(Gallery::Message(EMPTY_GALLERY.into()));
        } else {
            self.page
                .set_gallery(Gallery::Cards(entries.iter().map(user_card).collect()));
        }
        info!(count, "gallery rendered");
        Ok(count)
    }

    /// Fetch the admin gallery. On any failure the gallery is emptied and an
    /// error notification carries the server message when there is one.
    pub async fn load_admin_gallery(&self) -> Result<usize> {
        let listing = self
            .api
            .get(ADMIN_LIST_PATH)
            .await
            .and_then(|resp| resp.json::<AdminImageList>());

        match listing {
            Ok(list) if list.success => {
                let cards: Vec<ImageCard> = list.images.iter().map(|f| admin_card(f)).collect();
                let count = cards.len();
                self.page.set_gallery(Gallery::Cards(cards));
                info!(count, "admin gallery rendered");
                Ok(count)
            }
            Ok(list) => {
                let message = list
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Failed to fetch images".to_string());
                warn!(%message, "admin gallery refused");
                self.page.set_gallery(Gallery::Cards(Vec::new()));
                self.notify_error(message.clone());
                Err(ConsoleError::protocol(None, message))
            }
            Err(e) => {
                warn!(error = %e, "admin gallery failed");
                self.page.set_gallery(Gallery::Cards(Vec::new()));
                self.notify_error("Failed to fetch images");
                Err(e)
            }
        }
    }

    /// The image-management tab was activated: refresh the admin gallery.
    pub async fn activate_image_tab(&self) -> Result<usize> {
        self.load_admin_gallery().await
    }
}
