//! Form handlers.
//!
//! Every handler follows the same shape: validate required fields, take the
//! form's [`SubmissionGuard`](crate::guard::SubmissionGuard), disable its
//! controls, issue one request, then report the outcome through the toaster.
//! Guard and disabled state are released when the handler returns, whatever
//! the outcome. Failed submissions leave the form populated for correction.

pub mod auth;
pub mod node;
pub mod upload;

pub use auth::{LoginForm, SignupForm};
pub use node::{AddNodeForm, NodeConfig};
pub use upload::{AdminUploadForm, SelectedFile, UploadForm};

use crate::error::ConsoleError;

/// Form identifiers, as used for the page's disabled-form set.
pub const LOGIN_FORM: &str = "loginForm";
pub const SIGNUP_FORM: &str = "signupForm";
pub const LOGOUT_ACTION: &str = "logout";
pub const NODE_FORM: &str = "nodeForm";
pub const UPLOAD_FORM: &str = "uploadForm";
pub const ADMIN_UPLOAD_FORM: &str = "adminUploadForm";

/// What a submit did.
#[derive(Debug)]
pub enum SubmitOutcome {
    Succeeded,
    Failed(ConsoleError),
    /// Another submission of the same form was still in flight; nothing sent.
    Ignored,
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded)
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, SubmitOutcome::Ignored)
    }

    pub fn error(&self) -> Option<&ConsoleError> {
        match self {
            SubmitOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// `true` when the field is empty after trimming.
pub(crate) fn blank(field: &str) -> bool {
    field.trim().is_empty()
}
