//! Login, signup and logout.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{blank, SubmitOutcome, LOGIN_FORM, LOGOUT_ACTION, SIGNUP_FORM};
use crate::console::Console;
use crate::error::ConsoleError;

pub const LOGIN_PATH: &str = "/auth/login";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    username: &'a str,
    password: &'a str,
    confirm_password: &'a str,
}

/// Messages one auth flow reports with.
struct AuthMessages {
    success: &'static str,
    refused: &'static str,
    network: &'static str,
}

const LOGIN_MESSAGES: AuthMessages = AuthMessages {
    success: "Login successful!",
    refused: "Login failed",
    network: "An error occurred during login",
};

const SIGNUP_MESSAGES: AuthMessages = AuthMessages {
    success: "Signup successful!",
    refused: "Signup failed",
    network: "An error occurred during signup",
};

impl Console {
    /// Submit the login form.
    ///
    /// On success the username is stored in the session, the form is reset
    /// and a redirect to `/` is scheduled after the configured delay.
    pub async fn submit_login(&self, form: &mut LoginForm) -> SubmitOutcome {
        if blank(&form.username) || blank(&form.password) {
            return self.reject("Username and password are required");
        }
        let Some(_permit) = self.guards.login.try_acquire() else {
            debug!("login already in flight, ignoring submit");
            return SubmitOutcome::Ignored;
        };
        let _controls = self.page.disable_form(LOGIN_FORM);

        let body = LoginRequest {
            username: &form.username,
            password: &form.password,
        };
        let result = self.api.post_json(LOGIN_PATH, &body).await;
        let outcome = self.finish_auth(result, &form.username, &LOGIN_MESSAGES);
        if outcome.is_success() {
            form.reset();
        }
        outcome
    }

    /// Submit the signup form. Password confirmation is checked server-side.
    pub async fn submit_signup(&self, form: &mut SignupForm) -> SubmitOutcome {
        if blank(&form.username) || blank(&form.password) || blank(&form.confirm_password) {
            return self.reject("All fields are required");
        }
        let Some(_permit) = self.guards.signup.try_acquire() else {
            debug!("signup already in flight, ignoring submit");
            return SubmitOutcome::Ignored;
        };
        let _controls = self.page.disable_form(SIGNUP_FORM);

        let body = SignupRequest {
            username: &form.username,
            password: &form.password,
            confirm_password: &form.confirm_password,
        };
        let result = self.api.post_json(SIGNUP_PATH, &body).await;
        let outcome = self.finish_auth(result, &form.username, &SIGNUP_MESSAGES);
        if outcome.is_success() {
            form.reset();
        }
        outcome
    }

    /// End the session server-side, then forget the user locally and return
    /// to `/`.
    pub async fn logout(&self) -> SubmitOutcome {
        let Some(_permit) = self.guards.logout.try_acquire() else {
            return SubmitOutcome::Ignored;
        };
        let _controls = self.page.disable_form(LOGOUT_ACTION);

        match self.api.post_empty(LOGOUT_PATH).await {
            Ok(resp) if resp.is_success() => {
                info!("logged out");
                self.session.clear_logged_in_user();
                self.page.render_navigation(None);
                self.page.navigate("/");
                self.notify_success("Logged out");
                SubmitOutcome::Succeeded
            }
            Ok(resp) => {
                warn!(status = resp.status, "logout refused");
                self.notify_error("Logout failed");
                SubmitOutcome::Failed(ConsoleError::protocol(Some(resp.status), "Logout failed"))
            }
            Err(e) => {
                warn!(error = %e, "logout request failed");
                self.notify_error("An error occurred during logout");
                SubmitOutcome::Failed(e)
            }
        }
    }

    fn finish_auth(
        &self,
        result: crate::error::Result<crate::api::ApiResponse>,
        username: &str,
        messages: &AuthMessages,
    ) -> SubmitOutcome {
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "auth request failed");
                self.notify_error(messages.network);
                return SubmitOutcome::Failed(e);
            }
        };

        if !resp.is_success() {
            let message = resp
                .server_message()
                .unwrap_or_else(|| messages.refused.to_string());
            warn!(status = resp.status, %message, "auth refused");
            self.notify_error(message.clone());
            return SubmitOutcome::Failed(ConsoleError::protocol(Some(resp.status), message));
        }

        // A 2xx without a JSON body is treated as a broken response.
        if let Err(e) = resp.json::<serde_json::Value>() {
            warn!(error = %e, "auth response undecodable");
            self.notify_error(messages.network);
            return SubmitOutcome::Failed(e);
        }

        info!(%username, "authenticated");
        self.session.set_logged_in_user(username);
        self.page.render_navigation(Some(username));
        self.notify_success(messages.success);
        self.schedule_redirect("/", self.config.redirect_delay());
        SubmitOutcome::Succeeded
    }

    pub(crate) fn reject(&self, message: &str) -> SubmitOutcome {
        debug!(%message, "submission rejected before sending");
        self.notify_error(message);
        SubmitOutcome::Failed(ConsoleError::Validation(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use rstest::rstest;

    fn console() -> Console {
        Console::new(ConsoleConfig {
            // Nothing listens here; validation must fail before any request.
            origin: "http://127.0.0.1:9".into(),
            echo: false,
            ..Default::default()
        })
        .unwrap()
    }

    #[rstest]
    #[case("", "pw")]
    #[case("alice", "")]
    #[case("  ", "  ")]
    #[tokio::test]
    async fn test_login_requires_fields(#[case] user: &str, #[case] pw: &str) {
        let c = console();
        let mut form = LoginForm::new(user, pw);
        let outcome = c.submit_login(&mut form).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(ConsoleError::Validation(_))));
        assert_eq!(c.toaster().latest().unwrap().message, "Username and password are required");
        assert_eq!(form, LoginForm::new(user, pw));
    }

    #[tokio::test]
    async fn test_signup_requires_confirmation_field() {
        let c = console();
        let mut form = SignupForm::new("alice", "pw", "");
        let outcome = c.submit_signup(&mut form).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(ConsoleError::Validation(_))));
        assert_eq!(c.toaster().latest().unwrap().message, "All fields are required");
    }

    #[tokio::test]
    async fn test_login_ignored_while_guard_held() {
        let c = console();
        let _held = c.guards().login.try_acquire().unwrap();
        let mut form = LoginForm::new("alice", "pw");
        assert!(c.submit_login(&mut form).await.is_ignored());
        assert!(c.toaster().is_empty());
    }

    #[test]
    fn test_login_request_shape() {
        let body = serde_json::to_value(LoginRequest {
            username: "a",
            password: "b",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"username": "a", "password": "b"}));
    }

    #[test]
    fn test_form_reset_clears_fields() {
        let mut form = SignupForm::new("a", "b", "b");
        form.reset();
        assert_eq!(form, SignupForm::default());
    }
}
