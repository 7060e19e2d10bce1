use std::sync::Arc;

use http::StatusCode;
use serde::Deserialize;

use crate::{
    middleware::{DEFAULT_SEGMENT, DEFAULT_USER_ID_FIELD},
    Authenticator, AuthUserLayer, Error, FieldNames, FlashMessages, LoginWorkflow, LogoutWorkflow,
    PersistentLoginCreator, PersistentLoginDeleter,
};

/// Default name of the persistent-login cookie.
pub const DEFAULT_PERSISTENT_LOGIN_COOKIE: &str = "remember";

/// The complete configuration surface, for hosts that load settings from a
/// file. Every field is optional and falls back to its default.
///
/// ```rust
/// use axum_auth_flow::AuthConfig;
///
/// let config: AuthConfig = serde_json::from_str(
///     r#"{ "session_segment": "shop", "auth_required_status": 403 }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.session_segment, "shop");
/// assert_eq!(config.authorized_status, 204);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session segment holding the login state.
    pub session_segment: String,

    /// Segment field holding the user id.
    pub session_user_id_field: String,

    /// Name of the persistent-login cookie expired on logout.
    pub persistent_login_cookie: String,

    /// Status for incomplete input and rejected credentials.
    pub auth_required_status: u16,

    /// Status for a successful login.
    pub authorized_status: u16,

    /// Status for a completed logout.
    pub logout_status: u16,

    /// Names of the login form fields.
    pub fields: FieldNames,

    /// Flash message texts.
    pub flash: FlashMessages,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_segment: DEFAULT_SEGMENT.to_string(),
            session_user_id_field: DEFAULT_USER_ID_FIELD.to_string(),
            persistent_login_cookie: DEFAULT_PERSISTENT_LOGIN_COOKIE.to_string(),
            auth_required_status: 401,
            authorized_status: 204,
            logout_status: 204,
            fields: FieldNames::default(),
            flash: FlashMessages::default(),
        }
    }
}

impl AuthConfig {
    /// Builds the identity layer.
    pub fn layer(&self) -> AuthUserLayer {
        AuthUserLayer::new()
            .with_segment(&self.session_segment)
            .with_user_id_field(&self.session_user_id_field)
    }

    /// Builds the login workflow, validating the configured status codes.
    pub fn login_workflow(
        &self,
        authenticator: Arc<dyn Authenticator>,
        persistent_login_creator: Arc<dyn PersistentLoginCreator>,
    ) -> Result<LoginWorkflow, Error> {
        Ok(
            LoginWorkflow::from_arcs(authenticator, persistent_login_creator)
                .with_field_names(self.fields.clone())
                .with_flash_messages(self.flash.clone())
                .with_auth_required_status(StatusCode::from_u16(self.auth_required_status)?)
                .with_authorized_status(StatusCode::from_u16(self.authorized_status)?),
        )
    }

    /// Builds the logout workflow, validating the configured status code.
    pub fn logout_workflow(
        &self,
        deleter: Arc<dyn PersistentLoginDeleter>,
    ) -> Result<LogoutWorkflow, Error> {
        Ok(
            LogoutWorkflow::from_arc(&self.persistent_login_cookie, deleter)
                .with_status(StatusCode::from_u16(self.logout_status)?),
        )
    }
}
