use std::{fmt, sync::Arc};

use http::{Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::{
    Authenticator, Credentials, Error, FieldNames, PersistentLoginCreator, RequestAttributes,
    SessionSegment, UserInput,
};

/// Flash key set when only the password was given.
pub const USERNAME_HELP: &str = "username_help";

/// Flash key set when only the user name was given.
pub const PASSWORD_HELP: &str = "password_help";

/// Flash key set when the credentials were rejected.
pub const FORM_MESSAGE: &str = "form_message";

/// Texts stored as flash messages by [`LoginWorkflow`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FlashMessages {
    /// Stored under [`USERNAME_HELP`].
    pub username_help: String,

    /// Stored under [`PASSWORD_HELP`].
    pub password_help: String,

    /// Stored under [`FORM_MESSAGE`].
    pub form_message: String,
}

impl Default for FlashMessages {
    fn default() -> Self {
        Self {
            username_help: "Please enter your user name.".to_string(),
            password_help: "Please enter your password.".to_string(),
            form_message: "Something is wrong with these credentials. Maybe a typo?"
                .to_string(),
        }
    }
}

/// How complete a set of submitted credentials is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// Neither user name nor password; the form was not filled in yet.
    Empty,

    /// A password without a user name.
    MissingUsername,

    /// A user name without a password.
    MissingPassword,

    /// Both fields present.
    Complete,
}

impl InputState {
    /// Classifies `creds`.
    pub fn of(creds: &Credentials) -> Self {
        match (
            creds.username.is_empty(),
            creds.password.expose_secret().is_empty(),
        ) {
            (true, true) => Self::Empty,
            (true, false) => Self::MissingUsername,
            (false, true) => Self::MissingPassword,
            (false, false) => Self::Complete,
        }
    }
}

/// Validates submitted credentials and logs the request's identity in.
///
/// Every unsuccessful path, whether input was missing or the credentials were
/// rejected, answers with the same "auth required" status. Which field was
/// wrong is only revealed through a flash message in the user's own session.
#[derive(Clone)]
pub struct LoginWorkflow {
    authenticator: Arc<dyn Authenticator>,
    persistent_login_creator: Arc<dyn PersistentLoginCreator>,
    fields: FieldNames,
    flash: FlashMessages,
    auth_required_status: StatusCode,
    authorized_status: StatusCode,
}

impl LoginWorkflow {
    /// Creates a workflow with default field names, flash texts and status
    /// codes (`401` / `204`).
    pub fn new(
        authenticator: impl Authenticator + 'static,
        persistent_login_creator: impl PersistentLoginCreator + 'static,
    ) -> Self {
        Self::from_arcs(Arc::new(authenticator), Arc::new(persistent_login_creator))
    }

    /// Like [`new`](Self::new), for collaborators that are already shared.
    pub fn from_arcs(
        authenticator: Arc<dyn Authenticator>,
        persistent_login_creator: Arc<dyn PersistentLoginCreator>,
    ) -> Self {
        Self {
            authenticator,
            persistent_login_creator,
            fields: FieldNames::default(),
            flash: FlashMessages::default(),
            auth_required_status: StatusCode::UNAUTHORIZED,
            authorized_status: StatusCode::NO_CONTENT,
        }
    }

    /// Reads credentials from the fields named in `fields`.
    pub fn with_field_names(mut self, fields: FieldNames) -> Self {
        self.fields = fields;
        self
    }

    /// Uses `flash` as flash message texts.
    pub fn with_flash_messages(mut self, flash: FlashMessages) -> Self {
        self.flash = flash;
        self
    }

    /// Status for incomplete input and rejected credentials.
    pub fn with_auth_required_status(mut self, status: StatusCode) -> Self {
        self.auth_required_status = status;
        self
    }

    /// Status for a successful login.
    pub fn with_authorized_status(mut self, status: StatusCode) -> Self {
        self.authorized_status = status;
        self
    }

    /// Runs the login for one request.
    ///
    /// `attributes` must carry the `user` identity installed by
    /// [`AuthUserLayer`](crate::AuthUserLayer); otherwise
    /// [`Error::MissingIdentity`] is returned before anything else happens.
    /// On success the identity holds the authenticated id; on rejected
    /// credentials it is reset to `None`; on incomplete input it is left as
    /// is.
    #[tracing::instrument(level = "debug", skip_all, fields(user.id), err)]
    pub async fn handle<B>(
        &self,
        attributes: &RequestAttributes,
        segment: &dyn SessionSegment,
        input: &UserInput,
        mut response: Response<B>,
    ) -> Result<Response<B>, Error> {
        let user = attributes.require_user()?;

        let creds = Credentials::from_input(input, &self.fields);
        let state = InputState::of(&creds);

        match state {
            InputState::Empty => tracing::debug!("no credentials given"),
            InputState::MissingUsername => {
                tracing::warn!("no username given");
                segment
                    .set_flash(USERNAME_HELP, &self.flash.username_help)
                    .await?;
            }
            InputState::MissingPassword => {
                tracing::warn!("no password given");
                segment
                    .set_flash(PASSWORD_HELP, &self.flash.password_help)
                    .await?;
            }
            InputState::Complete => {}
        }

        if state != InputState::Complete {
            tracing::debug!(status = %self.auth_required_status, "incomplete user input");
            *response.status_mut() = self.auth_required_status;
            return Ok(response);
        }

        let user_id = self
            .authenticator
            .authenticate(&creds.username, &creds.password)
            .await
            .map_err(Error::Authenticator)?
            .filter(|user_id| !user_id.is_empty());

        user.set_id(user_id.clone());

        let Some(user_id) = user_id else {
            segment
                .set_flash(FORM_MESSAGE, &self.flash.form_message)
                .await?;
            tracing::warn!(status = %self.auth_required_status, "authentication failed");
            *response.status_mut() = self.auth_required_status;
            return Ok(response);
        };

        tracing::Span::current().record("user.id", user_id.as_str());
        segment.renew_id().await?;

        if creds.remember {
            tracing::info!("create persistent login");
            self.persistent_login_creator
                .create(&user_id)
                .await
                .map_err(Error::PersistentLogin)?;
        } else {
            tracing::debug!("no persistent login requested");
        }

        *response.status_mut() = self.authorized_status;
        Ok(response)
    }
}

impl fmt::Debug for LoginWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginWorkflow")
            .field("fields", &self.fields)
            .field("auth_required_status", &self.auth_required_status)
            .field("authorized_status", &self.authorized_status)
            .finish_non_exhaustive()
    }
}
