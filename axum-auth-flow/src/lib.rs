//! # Overview
//!
//! This crate provides a session-backed login workflow for `axum` and other
//! `tower` applications. It offers:
//!
//! - **An identity on every request:** [`AuthUserLayer`] attaches a
//!   [`UserIdentity`] to each request as the `user` attribute of
//!   [`RequestAttributes`], restored from the session, and writes whatever
//!   identity the handler left behind back into the session.
//! - **Login:** [`LoginWorkflow`] sanitises submitted credentials, tells
//!   "nothing typed yet" from "one field missing" from "wrong credentials"
//!   through flash messages, authenticates through an [`Authenticator`] and
//!   optionally creates a persistent ("remember me") login.
//! - **Logout:** [`LogoutWorkflow`] expires the persistent-login cookie,
//!   deletes stored persistent logins, clears the session segment and resets
//!   the identity.
//!
//! Sessions are provided via [`tower-sessions`](tower_sessions). The session
//! layer must be installed outside of [`AuthUserLayer`], since the layer reads
//! and writes the session on every request.
//!
//! Password checks and persistent-login storage are left to the application:
//! implement [`Authenticator`], [`PersistentLoginCreator`] and
//! [`PersistentLoginDeleter`] for your storage. The [`memory`] module has
//! ephemeral versions for tests and demos.
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{routing::{get, post}, Router};
//! use axum_auth_flow::{
//!     handler,
//!     memory::{MemoryAuthenticator, MemoryPersistentLogins},
//!     tower_sessions::{MemoryStore, SessionManagerLayer},
//!     AuthUserLayer, CurrentIdentity, LoginWorkflow, LogoutWorkflow,
//! };
//!
//! async fn whoami(CurrentIdentity(user): CurrentIdentity) -> String {
//!     user.id().map(|id| id.to_string()).unwrap_or_default()
//! }
//!
//! let logins = MemoryPersistentLogins::new();
//! let authenticator = MemoryAuthenticator::new().with_user("ferris", "hunter42", "1");
//!
//! let app: Router = Router::new()
//!     .route("/login", post(handler::login))
//!     .with_state(LoginWorkflow::new(authenticator, logins.clone()))
//!     .merge(
//!         Router::new()
//!             .route("/logout", post(handler::logout))
//!             .with_state(LogoutWorkflow::new("remember", logins)),
//!     )
//!     .route("/", get(whoami))
//!     .layer(AuthUserLayer::new())
//!     .layer(SessionManagerLayer::new(MemoryStore::default()));
//! ```
#![warn(
    clippy::all,
    nonstandard_style,
    future_incompatible,
    missing_debug_implementations,
    missing_docs
)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use attributes::{RequestAttributes, USER_ATTRIBUTE};
pub use backend::{Authenticator, CookieSetter, PersistentLoginCreator, PersistentLoginDeleter};
pub use config::{AuthConfig, DEFAULT_PERSISTENT_LOGIN_COOKIE};
pub use error::Error;
pub use extract::CurrentIdentity;
pub use identity::{CurrentUser, SharedIdentity, UserId, UserIdentity};
pub use input::{sanitize, Credentials, FieldNames, UserInput};
pub use login::{
    FlashMessages, InputState, LoginWorkflow, FORM_MESSAGE, PASSWORD_HELP, USERNAME_HELP,
};
pub use logout::LogoutWorkflow;
pub use middleware::{
    AuthUserLayer, AuthUserService, IdentityFactory, DEFAULT_SEGMENT, DEFAULT_USER_ID_FIELD,
};
pub use segment::{Segment, SessionSegment};
pub use tower_cookies;
pub use tower_sessions;

mod attributes;
mod backend;
mod config;
mod error;
mod extract;
pub mod handler;
mod identity;
mod input;
mod login;
mod logout;
pub mod memory;
mod middleware;
mod segment;
