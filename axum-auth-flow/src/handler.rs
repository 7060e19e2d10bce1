//! Axum handlers running the login and logout workflows.
//!
//! Both read their workflow from the router state, so the state must provide
//! it through [`FromRef`](axum::extract::FromRef), or be the workflow itself:
//!
//! ```rust,no_run
//! use axum::{routing::post, Router};
//! use axum_auth_flow::{
//!     handler,
//!     memory::{MemoryAuthenticator, MemoryPersistentLogins},
//!     LoginWorkflow, LogoutWorkflow,
//! };
//!
//! let logins = MemoryPersistentLogins::new();
//! let login = LoginWorkflow::new(MemoryAuthenticator::new(), logins.clone());
//! let logout = LogoutWorkflow::new("remember", logins);
//!
//! let app: Router = Router::new()
//!     .route("/login", post(handler::login))
//!     .with_state(login)
//!     .merge(
//!         Router::new()
//!             .route("/logout", post(handler::logout))
//!             .with_state(logout),
//!     );
//! ```

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Form,
};
use tower_cookies::Cookies;

use crate::{Error, LoginWorkflow, LogoutWorkflow, RequestAttributes, Segment, UserInput};

/// Logs the request's identity in with the submitted form fields.
pub async fn login(
    State(workflow): State<LoginWorkflow>,
    attributes: RequestAttributes,
    segment: Segment,
    Form(input): Form<UserInput>,
) -> Result<Response, Error> {
    workflow
        .handle(&attributes, &segment, &input, ().into_response())
        .await
}

/// Logs the request's identity out.
pub async fn logout(
    State(workflow): State<LogoutWorkflow>,
    attributes: RequestAttributes,
    segment: Segment,
    cookies: Cookies,
) -> Result<Response, Error> {
    workflow
        .handle(&attributes, &segment, &cookies, ().into_response())
        .await
}
