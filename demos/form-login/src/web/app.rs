use std::sync::Arc;

use axum::{routing::post, Router};
use axum_auth_flow::{
    handler,
    memory::{MemoryAuthenticator, MemoryPersistentLogins},
    tower_cookies::CookieManagerLayer,
    AuthConfig,
};
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::web::pages;

pub struct App {
    config: AuthConfig,
}

impl App {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = match std::env::var("AUTH_CONFIG") {
            Ok(json) => serde_json::from_str(&json)?,
            Err(_) => AuthConfig::default(),
        };

        Ok(Self { config })
    }

    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error>> {
        // Session layer.
        //
        // Provides the `tower_sessions::Session` the auth layer reads the user
        // id from.
        let session_store = MemoryStore::default();
        let session_layer = SessionManagerLayer::new(session_store)
            .with_secure(false)
            .with_expiry(Expiry::OnInactivity(Duration::days(1)));

        // Collaborators.
        let authenticator = MemoryAuthenticator::new().with_user("ferris", "hunter42", "1");
        let logins = MemoryPersistentLogins::new();

        let login = self
            .config
            .login_workflow(Arc::new(authenticator), Arc::new(logins.clone()))?;
        let logout = self.config.logout_workflow(Arc::new(logins))?;

        let app = Router::new()
            .route("/login", post(handler::login))
            .with_state(login)
            .merge(
                Router::new()
                    .route("/logout", post(handler::logout))
                    .with_state(logout),
            )
            .merge(pages::router())
            .layer(self.config.layer())
            .layer(CookieManagerLayer::new())
            .layer(session_layer)
            .layer(TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, app.into_make_service()).await?;

        Ok(())
    }
}
