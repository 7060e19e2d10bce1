//! Run with
//!
//! ```not_rust
//! cargo run -p demo-form-login
//! ```
//!
//! Settings are read as JSON from `AUTH_CONFIG` when it is set, e.g.
//! `AUTH_CONFIG='{"auth_required_status": 403}'`.

use crate::web::App;

mod web;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
            |_| "axum_auth_flow=debug,demo_form_login=debug,tower_http=debug".into(),
        )))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    App::new()?.serve().await
}
