use std::env;
use std::net::SocketAddr;

use anyhow::Result;
use console_api::build_app;
use console_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("console_api");

    let bind = env::var("CONSOLE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let app = build_app().await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "ops console api started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
