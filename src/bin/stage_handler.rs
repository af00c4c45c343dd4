//! Stage handler server: the linear policy over HTTP

use intake_gateway::api::stage_handler::{create_router, StageState};
use intake_gateway::policy::LinearPolicy;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 8081;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_gateway=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let port: u16 = match std::env::var("INTAKE_STAGE_HANDLER_PORT") {
        Ok(p) => p.parse()?,
        Err(_) => DEFAULT_PORT,
    };

    let app = create_router(StageState::new(LinearPolicy)).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Stage handler listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
