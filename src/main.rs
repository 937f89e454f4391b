use solace::config::AppConfig;
use solace::flow::{FlowRouteState, flow_routes};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("Solace flows v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Flow API: http://0.0.0.0:{}/api/flows", config.port);
    eprintln!("   Country code: {}", config.country_code);
    eprintln!(
        "   Score thresholds: healthy >= {}, unstable >= {}",
        config.thresholds.healthy, config.thresholds.unstable
    );
    eprintln!("   Crisis line: {} ({})\n", config.crisis.label, config.crisis.phone);

    let app = flow_routes(FlowRouteState::new(&config)).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Flow server started");
    axum::serve(listener, app).await?;

    Ok(())
}
