use school_backend::{
    app,
    config::{get_config, init_config, LogFormat},
    database::pool::{create_pool, run_migrations},
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let pool = create_pool().await?;
    run_migrations(&pool).await?;

    let app_state = AppState::new(pool);

    if let Some(admin) = &config.admin {
        match app_state
            .user_service
            .ensure_admin(&admin.username, &admin.email, &admin.password)
            .await
        {
            Ok(true) => info!(username = %admin.username, "bootstrap admin created"),
            Ok(false) => info!(username = %admin.username, "bootstrap admin already present"),
            Err(e) => tracing::warn!(error = ?e, "could not create bootstrap admin"),
        }
    }

    let router = app(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
