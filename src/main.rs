use std::net::SocketAddr;

use anyhow::Context;

use bharat_connect::api::{build_state, router};
use bharat_connect::config::AppConfig;
use bharat_connect::{catalog, governor, session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let addr = config.server.bind_addr()?;
    let state = build_state(&config).context("failed to initialise services")?;

    eprintln!("🇮🇳 BharatConnect AI v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{}", addr);
    eprintln!(
        "   Explanations: {}",
        state.engine.generator_name().unwrap_or("templates")
    );
    eprintln!("   SMS: {}", state.delivery.backend().name());
    eprintln!(
        "   Sessions expire after {} min\n",
        config.session.timeout.as_secs() / 60
    );

    let _session_sweep =
        session::spawn_sweep_task(state.sessions.clone(), config.session.sweep_interval);
    let _governor_sweeps: Vec<_> = state
        .governors()
        .into_iter()
        .map(governor::spawn_sweep_task)
        .collect();

    let (reload_tx, reload_rx) = tokio::sync::mpsc::channel(1);
    let _catalog_reload = catalog::spawn_reload_task(state.catalog.clone(), reload_rx);
    #[cfg(unix)]
    let _hangups = catalog::forward_hangups(reload_tx).context("failed to watch SIGHUP")?;
    #[cfg(not(unix))]
    drop(reload_tx);

    let app = router(state, &config.server.cors_origins);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "BharatConnect API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down");
    })
    .await?;

    Ok(())
}
