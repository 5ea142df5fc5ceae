// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio_util::sync::CancellationToken;

use supervisord::config::Config;
use supervisord::core::Core;
use supervisord::transport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter = config.effective_log_filter();
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let core = Core::new(config);
    let cancel = CancellationToken::new();
    core.spawn_background_tasks(cancel.clone()).await;

    let listener = tokio::net::TcpListener::bind((core.config.host.as_str(), core.config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "supervisord listening");

    let router = transport::build_router(core);
    let shutdown = {
        let cancel = cancel.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            cancel.cancel();
        }
    };

    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;
    Ok(())
}
