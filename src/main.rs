// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

use std::{net::SocketAddr, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nation_agent_gateway::{
    api::router,
    auth::{AuthService, CredentialCipher},
    config::Config,
    nation::NationClient,
    poller::UpdatePoller,
    state::AppState,
    storage::UserAuthStore,
    telegram::TelegramClient,
    webhook::WebhookController,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Arc::new(Config::from_env()?);

    let store = Arc::new(UserAuthStore::open(&config.data_dir)?);
    let cipher = CredentialCipher::new(&config.encryption_secret);
    let auth = Arc::new(AuthService::new(store, cipher));

    let telegram = Arc::new(TelegramClient::new(&config.bot_token)?);
    let nation = Arc::new(NationClient::new(&config.nation_api_url)?);
    let webhook = Arc::new(WebhookController::new(
        (*telegram).clone(),
        config.webhook_secret_token.clone(),
    ));

    let state = AppState::new(
        config.clone(),
        auth,
        telegram,
        nation,
        webhook.clone(),
    );

    let shutdown = CancellationToken::new();

    // Delivery mode: register the webhook, or fall back to long-polling.
    if config.use_webhook {
        match config.webhook_url() {
            Some(url) => {
                let webhook = webhook.clone();
                let token = shutdown.clone();
                tokio::spawn(async move {
                    match webhook.ensure_registered(&url, &token).await {
                        Ok(outcome) if outcome.verified => {}
                        Ok(_) => warn!("webhook registered but verification mismatched"),
                        // Non-fatal: endpoints stay up and POST /set-webhook
                        // can retry registration later.
                        Err(e) => warn!(error = %e, "webhook setup failed"),
                    }
                });
            }
            None => warn!("USE_WEBHOOK is set but WEBHOOK_BASE_URL is missing; use POST /set-webhook"),
        }
    } else {
        info!("webhook mode disabled, starting update poller");
        tokio::spawn(UpdatePoller::new(state.clone()).run(shutdown.clone()));
    }

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Nation agent gateway listening on http://{addr} (docs at /docs)");

    let serve_shutdown = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            info!("shutdown signal received");
            serve_shutdown.cancel();
        })
        .await;

    // Abandon pending webhook-setup retries and the poller.
    shutdown.cancel();

    if let Err(e) = result {
        error!(error = %e, "server exited with error");
        return Err(e.into());
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
