// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AuthCallbackRequest, AuthCallbackResponse, AutoResetResponse, HealthResponse,
        KeepAliveResponse, SetWebhookResponse, UserAuthRecord, WebhookAck, WebhookHealth,
        WebhookInfo,
    },
    state::AppState,
};

pub mod auth_callback;
pub mod health;
pub mod webhook;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/webhook", post(webhook::receive_update))
        .route("/webhook-status", get(webhook::webhook_status))
        .route("/set-webhook", post(webhook::set_webhook))
        .route("/auto-reset-webhook", post(webhook::auto_reset_webhook))
        .route("/health", get(health::health))
        .route("/keep-alive", get(health::keep_alive))
        .route("/auth/callback", post(auth_callback::auth_callback))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        webhook::receive_update,
        webhook::webhook_status,
        webhook::set_webhook,
        webhook::auto_reset_webhook,
        health::health,
        health::keep_alive,
        auth_callback::auth_callback
    ),
    components(
        schemas(
            WebhookAck,
            WebhookInfo,
            WebhookHealth,
            HealthResponse,
            KeepAliveResponse,
            SetWebhookResponse,
            AutoResetResponse,
            AuthCallbackRequest,
            AuthCallbackResponse,
            UserAuthRecord
        )
    ),
    tags(
        (name = "Webhook", description = "Inbound updates and webhook registration health"),
        (name = "Health", description = "Liveness and health probes"),
        (name = "Auth", description = "Identity-provider callback")
    )
)]
struct ApiDoc;
