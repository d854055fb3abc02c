// src/handlers/webhooks.rs

use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse, Json};

use crate::{common::error::AppError, config::AppState, services::webhook_service::WebhookAck};

// O corpo chega cru: a assinatura é calculada sobre os bytes exatos
#[utoipa::path(
    post,
    path = "/api/webhooks/identity-provider",
    tag = "Webhooks",
    request_body(content = String, description = "Envelope assinado (svix-id, svix-timestamp, svix-signature)"),
    responses(
        (status = 200, description = "Evento aplicado ou ignorado", body = WebhookAck),
        (status = 400, description = "Assinatura inválida ou evento malformado")
    )
)]
pub async fn identity_provider_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let ack = app_state
        .webhook_service
        .handle(&app_state.db_pool, &headers, &body)
        .await?;

    Ok(Json(ack))
}
