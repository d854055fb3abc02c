// src/handlers/admin.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::{error::AppError, payload::AppJson},
    config::AppState,
    middleware::rbac::{PermManageUsers, PermViewAdminPanel, RequirePermission},
    models::{
        client::{ClientActionPayload, ClientActionResponse},
        dashboard::AdminStats,
    },
};

// POST /api/admin/clients: convite por e-mail ou criação direta
#[utoipa::path(
    post,
    path = "/api/admin/clients",
    tag = "Administração",
    request_body = ClientActionPayload,
    responses(
        (status = 201, description = "Convite enviado ou cliente criado", body = ClientActionResponse),
        (status = 400, description = "Ação/e-mail ausentes, ou recusa do provedor de identidade"),
        (status = 403, description = "Requer canManageUsers")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn client_action(
    State(app_state): State<AppState>,
    RequirePermission(actor, _): RequirePermission<PermManageUsers>,
    AppJson(payload): AppJson<ClientActionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let response = app_state
        .client_service
        .client_action(&app_state.db_pool, &actor, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "Administração",
    responses(
        (status = 200, description = "Totais de usuários, saúde do banco e atividade recente", body = AdminStats),
        (status = 403, description = "Requer canViewAdminPanel")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn admin_stats(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermViewAdminPanel>,
) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.dashboard_service.get_admin_stats(&app_state.db_pool).await?;
    Ok(Json(stats))
}
