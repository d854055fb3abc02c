// src/handlers/service_requests.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        payload::{AppJson, AppPath},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermSubmitRequests, PermTriageRequests, RequirePermission},
    },
    models::request::{CreateRequestPayload, ServiceRequest, ServiceRequestEntry, UpdateRequestStatusPayload},
};

#[utoipa::path(
    get,
    path = "/api/service-requests",
    tag = "Solicitações",
    responses(
        (status = 200, description = "Solicitações no escopo do papel", body = Vec<ServiceRequestEntry>),
        (status = 401, description = "Não autenticado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_requests(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let requests = app_state.request_service.list(&app_state.db_pool, &user.0).await?;
    Ok(Json(requests))
}

#[utoipa::path(
    post,
    path = "/api/service-requests",
    tag = "Solicitações",
    request_body = CreateRequestPayload,
    responses(
        (status = 201, description = "Solicitação aberta", body = ServiceRequest),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Requer canSubmitRequests, ou serviço de outro cliente"),
        (status = 404, description = "Serviço não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_request(
    State(app_state): State<AppState>,
    RequirePermission(user, _): RequirePermission<PermSubmitRequests>,
    AppJson(payload): AppJson<CreateRequestPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let request = app_state
        .request_service
        .create(&app_state.db_pool, &user, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    patch,
    path = "/api/service-requests/{id}",
    tag = "Solicitações",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    request_body = UpdateRequestStatusPayload,
    responses(
        (status = 200, description = "Status atualizado (RESOLVED carimba resolvedAt)", body = ServiceRequest),
        (status = 400, description = "Status desconhecido"),
        (status = 403, description = "Requer canAssignServices ou canManageServices"),
        (status = 404, description = "Solicitação não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_request_status(
    State(app_state): State<AppState>,
    RequirePermission(actor, _): RequirePermission<PermTriageRequests>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateRequestStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let request = app_state
        .request_service
        .update_status(&app_state.db_pool, &actor, id, payload.status)
        .await?;
    Ok(Json(request))
}
