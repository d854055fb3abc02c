// src/handlers/service_templates.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        payload::{AppJson, AppPath, AppQuery},
    },
    config::AppState,
    middleware::rbac::{PermManageServices, RequirePermission},
    models::template::{
        CreateTemplatePayload, TemplateDetail, TemplateListEntry, TemplateListQuery, UpdateTemplatePayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/service-templates",
    tag = "Modelos de Serviço",
    params(TemplateListQuery),
    responses(
        (status = 200, description = "Modelos com contagem de serviços, tarefas e marcos", body = Vec<TemplateListEntry>),
        (status = 403, description = "Requer canManageServices")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_templates(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermManageServices>,
    AppQuery(query): AppQuery<TemplateListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let templates = app_state
        .template_service
        .list(&app_state.db_pool, query.active_only)
        .await?;
    Ok(Json(templates))
}

#[utoipa::path(
    post,
    path = "/api/service-templates",
    tag = "Modelos de Serviço",
    request_body = CreateTemplatePayload,
    responses(
        (status = 201, description = "Modelo criado com tarefas, marcos e formulários obrigatórios", body = TemplateDetail),
        (status = 400, description = "Dados inválidos ou formulário inexistente"),
        (status = 403, description = "Requer canManageServices")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_template(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermManageServices>,
    AppJson(payload): AppJson<CreateTemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let template = app_state.template_service.create(&app_state.db_pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/service-templates/{id}",
    tag = "Modelos de Serviço",
    params(("id" = Uuid, Path, description = "ID do modelo")),
    responses(
        (status = 200, description = "Modelo completo", body = TemplateDetail),
        (status = 404, description = "Modelo não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_template(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermManageServices>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let template = app_state.template_service.detail(&app_state.db_pool, id).await?;
    Ok(Json(template))
}

#[utoipa::path(
    patch,
    path = "/api/service-templates/{id}",
    tag = "Modelos de Serviço",
    params(("id" = Uuid, Path, description = "ID do modelo")),
    request_body = UpdateTemplatePayload,
    responses(
        (status = 200, description = "Modelo atualizado", body = TemplateDetail),
        (status = 404, description = "Modelo não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_template(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermManageServices>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateTemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let template = app_state.template_service.update(&app_state.db_pool, id, &payload).await?;
    Ok(Json(template))
}

#[utoipa::path(
    delete,
    path = "/api/service-templates/{id}",
    tag = "Modelos de Serviço",
    params(("id" = Uuid, Path, description = "ID do modelo")),
    responses(
        (status = 204, description = "Modelo excluído"),
        (status = 404, description = "Modelo não encontrado"),
        (status = 409, description = "O modelo possui serviços vinculados")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn delete_template(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermManageServices>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.template_service.delete(&app_state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
