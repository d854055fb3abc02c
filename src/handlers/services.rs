// src/handlers/services.rs

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
        rbac::{PermAssignServices, RequirePermission},
    },
    models::service::{
        BatchUpdatePayload, BatchUpdateResult, CreateServicePayload, MilestonePatchPayload, Service,
        ServiceDetail, ServiceMilestone, ServiceSummary, ServiceTask, TaskPatchPayload, UpdateServicePayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/services",
    tag = "Serviços",
    responses(
        (status = 200, description = "Todos os serviços (equipe) ou só os do cliente logado", body = Vec<ServiceSummary>),
        (status = 401, description = "Não autenticado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_services(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let services = app_state.assignment_service.list(&app_state.db_pool, &user.0).await?;
    Ok(Json(services))
}

// POST /api/services: instancia um modelo para um cliente
#[utoipa::path(
    post,
    path = "/api/services",
    tag = "Serviços",
    request_body = CreateServicePayload,
    responses(
        (status = 201, description = "Serviço criado com cópias das tarefas, marcos e formulários do modelo", body = ServiceDetail),
        (status = 403, description = "Requer canAssignServices"),
        (status = 404, description = "Modelo ou cliente não encontrado"),
        (status = 409, description = "Modelo inativo")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_service(
    State(app_state): State<AppState>,
    RequirePermission(actor, _): RequirePermission<PermAssignServices>,
    AppJson(payload): AppJson<CreateServicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let service = app_state
        .assignment_service
        .instantiate(&app_state.db_pool, &actor, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(service)))
}

#[utoipa::path(
    get,
    path = "/api/services/{id}",
    tag = "Serviços",
    params(("id" = Uuid, Path, description = "ID do serviço")),
    responses(
        (status = 200, description = "Serviço com cliente, modelo, tarefas, marcos e formulários", body = ServiceDetail),
        (status = 403, description = "Serviço de outro cliente"),
        (status = 404, description = "Serviço não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_service(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let service = app_state.assignment_service.detail(&app_state.db_pool, &user.0, id).await?;
    Ok(Json(service))
}

#[utoipa::path(
    patch,
    path = "/api/services/{id}",
    tag = "Serviços",
    params(("id" = Uuid, Path, description = "ID do serviço")),
    request_body = UpdateServicePayload,
    responses(
        (status = 200, description = "Status/data de término atualizados", body = Service),
        (status = 400, description = "Status desconhecido"),
        (status = 403, description = "Requer canAssignServices"),
        (status = 404, description = "Serviço não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_service(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermAssignServices>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateServicePayload>,
) -> Result<impl IntoResponse, AppError> {
    let service = app_state.assignment_service.update(&app_state.db_pool, id, &payload).await?;
    Ok(Json(service))
}

#[utoipa::path(
    delete,
    path = "/api/services/{id}",
    tag = "Serviços",
    params(("id" = Uuid, Path, description = "ID do serviço")),
    responses(
        (status = 204, description = "Serviço e dependências excluídos"),
        (status = 403, description = "Requer canAssignServices"),
        (status = 404, description = "Serviço não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn delete_service(
    State(app_state): State<AppState>,
    RequirePermission(actor, _): RequirePermission<PermAssignServices>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.assignment_service.delete(&app_state.db_pool, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/services/{id}/batch-update",
    tag = "Serviços",
    params(("id" = Uuid, Path, description = "ID do serviço")),
    request_body = BatchUpdatePayload,
    responses(
        (status = 200, description = "Linhas atualizadas e o serviço recarregado", body = BatchUpdateResult),
        (status = 403, description = "Sem permissão para as tarefas ou marcos enviados"),
        (status = 404, description = "Serviço, tarefa ou marco não encontrado (nada é gravado)"),
        (status = 409, description = "Cliente tentando alterar tarefas de serviço não ativo")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn batch_update(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<BatchUpdatePayload>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state
        .assignment_service
        .batch_update(&app_state.db_pool, &user.0, id, &payload)
        .await?;
    Ok(Json(result))
}

#[utoipa::path(
    patch,
    path = "/api/services/{id}/tasks/{task_id}",
    tag = "Serviços",
    params(
        ("id" = Uuid, Path, description = "ID do serviço"),
        ("task_id" = Uuid, Path, description = "ID da tarefa")
    ),
    request_body = TaskPatchPayload,
    responses(
        (status = 200, description = "Tarefa atualizada", body = ServiceTask),
        (status = 403, description = "Nem dono do serviço nem canAssignServices"),
        (status = 404, description = "Tarefa não pertence ao serviço")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn patch_task(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    AppPath((id, task_id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<TaskPatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state
        .assignment_service
        .patch_task(&app_state.db_pool, &user.0, id, task_id, &payload)
        .await?;
    Ok(Json(task))
}

#[utoipa::path(
    patch,
    path = "/api/services/{id}/milestones/{milestone_id}",
    tag = "Serviços",
    params(
        ("id" = Uuid, Path, description = "ID do serviço"),
        ("milestone_id" = Uuid, Path, description = "ID do marco")
    ),
    request_body = MilestonePatchPayload,
    responses(
        (status = 200, description = "Marco atualizado", body = ServiceMilestone),
        (status = 403, description = "Requer canAssignServices"),
        (status = 404, description = "Marco não pertence ao serviço")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn patch_milestone(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    AppPath((id, milestone_id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<MilestonePatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    let milestone = app_state
        .assignment_service
        .patch_milestone(&app_state.db_pool, &user.0, id, milestone_id, &payload)
        .await?;
    Ok(Json(milestone))
}
