// src/handlers/users.rs

use axum::{extract::State, response::IntoResponse, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        payload::{AppJson, AppPath, AppQuery},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermManageUsers, PermViewUsers, RequirePermission},
    },
    models::auth::{CurrentUser, UpdateRolePayload, User, UserDetail, UserListQuery, UserSummary},
};

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Usuários",
    responses(
        (status = 200, description = "Espelho local do usuário logado, com perfil de cliente", body = CurrentUser),
        (status = 401, description = "Não autenticado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let me = app_state.user_service.me(&app_state.db_pool, user.0).await?;
    Ok(Json(me))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Usuários",
    params(UserListQuery),
    responses(
        (status = 200, description = "Usuários, opcionalmente filtrados por papel", body = Vec<UserSummary>),
        (status = 403, description = "Requer canManageUsers ou canAssignServices")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermViewUsers>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let users = app_state.user_service.list(&app_state.db_pool, &query).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Usuários",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário com perfil e serviços", body = UserDetail),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermViewUsers>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.user_service.detail(&app_state.db_pool, id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/role",
    tag = "Usuários",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    request_body = UpdateRolePayload,
    responses(
        (status = 200, description = "Papel atualizado localmente e no provedor", body = User),
        (status = 400, description = "Papel inválido ou recusado pelo provedor"),
        (status = 403, description = "Requer canManageUsers"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_user_role(
    State(app_state): State<AppState>,
    RequirePermission(actor, _): RequirePermission<PermManageUsers>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = app_state
        .user_service
        .update_role(&app_state.db_pool, &actor, id, payload.role)
        .await?;
    Ok(Json(user))
}
