// src/handlers/permissions.rs

use axum::{response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::rbac::{MyPermissions, Role, RolePermissionEntry},
};

// GET /api/permissions (pública: o frontend monta menus e botões a partir desta tabela)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "Permissões",
    responses(
        (status = 200, description = "Tabela papel -> capacidades", body = Vec<RolePermissionEntry>)
    )
)]
pub async fn list_permissions() -> impl IntoResponse {
    let table: Vec<RolePermissionEntry> = Role::ALL
        .into_iter()
        .map(|role| RolePermissionEntry {
            role,
            display_name: role.display_name().to_string(),
            permissions: role.permissions(),
        })
        .collect();

    Json(table)
}

#[utoipa::path(
    get,
    path = "/api/users/me/permissions",
    tag = "Permissões",
    responses(
        (status = 200, description = "Papel e capacidades do usuário logado", body = MyPermissions),
        (status = 401, description = "Não autenticado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn my_permissions(user: AuthenticatedUser) -> Result<impl IntoResponse, AppError> {
    let role = user.0.role;
    Ok(Json(MyPermissions { role, permissions: role.permissions() }))
}
