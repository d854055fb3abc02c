// src/handlers/client_profile.rs

use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::{error::AppError, payload::AppJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::client::{ClientProfile, UpsertProfilePayload},
};

#[utoipa::path(
    get,
    path = "/api/client/profile",
    tag = "Perfil do Cliente",
    responses(
        (status = 200, description = "Perfil do cliente logado (null enquanto não for criado)", body = ClientProfile),
        (status = 401, description = "Não autenticado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = app_state.client_service.get_profile(&app_state.db_pool, &user.0).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/api/client/profile",
    tag = "Perfil do Cliente",
    request_body = UpsertProfilePayload,
    responses(
        (status = 200, description = "Perfil criado ou atualizado", body = ClientProfile),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Apenas clientes possuem perfil")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn upsert_profile(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    AppJson(payload): AppJson<UpsertProfilePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let profile = app_state
        .client_service
        .upsert_profile(&app_state.db_pool, &user.0, &payload)
        .await?;
    Ok(Json(profile))
}
