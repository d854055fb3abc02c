// src/handlers/forms.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
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
        rbac::{PermManageForms, RequirePermission},
    },
    models::form::{
        CreateFormPayload, CreateSubmissionPayload, FormListing, FormSubmission, FormTemplate, SubmissionEntry,
        SubmissionListQuery, UpdateFormPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/forms",
    tag = "Formulários",
    responses(
        (status = 200, description = "Todos os formulários (quem gerencia) ou os atribuídos ao cliente", body = FormListing),
        (status = 401, description = "Não autenticado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_forms(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let forms = app_state.form_service.list(&app_state.db_pool, &user.0).await?;
    Ok(Json(forms))
}

#[utoipa::path(
    post,
    path = "/api/forms",
    tag = "Formulários",
    request_body = CreateFormPayload,
    responses(
        (status = 201, description = "Formulário criado", body = FormTemplate),
        (status = 400, description = "Documento inválido (mapa campo -> código)"),
        (status = 403, description = "Requer canManageForms")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_form(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermManageForms>,
    AppJson(payload): AppJson<CreateFormPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let form = app_state.form_service.create(&app_state.db_pool, payload).await?;
    Ok((StatusCode::CREATED, Json(form)))
}

#[utoipa::path(
    get,
    path = "/api/forms/{id}",
    tag = "Formulários",
    params(("id" = Uuid, Path, description = "ID do formulário")),
    responses(
        (status = 200, description = "Formulário com o documento de campos", body = FormTemplate),
        (status = 404, description = "Formulário não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_form(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermManageForms>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let form = app_state.form_service.get(&app_state.db_pool, id).await?;
    Ok(Json(form))
}

#[utoipa::path(
    put,
    path = "/api/forms/{id}",
    tag = "Formulários",
    params(("id" = Uuid, Path, description = "ID do formulário")),
    request_body = UpdateFormPayload,
    responses(
        (status = 200, description = "Formulário atualizado", body = FormTemplate),
        (status = 400, description = "Documento inválido"),
        (status = 404, description = "Formulário não encontrado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_form(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermManageForms>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateFormPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let form = app_state.form_service.update(&app_state.db_pool, id, payload).await?;
    Ok(Json(form))
}

#[utoipa::path(
    delete,
    path = "/api/forms/{id}",
    tag = "Formulários",
    params(("id" = Uuid, Path, description = "ID do formulário")),
    responses(
        (status = 204, description = "Formulário e respostas excluídos"),
        (status = 404, description = "Formulário não encontrado"),
        (status = 409, description = "Formulário ainda vinculado a serviço ou modelo")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn delete_form(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermManageForms>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.form_service.delete(&app_state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// RESPOSTAS
// ---

#[utoipa::path(
    get,
    path = "/api/forms/submissions",
    tag = "Formulários",
    params(SubmissionListQuery),
    responses(
        (status = 200, description = "Respostas próprias (ou todas, para quem gerencia formulários)", body = Vec<SubmissionEntry>),
        (status = 401, description = "Não autenticado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_submissions(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    AppQuery(query): AppQuery<SubmissionListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = app_state
        .form_service
        .list_submissions(&app_state.db_pool, &user.0, &query)
        .await?;
    Ok(Json(submissions))
}

#[utoipa::path(
    post,
    path = "/api/forms/submissions",
    tag = "Formulários",
    request_body = CreateSubmissionPayload,
    responses(
        (status = 201, description = "Resposta registrada", body = FormSubmission),
        (status = 400, description = "Respostas inválidas (mapa campo -> código)"),
        (status = 404, description = "Formulário não atribuído ao cliente")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_submission(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    AppJson(payload): AppJson<CreateSubmissionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let submission = app_state
        .form_service
        .submit(&app_state.db_pool, &user.0, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(submission)))
}
