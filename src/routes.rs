// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn create_router(app_state: AppState) -> Router {
    // Rotas de usuário (protegidas pelo middleware)
    let user_routes = Router::new()
        .route("/", get(handlers::users::list_users))
        .route("/me", get(handlers::users::get_me))
        .route("/me/permissions", get(handlers::permissions::my_permissions))
        .route("/{id}", get(handlers::users::get_user))
        .route("/{id}/role", patch(handlers::users::update_user_role));

    let admin_routes = Router::new()
        .route("/clients", post(handlers::admin::client_action))
        .route("/stats", get(handlers::admin::admin_stats));

    let template_routes = Router::new()
        .route(
            "/",
            get(handlers::service_templates::list_templates).post(handlers::service_templates::create_template),
        )
        .route(
            "/{id}",
            get(handlers::service_templates::get_template)
                .patch(handlers::service_templates::update_template)
                .delete(handlers::service_templates::delete_template),
        );

    let service_routes = Router::new()
        .route(
            "/",
            get(handlers::services::list_services).post(handlers::services::create_service),
        )
        .route(
            "/{id}",
            get(handlers::services::get_service)
                .patch(handlers::services::update_service)
                .delete(handlers::services::delete_service),
        )
        .route("/{id}/batch-update", post(handlers::services::batch_update))
        .route("/{id}/tasks/{task_id}", patch(handlers::services::patch_task))
        .route("/{id}/milestones/{milestone_id}", patch(handlers::services::patch_milestone));

    let request_routes = Router::new()
        .route(
            "/",
            get(handlers::service_requests::list_requests).post(handlers::service_requests::create_request),
        )
        .route("/{id}", patch(handlers::service_requests::update_request_status));

    let form_routes = Router::new()
        .route("/", get(handlers::forms::list_forms).post(handlers::forms::create_form))
        .route(
            "/submissions",
            get(handlers::forms::list_submissions).post(handlers::forms::create_submission),
        )
        .route(
            "/{id}",
            get(handlers::forms::get_form)
                .put(handlers::forms::update_form)
                .delete(handlers::forms::delete_form),
        );

    // Tudo abaixo de /api exige sessão, exceto as rotas públicas montadas depois
    let protected = Router::new()
        .nest("/users", user_routes)
        .route(
            "/client/profile",
            get(handlers::client_profile::get_profile).put(handlers::client_profile::upsert_profile),
        )
        .nest("/admin", admin_routes)
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .nest("/service-templates", template_routes)
        .nest("/services", service_routes)
        .nest("/service-requests", request_routes)
        .nest("/forms", form_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/permissions", get(handlers::permissions::list_permissions))
        .route(
            "/api/webhooks/identity-provider",
            post(handlers::webhooks::identity_provider_webhook),
        )
        .nest("/api", protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
