// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Permissões ---
        handlers::permissions::list_permissions,
        handlers::permissions::my_permissions,

        // --- Usuários ---
        handlers::users::get_me,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user_role,

        // --- Perfil do Cliente ---
        handlers::client_profile::get_profile,
        handlers::client_profile::upsert_profile,

        // --- Administração ---
        handlers::admin::client_action,
        handlers::admin::admin_stats,

        // --- Dashboard ---
        handlers::dashboard::get_dashboard,

        // --- Modelos de Serviço ---
        handlers::service_templates::list_templates,
        handlers::service_templates::create_template,
        handlers::service_templates::get_template,
        handlers::service_templates::update_template,
        handlers::service_templates::delete_template,

        // --- Serviços ---
        handlers::services::list_services,
        handlers::services::create_service,
        handlers::services::get_service,
        handlers::services::update_service,
        handlers::services::delete_service,
        handlers::services::batch_update,
        handlers::services::patch_task,
        handlers::services::patch_milestone,

        // --- Solicitações ---
        handlers::service_requests::list_requests,
        handlers::service_requests::create_request,
        handlers::service_requests::update_request_status,

        // --- Formulários ---
        handlers::forms::list_forms,
        handlers::forms::create_form,
        handlers::forms::get_form,
        handlers::forms::update_form,
        handlers::forms::delete_form,
        handlers::forms::list_submissions,
        handlers::forms::create_submission,

        // --- Webhooks ---
        handlers::webhooks::identity_provider_webhook,
    ),
    components(
        schemas(
            // --- RBAC ---
            models::rbac::Role,
            models::rbac::RolePermissions,
            models::rbac::Capability,
            models::rbac::RolePermissionEntry,
            models::rbac::MyPermissions,

            // --- Usuários ---
            models::auth::User,
            models::auth::UserSummary,
            models::auth::CurrentUser,
            models::auth::UserServiceEntry,
            models::auth::UserDetail,
            models::auth::UpdateRolePayload,

            // --- Clientes ---
            models::client::ClientProfileRow,
            models::client::SocialMediaProfile,
            models::client::ClientProfile,
            models::client::SocialMediaInput,
            models::client::ProfileFields,
            models::client::UpsertProfilePayload,
            models::client::ClientAction,
            models::client::ClientActionPayload,
            models::client::ClientActionResponse,

            // --- Modelos de Serviço ---
            models::template::ServiceTemplate,
            models::template::TemplateStep,
            models::template::TemplateCounts,
            models::template::TemplateListEntry,
            models::template::TemplateDetail,
            models::template::StepInput,
            models::template::CreateTemplatePayload,
            models::template::UpdateTemplatePayload,

            // --- Serviços ---
            models::service::ServiceStatus,
            models::service::TaskStatus,
            models::service::Service,
            models::service::ServiceTask,
            models::service::ServiceMilestone,
            models::service::ClientBrief,
            models::service::TemplateBrief,
            models::service::AssignedFormEntry,
            models::service::ServiceDetail,
            models::service::ServiceSummary,
            models::service::CreateServicePayload,
            models::service::UpdateServicePayload,
            models::service::TaskStatusChange,
            models::service::MilestoneChange,
            models::service::BatchUpdatePayload,
            models::service::TaskPatchPayload,
            models::service::MilestonePatchPayload,
            models::service::BatchUpdateResult,

            // --- Formulários ---
            models::form::FormDocument,
            models::form::FormSection,
            models::form::FormField,
            models::form::FieldKind,
            models::form::FormTemplate,
            models::form::FormTemplateSummary,
            models::form::FormListEntry,
            models::form::ClientFormEntry,
            models::form::FormListing,
            models::form::FormSubmission,
            models::form::SubmissionEntry,
            models::form::FormFieldsInput,
            models::form::CreateFormPayload,
            models::form::UpdateFormPayload,
            models::form::CreateSubmissionPayload,

            // --- Solicitações ---
            models::request::RequestStatus,
            models::request::RequestPriority,
            models::request::ServiceRequest,
            models::request::ServiceRequestEntry,
            models::request::CreateRequestPayload,
            models::request::UpdateRequestStatusPayload,

            // --- Dashboard ---
            models::dashboard::DashboardCounts,
            models::dashboard::ActivityKind,
            models::dashboard::ActivityEntry,
            models::dashboard::DashboardData,
            models::dashboard::RoleCount,
            models::dashboard::SystemHealth,
            models::dashboard::AdminStats,

            // --- Webhooks ---
            services::webhook_service::WebhookAck,
        )
    ),
    tags(
        (name = "Permissões", description = "Tabela fixa papel -> capacidades"),
        (name = "Usuários", description = "Espelho local dos usuários do provedor de identidade"),
        (name = "Perfil do Cliente", description = "Dados de marca e redes sociais do cliente"),
        (name = "Administração", description = "Convite/criação de clientes e estatísticas"),
        (name = "Dashboard", description = "Indicadores no escopo do papel"),
        (name = "Modelos de Serviço", description = "Moldes de tarefas, marcos e formulários"),
        (name = "Serviços", description = "Serviços instanciados para clientes e seu progresso"),
        (name = "Solicitações", description = "Pedidos de suporte dos clientes"),
        (name = "Formulários", description = "Construtor de formulários e respostas"),
        (name = "Webhooks", description = "Sincronização com o provedor de identidade")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
