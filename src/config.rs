// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        ClientRepository, DashboardRepository, FormRepository, RequestRepository, ServiceRepository,
        TemplateRepository, UserRepository,
    },
    services::{
        assignment_service::AssignmentService,
        auth::AuthService,
        client_service::ClientService,
        dashboard_service::DashboardService,
        form_service::FormService,
        identity_provider::{HttpIdentityProvider, IdentityProvider},
        request_service::RequestService,
        template_service::TemplateService,
        user_service::UserService,
        webhook_service::{WebhookService, WebhookVerifier},
    },
};

/// Como validar o token de sessão: chave pública do provedor (RS256) ou segredo compartilhado (HS256).
#[derive(Debug, Clone)]
pub enum TokenVerification {
    RsaPublicKey(String),
    Secret(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub database_max_connections: u32,
    pub token_verification: TokenVerification,
    pub webhook_secret: String,
    pub identity_api_url: String,
    pub identity_secret_key: String,
    pub app_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let token_verification = match (optional("JWT_PUBLIC_KEY"), optional("JWT_SECRET")) {
            // PEM vindo de .env costuma ter "\n" literais
            (Some(pem), _) => TokenVerification::RsaPublicKey(pem.replace("\\n", "\n")),
            (None, Some(secret)) => TokenVerification::Secret(secret),
            (None, None) => anyhow::bail!("JWT_PUBLIC_KEY ou JWT_SECRET deve ser definido"),
        };

        let database_max_connections = match optional("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS inválido: {raw}"))?,
            None => 5,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            database_max_connections,
            token_verification,
            webhook_secret: required("WEBHOOK_SECRET")?,
            identity_api_url: optional("IDENTITY_API_URL")
                .unwrap_or_else(|| "https://api.clerk.com/v1".to_string()),
            identity_secret_key: required("IDENTITY_SECRET_KEY")?,
            app_base_url: optional("APP_BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    optional(name).with_context(|| format!("{name} deve ser definida"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub client_service: ClientService,
    pub template_service: TemplateService,
    pub assignment_service: AssignmentService,
    pub form_service: FormService,
    pub request_service: RequestService,
    pub dashboard_service: DashboardService,
    pub webhook_service: WebhookService,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let identity = HttpIdentityProvider::new(&config.identity_api_url, &config.identity_secret_key)?;
        Self::from_parts(db_pool, config, Arc::new(identity))
    }

    /// Monta o gráfico de dependências. Os testes entram por aqui com um provedor falso.
    pub fn from_parts(
        db_pool: PgPool,
        config: &AppConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> anyhow::Result<Self> {
        let user_repo = UserRepository::new();
        let client_repo = ClientRepository::new();
        let template_repo = TemplateRepository::new();
        let service_repo = ServiceRepository::new();
        let form_repo = FormRepository::new();
        let request_repo = RequestRepository::new();
        let dashboard_repo = DashboardRepository::new();

        let auth_service = AuthService::new(user_repo.clone(), identity.clone(), &config.token_verification)
            .map_err(|e| anyhow::anyhow!("Chave de verificação de token inválida: {e}"))?;
        let user_service = UserService::new(user_repo.clone(), client_repo.clone(), identity.clone());
        let client_service = ClientService::new(
            user_repo.clone(),
            client_repo,
            identity,
            config.app_base_url.clone(),
        );
        let template_service = TemplateService::new(template_repo.clone());
        let assignment_service = AssignmentService::new(service_repo.clone(), template_repo, user_repo.clone());
        let form_service = FormService::new(form_repo);
        let request_service = RequestService::new(request_repo, service_repo);
        let dashboard_service = DashboardService::new(dashboard_repo);
        let webhook_service = WebhookService::new(WebhookVerifier::new(&config.webhook_secret)?, user_repo);

        Ok(Self {
            db_pool,
            auth_service,
            user_service,
            client_service,
            template_service,
            assignment_service,
            form_service,
            request_service,
            dashboard_service,
            webhook_service,
        })
    }
}
