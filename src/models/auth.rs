// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::client::ClientProfile;
use crate::models::rbac::Role;

// Representa o espelho local de um usuário do provedor de identidade
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    // ID do usuário no provedor de identidade
    #[schema(example = "user_2abcXYZ")]
    pub external_id: String,

    #[schema(example = "maria@email.com")]
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub role: Role,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Nome para exibição: "Nome Sobrenome", ou o e-mail se não houver nome.
    pub fn display_name(&self) -> String {
        display_name(self.first_name.as_deref(), self.last_name.as_deref(), &self.email)
    }
}

pub fn display_name(first_name: Option<&str>, last_name: Option<&str>, email: &str) -> String {
    let full = format!("{} {}", first_name.unwrap_or(""), last_name.unwrap_or(""));
    let full = full.trim();
    if full.is_empty() {
        email.to_string()
    } else {
        full.to_string()
    }
}

// Dados usados para criar/atualizar o espelho (webhook ou criação preguiçosa)
#[derive(Debug, Clone)]
pub struct UserMirror {
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

impl UserMirror {
    pub fn name(&self) -> Option<String> {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let full = full.trim();
        (!full.is_empty()).then(|| full.to_string())
    }
}

// GET /api/users (linha da listagem)
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    // Só vem preenchido com ?includeServices=true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_services: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// GET /api/users/me
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: User,
    pub client_profile: Option<ClientProfile>,
}

// Serviço resumido dentro do detalhe de um usuário
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserServiceEntry {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: crate::models::service::ServiceStatus,
    pub template_id: Uuid,
    pub template_name: String,
    pub created_at: DateTime<Utc>,
}

// GET /api/users/{id}
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub client_profile: Option<ClientProfile>,
    pub services: Vec<UserServiceEntry>,
}

// Filtros do GET /api/users
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub role: Option<Role>,
    #[serde(default)]
    pub include_services: bool,
}

// PATCH /api/users/{id}/role
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolePayload {
    pub role: Role,
}

// Estrutura de dados ("claims") dentro do token de sessão
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (ID do usuário no provedor)
    pub exp: usize,  // Expiration time
    #[serde(default)]
    pub iat: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_email() {
        assert_eq!(display_name(Some("Ana"), Some("Lima"), "a@x.com"), "Ana Lima");
        assert_eq!(display_name(Some("Ana"), None, "a@x.com"), "Ana");
        assert_eq!(display_name(None, None, "a@x.com"), "a@x.com");
        assert_eq!(display_name(Some("  "), None, "a@x.com"), "a@x.com");
    }

    #[test]
    fn mirror_name_is_none_when_blank() {
        let mirror = UserMirror {
            external_id: "user_1".into(),
            email: "a@x.com".into(),
            first_name: None,
            last_name: Some("Lima".into()),
            role: Role::Client,
        };
        assert_eq!(mirror.name().as_deref(), Some("Lima"));

        let blank = UserMirror { last_name: None, ..mirror };
        assert_eq!(blank.name(), None);
    }
}
