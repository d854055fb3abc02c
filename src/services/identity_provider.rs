// src/services/identity_provider.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;

use crate::{
    common::error::AppError,
    models::{auth::UserMirror, rbac::Role},
};

// =========================================================================
//  FORMATO DO USUÁRIO NO PROVEDOR (API REST e payload do webhook)
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEmail {
    pub id: String,
    pub email_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderMetadata {
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ProviderEmail>,
    pub primary_email_address_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub public_metadata: ProviderMetadata,
}

impl ProviderUser {
    /// E-mail principal; se o principal não for achado, o primeiro da lista.
    pub fn primary_email(&self) -> Option<&str> {
        let primary = self.primary_email_address_id.as_deref().and_then(|primary_id| {
            self.email_addresses.iter().find(|e| e.id == primary_id)
        });
        primary
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }

    pub fn role(&self) -> Role {
        Role::from_claim(self.public_metadata.role.as_deref())
    }

    /// Converte para o espelho local. Sem e-mail não há espelho.
    pub fn into_mirror(self) -> Result<UserMirror, AppError> {
        let email = self
            .primary_email()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidPayload("Usuário sem endereço de e-mail.".to_string()))?;
        let role = self.role();

        Ok(UserMirror {
            external_id: self.id,
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewProviderUser<'a> {
    pub email: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub role: Role,
}

// =========================================================================
//  O CONTRATO
// =========================================================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn fetch_user(&self, external_id: &str) -> Result<ProviderUser, AppError>;

    /// Convite por e-mail; o papel vai nos metadados públicos.
    async fn create_invitation(&self, email: &str, role: Role, redirect_url: &str) -> Result<(), AppError>;

    async fn create_user(&self, user: &NewProviderUser<'_>) -> Result<ProviderUser, AppError>;

    async fn update_role(&self, external_id: &str, role: Role) -> Result<(), AppError>;
}

// =========================================================================
//  CLIENTE HTTP (API REST do provedor hospedado)
// =========================================================================

#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    errors: Vec<ProviderErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorEntry {
    message: Option<String>,
    long_message: Option<String>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, secret_key: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {secret_key}"))?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 2xx segue; 4xx vira `IdentityProviderRejected` com a mensagem do provedor; o resto é 500.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            tracing::warn!(status = %status, "Provedor de identidade recusou a operação");
            return Err(AppError::IdentityProviderRejected(rejection_message(&body)));
        }

        Err(AppError::InternalServerError(anyhow::anyhow!(
            "provedor de identidade respondeu {status}: {body}"
        )))
    }
}

/// Extrai a mensagem mais útil do corpo de erro do provedor.
pub(crate) fn rejection_message(body: &str) -> String {
    serde_json::from_str::<ProviderErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next())
        .and_then(|e| e.long_message.or(e.message))
        .unwrap_or_else(|| "O provedor de identidade recusou a operação.".to_string())
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn fetch_user(&self, external_id: &str) -> Result<ProviderUser, AppError> {
        let response = self
            .client
            .get(self.url(&format!("/users/{external_id}")))
            .send()
            .await?;
        let user = Self::check(response).await?.json::<ProviderUser>().await?;
        Ok(user)
    }

    async fn create_invitation(&self, email: &str, role: Role, redirect_url: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.url("/invitations"))
            .json(&json!({
                "email_address": email,
                "redirect_url": redirect_url,
                "public_metadata": { "role": role.as_claim() },
            }))
            .send()
            .await?;
        Self::check(response).await?;
        tracing::info!(email = %email, role = role.as_claim(), "Convite criado no provedor de identidade");
        Ok(())
    }

    async fn create_user(&self, user: &NewProviderUser<'_>) -> Result<ProviderUser, AppError> {
        let response = self
            .client
            .post(self.url("/users"))
            .json(&json!({
                "email_address": [user.email],
                "first_name": user.first_name,
                "last_name": user.last_name,
                "skip_password_requirement": true,
                "public_metadata": { "role": user.role.as_claim() },
            }))
            .send()
            .await?;
        let created = Self::check(response).await?.json::<ProviderUser>().await?;
        Ok(created)
    }

    async fn update_role(&self, external_id: &str, role: Role) -> Result<(), AppError> {
        let response = self
            .client
            .patch(self.url(&format!("/users/{external_id}/metadata")))
            .json(&json!({ "public_metadata": { "role": role.as_claim() } }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(value: serde_json::Value) -> ProviderUser {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn picks_primary_email_and_role_claim() {
        let u = user(json!({
            "id": "user_1",
            "email_addresses": [
                { "id": "e1", "email_address": "old@x.com" },
                { "id": "e2", "email_address": "main@x.com" }
            ],
            "primary_email_address_id": "e2",
            "first_name": "Ana",
            "public_metadata": { "role": "Manager" }
        }));

        let mirror = u.into_mirror().unwrap();
        assert_eq!(mirror.email, "main@x.com");
        assert_eq!(mirror.role, Role::Manager);
        assert_eq!(mirror.first_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn missing_role_defaults_to_client() {
        let u = user(json!({
            "id": "user_2",
            "email_addresses": [{ "id": "e1", "email_address": "a@x.com" }],
            "public_metadata": {}
        }));
        assert_eq!(u.role(), Role::Client);
        assert_eq!(u.primary_email(), Some("a@x.com"));
    }

    #[test]
    fn user_without_email_has_no_mirror() {
        let u = user(json!({ "id": "user_3", "email_addresses": [] }));
        assert!(matches!(u.into_mirror(), Err(AppError::InvalidPayload(_))));
    }

    #[test]
    fn rejection_message_prefers_long_message() {
        let body = r#"{"errors":[{"message":"taken","long_message":"That email address is taken."}]}"#;
        assert_eq!(rejection_message(body), "That email address is taken.");
        assert_eq!(
            rejection_message("not json"),
            "O provedor de identidade recusou a operação."
        );
    }
}
