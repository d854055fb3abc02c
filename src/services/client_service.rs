// src/services/client_service.rs

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ClientRepository, UserRepository},
    models::{
        auth::User,
        client::{
            ClientAction, ClientActionPayload, ClientActionResponse, ClientProfile, UpsertProfilePayload,
        },
        rbac::Role,
    },
    services::identity_provider::{IdentityProvider, NewProviderUser},
};

#[derive(Clone)]
pub struct ClientService {
    user_repo: UserRepository,
    client_repo: ClientRepository,
    identity: Arc<dyn IdentityProvider>,
    app_base_url: String,
}

impl ClientService {
    pub fn new(
        user_repo: UserRepository,
        client_repo: ClientRepository,
        identity: Arc<dyn IdentityProvider>,
        app_base_url: String,
    ) -> Self {
        Self { user_repo, client_repo, identity, app_base_url }
    }

    pub async fn get_profile(&self, pool: &PgPool, user: &User) -> Result<Option<ClientProfile>, AppError> {
        let Some(profile) = self.client_repo.find_profile_by_user(pool, user.id).await? else {
            return Ok(None);
        };
        let social_media_profiles = self.client_repo.list_social_profiles(pool, profile.id).await?;
        Ok(Some(ClientProfile { profile, social_media_profiles }))
    }

    /// Cria/atualiza o próprio perfil. Redes sociais, quando enviadas, substituem as atuais
    /// na mesma transação.
    pub async fn upsert_profile(
        &self,
        pool: &PgPool,
        user: &User,
        payload: &UpsertProfilePayload,
    ) -> Result<ClientProfile, AppError> {
        if user.role != Role::Client {
            return Err(AppError::Forbidden("Apenas clientes possuem perfil.".to_string()));
        }

        let mut tx = pool.begin().await?;

        let profile = self.client_repo.upsert_profile(&mut *tx, user.id, &payload.fields).await?;
        let social_media_profiles = match &payload.social_media_profiles {
            Some(links) => self.client_repo.replace_social_profiles(&mut tx, profile.id, links).await?,
            None => self.client_repo.list_social_profiles(&mut *tx, profile.id).await?,
        };

        tx.commit().await?;

        Ok(ClientProfile { profile, social_media_profiles })
    }

    /// Convite (o provedor manda o e-mail) ou criação direta (provedor + espelho + perfil).
    pub async fn client_action(
        &self,
        pool: &PgPool,
        actor: &User,
        payload: &ClientActionPayload,
    ) -> Result<ClientActionResponse, AppError> {
        let action = payload
            .action
            .ok_or_else(|| AppError::InvalidPayload("O campo 'action' é obrigatório.".to_string()))?;
        let email = payload
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::InvalidPayload("O campo 'email' é obrigatório.".to_string()))?;

        match action {
            ClientAction::Invite => {
                let redirect_url = format!("{}/sign-up", self.app_base_url.trim_end_matches('/'));
                self.identity.create_invitation(email, Role::Client, &redirect_url).await?;
                tracing::info!(email = %email, actor = %actor.id, "Cliente convidado");

                Ok(ClientActionResponse {
                    message: "Invitation sent successfully".to_string(),
                    user_id: None,
                })
            }
            ClientAction::Create => {
                let user_id = self.create_client(pool, email, payload).await?;
                tracing::info!(email = %email, user_id = %user_id, actor = %actor.id, "Cliente criado");

                Ok(ClientActionResponse {
                    message: "Client created successfully".to_string(),
                    user_id: Some(user_id),
                })
            }
        }
    }

    async fn create_client(&self, pool: &PgPool, email: &str, payload: &ClientActionPayload) -> Result<Uuid, AppError> {
        let provider_user = self
            .identity
            .create_user(&NewProviderUser {
                email,
                first_name: payload.first_name.as_deref(),
                last_name: payload.last_name.as_deref(),
                role: Role::Client,
            })
            .await?;

        let mut mirror = provider_user.into_mirror()?;
        // O papel pedido vale mesmo se o provedor não devolver os metadados
        mirror.role = Role::Client;

        let mut tx = pool.begin().await?;

        let user = self.user_repo.upsert_mirror(&mut *tx, &mirror).await?;
        let profile = self.client_repo.upsert_profile(&mut *tx, user.id, &payload.profile).await?;
        if !payload.social_media_profiles.is_empty() {
            self.client_repo
                .replace_social_profiles(&mut tx, profile.id, &payload.social_media_profiles)
                .await?;
        }

        tx.commit().await?;

        Ok(user.id)
    }
}
