// src/services/user_service.rs

use std::sync::Arc;

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::found, error::AppError},
    db::{ClientRepository, UserRepository},
    models::{
        auth::{CurrentUser, User, UserDetail, UserListQuery, UserSummary},
        client::ClientProfile,
        rbac::Role,
    },
    services::identity_provider::IdentityProvider,
};

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    client_repo: ClientRepository,
    identity: Arc<dyn IdentityProvider>,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        client_repo: ClientRepository,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self { user_repo, client_repo, identity }
    }

    pub async fn me<'e, E>(&self, executor: E, user: User) -> Result<CurrentUser, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let client_profile = self.load_profile(executor, user.id).await?;
        Ok(CurrentUser { user, client_profile })
    }

    pub async fn list<'e, E>(&self, executor: E, query: &UserListQuery) -> Result<Vec<UserSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.user_repo.list(executor, query.role, query.include_services).await
    }

    pub async fn detail<'e, E>(&self, executor: E, id: Uuid) -> Result<UserDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let user = found(self.user_repo.find_by_id(executor, id).await?, "Usuário")?;
        let client_profile = self.load_profile(executor, user.id).await?;
        let services = self.user_repo.list_services(executor, user.id).await?;

        Ok(UserDetail { user, client_profile, services })
    }

    /// Troca o papel no provedor primeiro: se ele recusar, nada muda localmente.
    /// A linha fica travada até o fim, junto com a checagem de dados de cliente.
    pub async fn update_role(&self, pool: &PgPool, actor: &User, id: Uuid, role: Role) -> Result<User, AppError> {
        if actor.id == id && role != Role::Admin {
            return Err(AppError::Conflict(
                "Um administrador não pode rebaixar o próprio papel.".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let target = found(self.user_repo.lock_by_id(&mut *tx, id).await?, "Usuário")?;
        if target.role == role {
            return Ok(target);
        }

        let owned = self.user_repo.count_client_records(&mut *tx, id).await?;
        ensure_role_change_allowed(target.role, role, owned)?;

        self.identity.update_role(&target.external_id, role).await?;
        let updated = found(self.user_repo.update_role(&mut *tx, id, role).await?, "Usuário")?;
        tx.commit().await?;

        tracing::info!(user_id = %id, from = ?target.role, to = ?role, actor = %actor.id, "Papel alterado");
        Ok(updated)
    }

    /// Perfil + redes sociais; `None` enquanto o cliente não criar um.
    pub async fn load_profile<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Option<ClientProfile>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let Some(profile) = self.client_repo.find_profile_by_user(executor, user_id).await? else {
            return Ok(None);
        };
        let social_media_profiles = self.client_repo.list_social_profiles(executor, profile.id).await?;
        Ok(Some(ClientProfile { profile, social_media_profiles }))
    }
}

/// Um cliente com perfil ou serviços não deixa de ser cliente: o perfil só existe
/// para usuários CLIENT e os serviços apontam para ele como cliente.
pub fn ensure_role_change_allowed(current: Role, next: Role, client_records: i64) -> Result<(), AppError> {
    if current == Role::Client && next != Role::Client && client_records > 0 {
        return Err(AppError::Conflict(format!(
            "O usuário ainda possui {client_records} perfil(is) ou serviço(s) como cliente; \
             remova-os antes de trocar o papel."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_with_records_keeps_client_role() {
        for next in [Role::Manager, Role::Admin] {
            assert!(matches!(
                ensure_role_change_allowed(Role::Client, next, 2),
                Err(AppError::Conflict(_))
            ));
        }
    }

    #[test]
    fn other_role_changes_pass() {
        assert!(ensure_role_change_allowed(Role::Client, Role::Manager, 0).is_ok());
        assert!(ensure_role_change_allowed(Role::Manager, Role::Client, 5).is_ok());
        assert!(ensure_role_change_allowed(Role::Admin, Role::Manager, 1).is_ok());
        assert!(ensure_role_change_allowed(Role::Client, Role::Client, 3).is_ok());
    }
}
