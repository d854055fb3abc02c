// src/db/user_repo.rs

use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{User, UserMirror, UserServiceEntry, UserSummary},
        rbac::Role,
    },
};

// O repositório do espelho de usuários (tabela 'users')
#[derive(Clone, Default)]
pub struct UserRepository;

impl UserRepository {
    pub fn new() -> Self {
        Self
    }

    // Busca pelo ID do provedor de identidade
    pub async fn find_by_external_id<'e, E>(
        &self,
        executor: E,
        external_id: &str,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    // Variantes com trava de linha, para troca de papel dentro de uma transação
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn lock_by_external_id<'e, E>(
        &self,
        executor: E,
        external_id: &str,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1 FOR UPDATE")
            .bind(external_id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    /// Perfis + serviços ainda ligados ao usuário como cliente.
    pub async fn count_client_records<'e, E>(&self, executor: E, user_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT
                (SELECT COUNT(*) FROM client_profiles WHERE user_id = $1)
              + (SELECT COUNT(*) FROM services WHERE client_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    /// Cria ou atualiza o espelho (chave: external_id). Usado pelo webhook.
    pub async fn upsert_mirror<'e, E>(&self, executor: E, mirror: &UserMirror) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, email, first_name, last_name, name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                name = EXCLUDED.name,
                role = EXCLUDED.role,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(&mirror.external_id)
        .bind(&mirror.email)
        .bind(&mirror.first_name)
        .bind(&mirror.last_name)
        .bind(mirror.name())
        .bind(mirror.role)
        .fetch_one(executor)
        .await?;
        Ok(user)
    }

    /// Criação preguiçosa: se outra requisição inseriu primeiro, devolve a linha existente intacta.
    pub async fn insert_mirror_if_absent<'e, E>(
        &self,
        executor: E,
        mirror: &UserMirror,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, email, first_name, last_name, name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_id) DO UPDATE SET external_id = users.external_id
            RETURNING *
            "#,
        )
        .bind(&mirror.external_id)
        .bind(&mirror.email)
        .bind(&mirror.first_name)
        .bind(&mirror.last_name)
        .bind(mirror.name())
        .bind(mirror.role)
        .fetch_one(executor)
        .await?;
        Ok(user)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        role: Option<Role>,
        include_services: bool,
    ) -> Result<Vec<UserSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT
                u.id, u.external_id, u.email, u.first_name, u.last_name, u.role, u.created_at,
                CASE WHEN $2 THEN (
                    SELECT COUNT(*) FROM services s
                    WHERE s.client_id = u.id AND s.status = 'ACTIVE'
                ) END AS active_services
            FROM users u
            WHERE ($1::user_role IS NULL OR u.role = $1)
            ORDER BY u.created_at DESC
            "#,
        )
        .bind(role)
        .bind(include_services)
        .fetch_all(executor)
        .await?;
        Ok(users)
    }

    pub async fn update_role<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        role: Role,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }

    // Serviços de um cliente (detalhe do usuário)
    pub async fn list_services<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<UserServiceEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let services = sqlx::query_as::<_, UserServiceEntry>(
            r#"
            SELECT s.id, s.name, s.description, s.status, s.template_id,
                   t.name AS template_name, s.created_at
            FROM services s
            JOIN service_templates t ON t.id = s.template_id
            WHERE s.client_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(services)
    }

    /// Remove o usuário e tudo o que ele possui, em ordem (sem cascade no banco).
    /// Roda dentro da transação do chamador.
    pub async fn delete_cascade(&self, conn: &mut PgConnection, user_id: Uuid) -> Result<(), AppError> {
        let owned_services = "SELECT id FROM services WHERE client_id = $1";

        for statement in [
            format!("DELETE FROM service_tasks WHERE service_id IN ({owned_services})"),
            format!("DELETE FROM service_milestones WHERE service_id IN ({owned_services})"),
            format!("DELETE FROM assigned_forms WHERE service_id IN ({owned_services})"),
            format!(
                "DELETE FROM service_requests WHERE client_id = $1 OR service_id IN ({owned_services})"
            ),
            "DELETE FROM services WHERE client_id = $1".to_string(),
            "DELETE FROM form_submissions WHERE user_id = $1".to_string(),
            "DELETE FROM social_media_profiles WHERE profile_id IN \
             (SELECT id FROM client_profiles WHERE user_id = $1)"
                .to_string(),
            "DELETE FROM client_profiles WHERE user_id = $1".to_string(),
            "DELETE FROM users WHERE id = $1".to_string(),
        ] {
            sqlx::query(&statement).bind(user_id).execute(&mut *conn).await?;
        }

        Ok(())
    }
}
