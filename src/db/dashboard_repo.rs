// src/db/dashboard_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{ActivityEntry, ActivityKind, DashboardCounts, RoleCount},
};

#[derive(Clone, Default)]
pub struct DashboardRepository;

type ActivityRow = (Uuid, String, DateTime<Utc>);

impl DashboardRepository {
    pub fn new() -> Self {
        Self
    }

    /// Cards do topo. Com `client_id`, conta só o que é do cliente.
    pub async fn counts<'e, E>(&self, executor: E, client_id: Option<Uuid>) -> Result<DashboardCounts, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let counts = sqlx::query_as::<_, DashboardCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM services s
                  WHERE ($1::uuid IS NULL OR s.client_id = $1)) AS total_services,
                (SELECT COUNT(*) FROM services s
                  WHERE ($1::uuid IS NULL OR s.client_id = $1) AND s.status = 'ACTIVE') AS active_services,
                (SELECT COUNT(*) FROM service_requests r
                  WHERE ($1::uuid IS NULL OR r.client_id = $1)
                    AND r.status IN ('OPEN', 'IN_PROGRESS')) AS open_requests,
                (SELECT COUNT(*) FROM service_requests r
                  WHERE ($1::uuid IS NULL OR r.client_id = $1)
                    AND r.status IN ('OPEN', 'IN_PROGRESS') AND r.priority = 'URGENT') AS urgent_requests,
                (SELECT COUNT(*) FROM assigned_forms af
                  JOIN services s ON s.id = af.service_id
                  WHERE ($1::uuid IS NULL OR s.client_id = $1)
                    AND af.required
                    AND NOT EXISTS (
                        SELECT 1 FROM form_submissions fs
                        WHERE fs.form_id = af.form_id AND fs.user_id = s.client_id
                    )) AS pending_forms,
                (SELECT COUNT(*) FROM service_milestones sm
                  JOIN services s ON s.id = sm.service_id
                  WHERE ($1::uuid IS NULL OR s.client_id = $1) AND sm.achieved) AS achieved_milestones,
                (SELECT COUNT(*) FROM service_milestones sm
                  JOIN services s ON s.id = sm.service_id
                  WHERE ($1::uuid IS NULL OR s.client_id = $1)) AS total_milestones,
                (SELECT COUNT(*) FROM users u
                  WHERE $1::uuid IS NULL AND u.role = 'CLIENT') AS total_clients
            "#,
        )
        .bind(client_id)
        .fetch_one(executor)
        .await?;
        Ok(counts)
    }

    // =========================================================================
    //  FEEDS DE ATIVIDADE (um por tabela; o serviço faz o merge)
    // =========================================================================

    pub async fn recent_users<'e, E>(&self, executor: E, limit: i64) -> Result<Vec<ActivityEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, 'Novo usuário: ' || COALESCE(name, email), created_at
            FROM users ORDER BY created_at DESC LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(into_activity(ActivityKind::User, rows))
    }

    pub async fn recent_services<'e, E>(
        &self,
        executor: E,
        client_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, 'Novo serviço: ' || name, created_at
            FROM services
            WHERE ($1::uuid IS NULL OR client_id = $1)
            ORDER BY created_at DESC LIMIT $2
            "#,
        )
        .bind(client_id)
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(into_activity(ActivityKind::Service, rows))
    }

    pub async fn recent_submissions<'e, E>(
        &self,
        executor: E,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT fs.id, 'Formulário enviado: ' || f.name, fs.submitted_at
            FROM form_submissions fs
            JOIN form_templates f ON f.id = fs.form_id
            WHERE ($1::uuid IS NULL OR fs.user_id = $1)
            ORDER BY fs.submitted_at DESC LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(into_activity(ActivityKind::Form, rows))
    }

    pub async fn recent_requests<'e, E>(
        &self,
        executor: E,
        client_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, 'Solicitação: ' || title, created_at
            FROM service_requests
            WHERE ($1::uuid IS NULL OR client_id = $1)
            ORDER BY created_at DESC LIMIT $2
            "#,
        )
        .bind(client_id)
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(into_activity(ActivityKind::Request, rows))
    }

    // =========================================================================
    //  ESTATÍSTICAS DE USUÁRIOS (painel administrativo)
    // =========================================================================

    /// (total, novos no mês corrente)
    pub async fn user_totals<'e, E>(&self, executor: E) -> Result<(i64, i64), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE created_at >= date_trunc('month', NOW()))
            FROM users
            "#,
        )
        .fetch_one(executor)
        .await?;
        Ok(totals)
    }

    pub async fn users_by_role<'e, E>(&self, executor: E) -> Result<Vec<RoleCount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let counts = sqlx::query_as::<_, RoleCount>(
            "SELECT role, COUNT(*) AS count FROM users GROUP BY role ORDER BY role",
        )
        .fetch_all(executor)
        .await?;
        Ok(counts)
    }

    pub async fn ping<'e, E>(&self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT 1").execute(executor).await?;
        Ok(())
    }
}

fn into_activity(kind: ActivityKind, rows: Vec<ActivityRow>) -> Vec<ActivityEntry> {
    rows.into_iter()
        .map(|(id, title, timestamp)| ActivityEntry { id, kind, title, timestamp })
        .collect()
}
