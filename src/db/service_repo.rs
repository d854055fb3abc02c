// src/db/service_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        service::{
            AssignedFormEntry, ClientBrief, Service, ServiceMilestone, ServiceStatus, ServiceSummary,
            ServiceTask, TaskStatus, TemplateBrief,
        },
        template::TemplateStep,
    },
};

#[derive(Clone, Default)]
pub struct ServiceRepository;

impl ServiceRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Lista serviços. Com `client_id`, só os daquele cliente.
    pub async fn list<'e, E>(&self, executor: E, client_id: Option<Uuid>) -> Result<Vec<ServiceSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let services = sqlx::query_as::<_, ServiceSummary>(
            r#"
            SELECT
                s.id, s.name, s.description, s.status, s.start_date, s.end_date,
                s.client_id, u.email AS client_email, u.name AS client_name,
                s.template_id, t.name AS template_name,
                (SELECT COUNT(*) FROM service_tasks st WHERE st.service_id = s.id) AS total_tasks,
                (SELECT COUNT(*) FROM service_tasks st
                  WHERE st.service_id = s.id AND st.status = 'COMPLETED') AS completed_tasks,
                (SELECT COUNT(*) FROM service_milestones sm WHERE sm.service_id = s.id) AS total_milestones,
                (SELECT COUNT(*) FROM service_milestones sm
                  WHERE sm.service_id = s.id AND sm.achieved) AS achieved_milestones,
                s.created_at
            FROM services s
            JOIN users u ON u.id = s.client_id
            JOIN service_templates t ON t.id = s.template_id
            WHERE ($1::uuid IS NULL OR s.client_id = $1)
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(executor)
        .await?;
        Ok(services)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Service>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(service)
    }

    pub async fn client_brief<'e, E>(&self, executor: E, user_id: Uuid) -> Result<ClientBrief, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, ClientBrief>(
            "SELECT id, email, first_name, last_name, name FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(client)
    }

    pub async fn template_brief<'e, E>(&self, executor: E, template_id: Uuid) -> Result<TemplateBrief, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, TemplateBrief>(
            "SELECT id, name, description FROM service_templates WHERE id = $1",
        )
        .bind(template_id)
        .fetch_one(executor)
        .await?;
        Ok(template)
    }

    pub async fn list_tasks<'e, E>(&self, executor: E, service_id: Uuid) -> Result<Vec<ServiceTask>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tasks = sqlx::query_as::<_, ServiceTask>(
            "SELECT * FROM service_tasks WHERE service_id = $1 ORDER BY position",
        )
        .bind(service_id)
        .fetch_all(executor)
        .await?;
        Ok(tasks)
    }

    pub async fn list_milestones<'e, E>(
        &self,
        executor: E,
        service_id: Uuid,
    ) -> Result<Vec<ServiceMilestone>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let milestones = sqlx::query_as::<_, ServiceMilestone>(
            "SELECT * FROM service_milestones WHERE service_id = $1 ORDER BY position",
        )
        .bind(service_id)
        .fetch_all(executor)
        .await?;
        Ok(milestones)
    }

    /// Formulários do serviço; `submitted` diz se o dono do serviço já respondeu.
    pub async fn list_assigned_forms<'e, E>(
        &self,
        executor: E,
        service_id: Uuid,
    ) -> Result<Vec<AssignedFormEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let forms = sqlx::query_as::<_, AssignedFormEntry>(
            r#"
            SELECT
                af.id, af.form_id, f.name AS form_name, af.required,
                EXISTS (
                    SELECT 1 FROM form_submissions fs
                    WHERE fs.form_id = af.form_id AND fs.user_id = s.client_id
                ) AS submitted
            FROM assigned_forms af
            JOIN form_templates f ON f.id = af.form_id
            JOIN services s ON s.id = af.service_id
            WHERE af.service_id = $1
            ORDER BY f.name
            "#,
        )
        .bind(service_id)
        .fetch_all(executor)
        .await?;
        Ok(forms)
    }

    // =========================================================================
    //  INSTANCIAÇÃO (cópias congeladas do molde)
    // =========================================================================

    pub async fn insert_service<'e, E>(
        &self,
        executor: E,
        template_id: Uuid,
        client_id: Uuid,
        name: &str,
        description: Option<&str>,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Service, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service = sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (template_id, client_id, name, description, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(template_id)
        .bind(client_id)
        .bind(name)
        .bind(description)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(executor)
        .await?;
        Ok(service)
    }

    pub async fn copy_tasks<'e, E>(
        &self,
        executor: E,
        service_id: Uuid,
        steps: &[TemplateStep],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (ids, titles, descriptions, positions) = step_arrays(steps);
        let result = sqlx::query(
            r#"
            INSERT INTO service_tasks (service_id, source_task_id, title, description, position)
            SELECT $1, source_id, title, description, position
            FROM UNNEST($2::uuid[], $3::text[], $4::text[], $5::int4[])
                AS s(source_id, title, description, position)
            "#,
        )
        .bind(service_id)
        .bind(&ids)
        .bind(&titles)
        .bind(&descriptions)
        .bind(&positions)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn copy_milestones<'e, E>(
        &self,
        executor: E,
        service_id: Uuid,
        steps: &[TemplateStep],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (ids, titles, descriptions, positions) = step_arrays(steps);
        let result = sqlx::query(
            r#"
            INSERT INTO service_milestones (service_id, source_milestone_id, title, description, position)
            SELECT $1, source_id, title, description, position
            FROM UNNEST($2::uuid[], $3::text[], $4::text[], $5::int4[])
                AS s(source_id, title, description, position)
            "#,
        )
        .bind(service_id)
        .bind(&ids)
        .bind(&titles)
        .bind(&descriptions)
        .bind(&positions)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn assign_forms<'e, E>(
        &self,
        executor: E,
        service_id: Uuid,
        form_ids: &[Uuid],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO assigned_forms (service_id, form_id, required)
            SELECT $1, form_id, TRUE FROM UNNEST($2::uuid[]) AS f(form_id)
            "#,
        )
        .bind(service_id)
        .bind(form_ids)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  MUTAÇÕES DE STATUS
    // =========================================================================

    /// Atualiza uma tarefa *deste* serviço. `None` se o id não pertence ao serviço.
    pub async fn update_task<'e, E>(
        &self,
        executor: E,
        service_id: Uuid,
        task_id: Uuid,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<ServiceTask>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, ServiceTask>(
            r#"
            UPDATE service_tasks
            SET status = $3, completed_at = $4, updated_at = NOW()
            WHERE id = $2 AND service_id = $1
            RETURNING *
            "#,
        )
        .bind(service_id)
        .bind(task_id)
        .bind(status)
        .bind(completed_at)
        .fetch_optional(executor)
        .await?;
        Ok(task)
    }

    pub async fn update_milestone<'e, E>(
        &self,
        executor: E,
        service_id: Uuid,
        milestone_id: Uuid,
        achieved: bool,
        achieved_at: Option<DateTime<Utc>>,
    ) -> Result<Option<ServiceMilestone>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let milestone = sqlx::query_as::<_, ServiceMilestone>(
            r#"
            UPDATE service_milestones
            SET achieved = $3, achieved_at = $4, updated_at = NOW()
            WHERE id = $2 AND service_id = $1
            RETURNING *
            "#,
        )
        .bind(service_id)
        .bind(milestone_id)
        .bind(achieved)
        .bind(achieved_at)
        .fetch_optional(executor)
        .await?;
        Ok(milestone)
    }

    /// `end_date`: `None` mantém, `Some(None)` limpa.
    pub async fn update_service<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: Option<ServiceStatus>,
        end_date: Option<Option<DateTime<Utc>>>,
    ) -> Result<Option<Service>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service = sqlx::query_as::<_, Service>(
            r#"
            UPDATE services SET
                status = COALESCE($2, status),
                end_date = CASE WHEN $3 THEN $4 ELSE end_date END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(end_date.is_some())
        .bind(end_date.flatten())
        .fetch_optional(executor)
        .await?;
        Ok(service)
    }

    /// Remove o serviço e tudo o que depende dele, em ordem. Roda na transação do chamador.
    pub async fn delete_cascade(&self, conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
        for statement in [
            "DELETE FROM service_tasks WHERE service_id = $1",
            "DELETE FROM service_milestones WHERE service_id = $1",
            "DELETE FROM assigned_forms WHERE service_id = $1",
            "DELETE FROM service_requests WHERE service_id = $1",
        ] {
            sqlx::query(statement).bind(id).execute(&mut *conn).await?;
        }

        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn step_arrays(steps: &[TemplateStep]) -> (Vec<Uuid>, Vec<String>, Vec<Option<String>>, Vec<i32>) {
    (
        steps.iter().map(|s| s.id).collect(),
        steps.iter().map(|s| s.title.clone()).collect(),
        steps.iter().map(|s| s.description.clone()).collect(),
        steps.iter().map(|s| s.position).collect(),
    )
}
