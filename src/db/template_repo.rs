// src/db/template_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        form::FormTemplateSummary,
        template::{
            step_columns, ServiceTemplate, StepInput, TemplateCounts, TemplateListEntry,
            TemplateStep,
        },
    },
};

/// Tarefas e marcos do modelo vivem em tabelas gêmeas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Task,
    Milestone,
}

impl StepKind {
    fn table(self) -> &'static str {
        match self {
            StepKind::Task => "template_tasks",
            StepKind::Milestone => "template_milestones",
        }
    }
}

const COUNTS: &str = r#"
    (SELECT COUNT(*) FROM services s WHERE s.template_id = t.id) AS services,
    (SELECT COUNT(*) FROM template_tasks tt WHERE tt.template_id = t.id) AS tasks,
    (SELECT COUNT(*) FROM template_milestones tm WHERE tm.template_id = t.id) AS milestones
"#;

#[derive(Clone, Default)]
pub struct TemplateRepository;

impl TemplateRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  O MOLDE
    // =========================================================================

    pub async fn list<'e, E>(&self, executor: E, active_only: bool) -> Result<Vec<TemplateListEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT t.*, {COUNTS} FROM service_templates t \
             WHERE (NOT $1 OR t.is_active) ORDER BY t.name"
        );
        let templates = sqlx::query_as::<_, TemplateListEntry>(&sql)
            .bind(active_only)
            .fetch_all(executor)
            .await?;
        Ok(templates)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<ServiceTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, ServiceTemplate>("SELECT * FROM service_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(template)
    }

    /// Trava a linha do modelo até o fim da transação (exclusão e edição).
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<ServiceTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, ServiceTemplate>(
            "SELECT * FROM service_templates WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(template)
    }

    pub async fn counts<'e, E>(&self, executor: E, id: Uuid) -> Result<TemplateCounts, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {COUNTS} FROM service_templates t WHERE t.id = $1");
        let counts = sqlx::query_as::<_, TemplateCounts>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(counts.unwrap_or_default())
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        is_active: bool,
    ) -> Result<ServiceTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, ServiceTemplate>(
            r#"
            INSERT INTO service_templates (name, description, is_active)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(is_active)
        .fetch_one(executor)
        .await?;
        Ok(template)
    }

    /// Atualiza só os campos enviados.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Option<ServiceTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, ServiceTemplate>(
            r#"
            UPDATE service_templates SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(is_active)
        .fetch_optional(executor)
        .await?;
        Ok(template)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM service_templates WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  TAREFAS / MARCOS DO MOLDE
    // =========================================================================

    pub async fn list_steps<'e, E>(
        &self,
        executor: E,
        kind: StepKind,
        template_id: Uuid,
    ) -> Result<Vec<TemplateStep>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT id, template_id, title, description, position FROM {} \
             WHERE template_id = $1 ORDER BY position",
            kind.table()
        );
        let steps = sqlx::query_as::<_, TemplateStep>(&sql)
            .bind(template_id)
            .fetch_all(executor)
            .await?;
        Ok(steps)
    }

    /// Insere os passos na ordem recebida (posição = índice).
    pub async fn insert_steps<'e, E>(
        &self,
        executor: E,
        kind: StepKind,
        template_id: Uuid,
        steps: &[StepInput],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (titles, descriptions, positions) = step_columns(steps);
        let sql = format!(
            "INSERT INTO {} (template_id, title, description, position) \
             SELECT $1, title, description, position \
             FROM UNNEST($2::text[], $3::text[], $4::int4[]) AS s(title, description, position)",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(template_id)
            .bind(&titles)
            .bind(&descriptions)
            .bind(&positions)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_steps<'e, E>(&self, executor: E, kind: StepKind, template_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("DELETE FROM {} WHERE template_id = $1", kind.table());
        let result = sqlx::query(&sql).bind(template_id).execute(executor).await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  FORMULÁRIOS OBRIGATÓRIOS
    // =========================================================================

    pub async fn list_required_forms<'e, E>(
        &self,
        executor: E,
        template_id: Uuid,
    ) -> Result<Vec<FormTemplateSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let forms = sqlx::query_as::<_, FormTemplateSummary>(
            r#"
            SELECT f.id, f.name, f.description
            FROM template_required_forms trf
            JOIN form_templates f ON f.id = trf.form_id
            WHERE trf.template_id = $1
            ORDER BY f.name
            "#,
        )
        .bind(template_id)
        .fetch_all(executor)
        .await?;
        Ok(forms)
    }

    pub async fn link_required_forms<'e, E>(
        &self,
        executor: E,
        template_id: Uuid,
        form_ids: &[Uuid],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO template_required_forms (template_id, form_id)
            SELECT $1, form_id FROM UNNEST($2::uuid[]) AS f(form_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(template_id)
        .bind(form_ids)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unlink_required_forms<'e, E>(&self, executor: E, template_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM template_required_forms WHERE template_id = $1")
            .bind(template_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
