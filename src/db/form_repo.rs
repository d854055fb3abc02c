// src/db/form_repo.rs

use serde_json::Value;
use sqlx::{types::Json, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::form::{
        ClientFormEntry, FormDocument, FormListEntry, FormSubmission, FormTemplate, SubmissionEntry,
    },
};

#[derive(Clone, Default)]
pub struct FormRepository;

impl FormRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  MODELOS DE FORMULÁRIO
    // =========================================================================

    pub async fn list_all<'e, E>(&self, executor: E) -> Result<Vec<FormListEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let forms = sqlx::query_as::<_, FormListEntry>(
            r#"
            SELECT
                f.id, f.name, f.description, f.is_template,
                (SELECT COUNT(*) FROM assigned_forms af WHERE af.form_id = f.id) AS assigned_count,
                (SELECT COUNT(*) FROM form_submissions fs WHERE fs.form_id = f.id) AS submission_count,
                f.created_at, f.updated_at
            FROM form_templates f
            ORDER BY f.updated_at DESC
            "#,
        )
        .fetch_all(executor)
        .await?;
        Ok(forms)
    }

    /// Formulários vinculados aos serviços do cliente.
    pub async fn list_for_client<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Vec<ClientFormEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let forms = sqlx::query_as::<_, ClientFormEntry>(
            r#"
            SELECT
                af.id AS assignment_id, f.id AS form_id, f.name, f.description, f.fields,
                af.required, s.id AS service_id, s.name AS service_name,
                EXISTS (
                    SELECT 1 FROM form_submissions fs
                    WHERE fs.form_id = f.id AND fs.user_id = $1
                ) AS submitted
            FROM assigned_forms af
            JOIN services s ON s.id = af.service_id
            JOIN form_templates f ON f.id = af.form_id
            WHERE s.client_id = $1
            ORDER BY af.required DESC, f.name
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(forms)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<FormTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let form = sqlx::query_as::<_, FormTemplate>("SELECT * FROM form_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(form)
    }

    // Trava a linha: quem vincular o formulário ao mesmo tempo espera a exclusão terminar
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<FormTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let form = sqlx::query_as::<_, FormTemplate>("SELECT * FROM form_templates WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(form)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        fields: &FormDocument,
        is_template: bool,
    ) -> Result<FormTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let form = sqlx::query_as::<_, FormTemplate>(
            r#"
            INSERT INTO form_templates (name, description, fields, is_template)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(Json(fields))
        .bind(is_template)
        .fetch_one(executor)
        .await?;
        Ok(form)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        fields: Option<&FormDocument>,
        is_template: Option<bool>,
    ) -> Result<Option<FormTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let form = sqlx::query_as::<_, FormTemplate>(
            r#"
            UPDATE form_templates SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                fields = COALESCE($4, fields),
                is_template = COALESCE($5, is_template),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(fields.map(Json))
        .bind(is_template)
        .fetch_optional(executor)
        .await?;
        Ok(form)
    }

    /// Quantos serviços ou modelos de serviço ainda apontam para o formulário.
    pub async fn count_references<'e, E>(&self, executor: E, id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM assigned_forms WHERE form_id = $1)
              + (SELECT COUNT(*) FROM template_required_forms WHERE form_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    /// Remove o formulário e as respostas dele. Roda na transação do chamador.
    pub async fn delete_with_submissions(&self, conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
        sqlx::query("DELETE FROM form_submissions WHERE form_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM form_templates WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  RESPOSTAS
    // =========================================================================

    /// O formulário está vinculado a algum serviço do usuário?
    pub async fn is_assigned_to_client<'e, E>(&self, executor: E, form_id: Uuid, user_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (assigned,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM assigned_forms af
                JOIN services s ON s.id = af.service_id
                WHERE af.form_id = $1 AND s.client_id = $2
            )
            "#,
        )
        .bind(form_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(assigned)
    }

    pub async fn insert_submission<'e, E>(
        &self,
        executor: E,
        form_id: Uuid,
        user_id: Uuid,
        data: &Value,
    ) -> Result<FormSubmission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let submission = sqlx::query_as::<_, FormSubmission>(
            r#"
            INSERT INTO form_submissions (form_id, user_id, data)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(form_id)
        .bind(user_id)
        .bind(data)
        .fetch_one(executor)
        .await?;
        Ok(submission)
    }

    pub async fn list_submissions<'e, E>(
        &self,
        executor: E,
        user_id: Option<Uuid>,
        form_id: Option<Uuid>,
    ) -> Result<Vec<SubmissionEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let submissions = sqlx::query_as::<_, SubmissionEntry>(
            r#"
            SELECT
                fs.id, fs.form_id, f.name AS form_name, fs.user_id, u.email AS user_email,
                fs.data, fs.submitted_at
            FROM form_submissions fs
            JOIN form_templates f ON f.id = fs.form_id
            JOIN users u ON u.id = fs.user_id
            WHERE ($1::uuid IS NULL OR fs.user_id = $1)
              AND ($2::uuid IS NULL OR fs.form_id = $2)
            ORDER BY fs.submitted_at DESC
            "#,
        )
        .bind(user_id)
        .bind(form_id)
        .fetch_all(executor)
        .await?;
        Ok(submissions)
    }
}
