// src/services/form_service.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::found, error::AppError},
    db::FormRepository,
    models::{
        auth::User,
        form::{
            CreateFormPayload, CreateSubmissionPayload, FormDocument, FormFieldsInput, FormListing,
            FormSubmission, FormTemplate, SubmissionEntry, SubmissionListQuery, UpdateFormPayload,
        },
    },
    services::form_builder::FormBuilder,
};

#[derive(Clone)]
pub struct FormService {
    repo: FormRepository,
}

impl FormService {
    pub fn new(repo: FormRepository) -> Self {
        Self { repo }
    }

    /// Documento completo passa direto; lista solta vira a seção "main" do editor.
    /// Em ambos os casos o documento é validado antes de gravar.
    pub fn normalize(input: FormFieldsInput) -> Result<FormDocument, AppError> {
        let document = match input {
            FormFieldsInput::Document(document) => document,
            FormFieldsInput::Fields(fields) => FormBuilder::from_fields(fields).into_document(),
        };
        document.validate().map_err(AppError::FormValidation)?;
        Ok(document)
    }

    pub async fn list<'e, E>(&self, executor: E, user: &User) -> Result<FormListing, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if user.role.permissions().can_manage_forms {
            Ok(FormListing::Managed(self.repo.list_all(executor).await?))
        } else {
            Ok(FormListing::Assigned(self.repo.list_for_client(executor, user.id).await?))
        }
    }

    pub async fn get<'e, E>(&self, executor: E, id: Uuid) -> Result<FormTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        found(self.repo.find_by_id(executor, id).await?, "Formulário")
    }

    pub async fn create<'e, E>(&self, executor: E, payload: CreateFormPayload) -> Result<FormTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = Self::normalize(payload.fields)?;
        let form = self
            .repo
            .create(
                executor,
                payload.name.trim(),
                payload.description.as_deref(),
                &document,
                payload.is_template,
            )
            .await?;

        tracing::info!(form_id = %form.id, fields = document.fields().count(), "Formulário criado");
        Ok(form)
    }

    pub async fn update<'e, E>(&self, executor: E, id: Uuid, payload: UpdateFormPayload) -> Result<FormTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = payload.fields.map(Self::normalize).transpose()?;
        let form = self
            .repo
            .update(
                executor,
                id,
                payload.name.as_deref().map(str::trim),
                payload.description.as_deref(),
                document.as_ref(),
                payload.is_template,
            )
            .await?;
        found(form, "Formulário")
    }

    /// Formulário ainda vinculado a serviço ou modelo não sai (409).
    /// Sem vínculos, as respostas antigas vão junto.
    pub async fn delete(&self, pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;

        found(self.repo.lock_by_id(&mut *tx, id).await?, "Formulário")?;

        let references = self.repo.count_references(&mut *tx, id).await?;
        if references > 0 {
            return Err(AppError::Conflict(format!(
                "O formulário está vinculado a {references} serviço(s) ou modelo(s) e não pode ser excluído."
            )));
        }

        self.repo.delete_with_submissions(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(form_id = %id, "Formulário excluído");
        Ok(())
    }

    // =========================================================================
    //  RESPOSTAS
    // =========================================================================

    /// Só aceita formulários atribuídos a algum serviço do próprio cliente,
    /// e as respostas precisam bater com o documento.
    pub async fn submit<'e, E>(
        &self,
        executor: E,
        user: &User,
        payload: &CreateSubmissionPayload,
    ) -> Result<FormSubmission, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let form = found(self.repo.find_by_id(executor, payload.form_id).await?, "Formulário")?;
        if !self.repo.is_assigned_to_client(executor, form.id, user.id).await? {
            return Err(AppError::NotFound("Formulário"));
        }

        form.fields.validate_answers(&payload.data).map_err(AppError::FormValidation)?;

        let submission = self.repo.insert_submission(executor, form.id, user.id, &payload.data).await?;
        tracing::info!(form_id = %form.id, user_id = %user.id, "Resposta de formulário recebida");
        Ok(submission)
    }

    pub async fn list_submissions<'e, E>(
        &self,
        executor: E,
        user: &User,
        query: &SubmissionListQuery,
    ) -> Result<Vec<SubmissionEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let scope = (!user.role.permissions().can_manage_forms).then_some(user.id);
        self.repo.list_submissions(executor, scope, query.form_id).await
    }
}
