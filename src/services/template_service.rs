// src/services/template_service.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{found, remap_constraint_error},
        error::AppError,
    },
    db::{template_repo::StepKind, TemplateRepository},
    models::template::{
        CreateTemplatePayload, TemplateDetail, TemplateListEntry, UpdateTemplatePayload,
    },
};

const DUPLICATE_TEMPLATE: &str = "Já existe um modelo de serviço com esses dados.";

#[derive(Clone)]
pub struct TemplateService {
    repo: TemplateRepository,
}

impl TemplateService {
    pub fn new(repo: TemplateRepository) -> Self {
        Self { repo }
    }

    pub async fn list<'e, E>(&self, executor: E, active_only: bool) -> Result<Vec<TemplateListEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list(executor, active_only).await
    }

    pub async fn detail<'e, E>(&self, executor: E, id: Uuid) -> Result<TemplateDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let template = found(self.repo.find_by_id(executor, id).await?, "Modelo de serviço")?;
        let tasks = self.repo.list_steps(executor, StepKind::Task, id).await?;
        let milestones = self.repo.list_steps(executor, StepKind::Milestone, id).await?;
        let required_forms = self.repo.list_required_forms(executor, id).await?;
        let count = self.repo.counts(executor, id).await?;

        Ok(TemplateDetail { template, tasks, milestones, required_forms, count })
    }

    /// Modelo + tarefas + marcos (na ordem recebida) + formulários obrigatórios, tudo ou nada.
    pub async fn create(&self, pool: &PgPool, payload: &CreateTemplatePayload) -> Result<TemplateDetail, AppError> {
        let mut tx = pool.begin().await?;

        let template = self
            .repo
            .create(&mut *tx, payload.name.trim(), payload.description.as_deref(), payload.is_active)
            .await
            .map_err(|e| remap_constraint_error(e, DUPLICATE_TEMPLATE))?;

        self.repo.insert_steps(&mut *tx, StepKind::Task, template.id, &payload.tasks).await?;
        self.repo
            .insert_steps(&mut *tx, StepKind::Milestone, template.id, &payload.milestones)
            .await?;
        self.repo
            .link_required_forms(&mut *tx, template.id, &payload.required_form_ids)
            .await
            .map_err(|e| remap_constraint_error(e, DUPLICATE_TEMPLATE))?;

        tx.commit().await?;

        tracing::info!(template_id = %template.id, name = %template.name, "Modelo de serviço criado");
        self.detail(pool, template.id).await
    }

    /// Campos ausentes ficam como estão; listas enviadas substituem as atuais.
    /// Serviços já criados não são afetados (eles têm cópias próprias).
    pub async fn update(
        &self,
        pool: &PgPool,
        id: Uuid,
        payload: &UpdateTemplatePayload,
    ) -> Result<TemplateDetail, AppError> {
        let mut tx = pool.begin().await?;

        found(self.repo.lock_by_id(&mut *tx, id).await?, "Modelo de serviço")?;

        self.repo
            .update(
                &mut *tx,
                id,
                payload.name.as_deref().map(str::trim),
                payload.description.as_deref(),
                payload.is_active,
            )
            .await
            .map_err(|e| remap_constraint_error(e, DUPLICATE_TEMPLATE))?;

        if let Some(tasks) = &payload.tasks {
            self.repo.delete_steps(&mut *tx, StepKind::Task, id).await?;
            self.repo.insert_steps(&mut *tx, StepKind::Task, id, tasks).await?;
        }
        if let Some(milestones) = &payload.milestones {
            self.repo.delete_steps(&mut *tx, StepKind::Milestone, id).await?;
            self.repo.insert_steps(&mut *tx, StepKind::Milestone, id, milestones).await?;
        }
        if let Some(form_ids) = &payload.required_form_ids {
            self.repo.unlink_required_forms(&mut *tx, id).await?;
            self.repo
                .link_required_forms(&mut *tx, id, form_ids)
                .await
                .map_err(|e| remap_constraint_error(e, DUPLICATE_TEMPLATE))?;
        }

        tx.commit().await?;

        self.detail(pool, id).await
    }

    /// Recusa (409) enquanto houver serviços criados a partir do modelo.
    pub async fn delete(&self, pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;

        // Trava a linha: ninguém instancia o modelo entre a contagem e o DELETE
        found(self.repo.lock_by_id(&mut *tx, id).await?, "Modelo de serviço")?;

        let counts = self.repo.counts(&mut *tx, id).await?;
        if counts.services > 0 {
            return Err(AppError::Conflict(format!(
                "O modelo possui {} serviço(s) vinculado(s) e não pode ser excluído.",
                counts.services
            )));
        }

        self.repo.delete_steps(&mut *tx, StepKind::Task, id).await?;
        self.repo.delete_steps(&mut *tx, StepKind::Milestone, id).await?;
        self.repo.unlink_required_forms(&mut *tx, id).await?;
        self.repo.delete(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!(template_id = %id, "Modelo de serviço excluído");
        Ok(())
    }
}
