// src/services/assignment_service.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::found, error::AppError},
    db::{template_repo::StepKind, ServiceRepository, TemplateRepository, UserRepository},
    models::{
        auth::User,
        rbac::{Role, RolePermissions},
        service::{
            achievement_timestamp, completion_timestamp, BatchUpdatePayload, BatchUpdateResult,
            CreateServicePayload, MilestoneChange, MilestonePatchPayload, Service, ServiceDetail,
            ServiceMilestone, ServiceStatus, ServiceSummary, ServiceTask, TaskPatchPayload,
            TaskStatusChange, UpdateServicePayload,
        },
        template::{ServiceTemplate, TemplateStep},
    },
};

// =========================================================================
//  PLANO DE INSTANCIAÇÃO (puro)
// =========================================================================

/// Tudo o que será gravado ao instanciar um modelo para um cliente.
#[derive(Debug, Clone)]
pub struct InstantiationPlan {
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub tasks: Vec<TemplateStep>,
    pub milestones: Vec<TemplateStep>,
    pub form_ids: Vec<Uuid>,
}

impl InstantiationPlan {
    pub fn new(
        template: &ServiceTemplate,
        payload: &CreateServicePayload,
        tasks: Vec<TemplateStep>,
        milestones: Vec<TemplateStep>,
        form_ids: Vec<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if !template.is_active {
            return Err(AppError::Conflict(
                "Modelo de serviço inativo não pode ser atribuído.".to_string(),
            ));
        }

        let start_date = payload.start_date.unwrap_or(now);
        if let Some(end_date) = payload.end_date {
            if end_date < start_date {
                return Err(AppError::InvalidPayload(
                    "A data de término não pode ser anterior à de início.".to_string(),
                ));
            }
        }

        let name = payload
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&template.name)
            .to_string();

        Ok(Self {
            name,
            description: payload.description.clone().or_else(|| template.description.clone()),
            start_date,
            end_date: payload.end_date,
            tasks,
            milestones,
            form_ids,
        })
    }
}

// =========================================================================
//  QUEM PODE MEXER EM QUÊ
// =========================================================================

/// Tarefas: dono do serviço ou quem atribui serviços. Marcos: só quem atribui.
/// Um cliente só mexe em tarefas de serviço ATIVO.
pub fn authorize_changes(
    role: Role,
    is_owner: bool,
    service_status: ServiceStatus,
    touches_tasks: bool,
    touches_milestones: bool,
) -> Result<(), AppError> {
    let permissions: RolePermissions = role.permissions();
    let staff = permissions.can_assign_services;

    if !staff && !is_owner {
        return Err(AppError::Forbidden("Você não tem acesso a este serviço.".to_string()));
    }
    if touches_milestones && !staff {
        return Err(AppError::Forbidden(
            "Apenas a equipe pode atualizar marcos.".to_string(),
        ));
    }
    if touches_tasks && !staff && service_status != ServiceStatus::Active {
        return Err(AppError::Conflict(
            "As tarefas só podem ser atualizadas enquanto o serviço estiver ativo.".to_string(),
        ));
    }
    Ok(())
}

// =========================================================================
//  O SERVIÇO
// =========================================================================

#[derive(Clone)]
pub struct AssignmentService {
    service_repo: ServiceRepository,
    template_repo: TemplateRepository,
    user_repo: UserRepository,
}

impl AssignmentService {
    pub fn new(
        service_repo: ServiceRepository,
        template_repo: TemplateRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self { service_repo, template_repo, user_repo }
    }

    /// Quem vê tudo recebe todos os serviços; o resto, só os seus.
    pub async fn list<'e, E>(&self, executor: E, user: &User) -> Result<Vec<ServiceSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let scope = (!user.role.permissions().can_view_all_services).then_some(user.id);
        self.service_repo.list(executor, scope).await
    }

    pub async fn detail<'e, E>(&self, executor: E, user: &User, id: Uuid) -> Result<ServiceDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let service = found(self.service_repo.find_by_id(executor, id).await?, "Serviço")?;
        if service.client_id != user.id && !user.role.permissions().can_view_all_services {
            return Err(AppError::Forbidden("Você não tem acesso a este serviço.".to_string()));
        }
        self.load_detail(executor, service).await
    }

    async fn load_detail<'e, E>(&self, executor: E, service: Service) -> Result<ServiceDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let client = self.service_repo.client_brief(executor, service.client_id).await?;
        let template = self.service_repo.template_brief(executor, service.template_id).await?;
        let tasks = self.service_repo.list_tasks(executor, service.id).await?;
        let milestones = self.service_repo.list_milestones(executor, service.id).await?;
        let assigned_forms = self.service_repo.list_assigned_forms(executor, service.id).await?;

        Ok(ServiceDetail { service, client, template, tasks, milestones, assigned_forms })
    }

    // =========================================================================
    //  INSTANCIAÇÃO
    // =========================================================================

    /// Cria o serviço do cliente copiando tarefas, marcos e formulários obrigatórios do modelo.
    /// Tudo numa transação: ou o serviço nasce completo, ou nada é gravado.
    pub async fn instantiate(
        &self,
        pool: &PgPool,
        actor: &User,
        payload: &CreateServicePayload,
    ) -> Result<ServiceDetail, AppError> {
        found(self.template_repo.find_by_id(pool, payload.template_id).await?, "Modelo de serviço")?;

        let client = self
            .user_repo
            .find_by_id(pool, payload.client_id)
            .await?
            .filter(|u| u.role == Role::Client);
        let client = found(client, "Cliente")?;

        let mut tx = pool.begin().await?;

        // Relido sob trava: a exclusão do modelo espera esta transação terminar
        let template = found(
            self.template_repo.lock_by_id(&mut *tx, payload.template_id).await?,
            "Modelo de serviço",
        )?;
        let tasks = self.template_repo.list_steps(&mut *tx, StepKind::Task, template.id).await?;
        let milestones = self
            .template_repo
            .list_steps(&mut *tx, StepKind::Milestone, template.id)
            .await?;
        let form_ids = self
            .template_repo
            .list_required_forms(&mut *tx, template.id)
            .await?
            .into_iter()
            .map(|f| f.id)
            .collect();

        let plan = InstantiationPlan::new(&template, payload, tasks, milestones, form_ids, Utc::now())?;

        let service = self
            .service_repo
            .insert_service(
                &mut *tx,
                template.id,
                client.id,
                &plan.name,
                plan.description.as_deref(),
                plan.start_date,
                plan.end_date,
            )
            .await?;

        let copied_tasks = self.service_repo.copy_tasks(&mut *tx, service.id, &plan.tasks).await?;
        let copied_milestones = self
            .service_repo
            .copy_milestones(&mut *tx, service.id, &plan.milestones)
            .await?;
        let assigned_forms = self.service_repo.assign_forms(&mut *tx, service.id, &plan.form_ids).await?;

        if copied_tasks as usize != plan.tasks.len()
            || copied_milestones as usize != plan.milestones.len()
            || assigned_forms as usize != plan.form_ids.len()
        {
            // `tx` é descartado sem commit: rollback
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "cópia incompleta do modelo {}: {copied_tasks}/{} tarefas, {copied_milestones}/{} marcos, {assigned_forms}/{} formulários",
                template.id,
                plan.tasks.len(),
                plan.milestones.len(),
                plan.form_ids.len()
            )));
        }

        tx.commit().await?;

        tracing::info!(
            service_id = %service.id,
            template_id = %template.id,
            client_id = %client.id,
            actor = %actor.id,
            tasks = copied_tasks,
            milestones = copied_milestones,
            forms = assigned_forms,
            "Serviço atribuído ao cliente"
        );

        self.load_detail(pool, service).await
    }

    // =========================================================================
    //  ATUALIZAÇÕES
    // =========================================================================

    pub async fn update<'e, E>(&self, executor: E, id: Uuid, payload: &UpdateServicePayload) -> Result<Service, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service = self
            .service_repo
            .update_service(executor, id, payload.status, payload.end_date)
            .await?;
        found(service, "Serviço")
    }

    /// Remove o serviço com tarefas, marcos, formulários atribuídos e solicitações.
    pub async fn delete(&self, pool: &PgPool, actor: &User, id: Uuid) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;
        if !self.service_repo.delete_cascade(&mut tx, id).await? {
            return Err(AppError::NotFound("Serviço"));
        }
        tx.commit().await?;

        tracing::info!(service_id = %id, actor = %actor.id, "Serviço excluído");
        Ok(())
    }

    /// Atualiza várias tarefas/marcos numa transação. Uma linha de outro serviço
    /// aborta tudo com 404.
    pub async fn batch_update(
        &self,
        pool: &PgPool,
        user: &User,
        service_id: Uuid,
        payload: &BatchUpdatePayload,
    ) -> Result<BatchUpdateResult, AppError> {
        let service = self.authorized_service(pool, user, service_id, &payload.tasks, &payload.milestones).await?;

        let mut tx = pool.begin().await?;
        let (updated_tasks, updated_milestones) = self
            .apply_changes(&mut tx, service.id, &payload.tasks, &payload.milestones)
            .await?;
        tx.commit().await?;

        tracing::info!(
            service_id = %service.id,
            actor = %user.id,
            tasks = updated_tasks.len(),
            milestones = updated_milestones.len(),
            "Atualização em lote aplicada"
        );

        let service = self.load_detail(pool, service).await?;
        Ok(BatchUpdateResult { updated_tasks, updated_milestones, service })
    }

    pub async fn patch_task(
        &self,
        pool: &PgPool,
        user: &User,
        service_id: Uuid,
        task_id: Uuid,
        payload: &TaskPatchPayload,
    ) -> Result<ServiceTask, AppError> {
        let changes = [TaskStatusChange {
            id: task_id,
            status: payload.status,
            completed_at: payload.completed_at,
        }];
        let service = self.authorized_service(pool, user, service_id, &changes, &[]).await?;

        let mut tx = pool.begin().await?;
        let (mut tasks, _) = self.apply_changes(&mut tx, service.id, &changes, &[]).await?;
        tx.commit().await?;

        tasks.pop().ok_or(AppError::NotFound("Tarefa"))
    }

    pub async fn patch_milestone(
        &self,
        pool: &PgPool,
        user: &User,
        service_id: Uuid,
        milestone_id: Uuid,
        payload: &MilestonePatchPayload,
    ) -> Result<ServiceMilestone, AppError> {
        let changes = [MilestoneChange {
            id: milestone_id,
            achieved: payload.achieved,
            achieved_at: payload.achieved_at,
        }];
        let service = self.authorized_service(pool, user, service_id, &[], &changes).await?;

        let mut tx = pool.begin().await?;
        let (_, mut milestones) = self.apply_changes(&mut tx, service.id, &[], &changes).await?;
        tx.commit().await?;

        milestones.pop().ok_or(AppError::NotFound("Marco"))
    }

    /// Carrega o serviço e decide a permissão antes de qualquer escrita.
    async fn authorized_service(
        &self,
        pool: &PgPool,
        user: &User,
        service_id: Uuid,
        tasks: &[TaskStatusChange],
        milestones: &[MilestoneChange],
    ) -> Result<Service, AppError> {
        let service = found(self.service_repo.find_by_id(pool, service_id).await?, "Serviço")?;
        authorize_changes(
            user.role,
            service.client_id == user.id,
            service.status,
            !tasks.is_empty(),
            !milestones.is_empty(),
        )?;
        Ok(service)
    }

    async fn apply_changes(
        &self,
        conn: &mut PgConnection,
        service_id: Uuid,
        tasks: &[TaskStatusChange],
        milestones: &[MilestoneChange],
    ) -> Result<(Vec<ServiceTask>, Vec<ServiceMilestone>), AppError> {
        let now = Utc::now();

        let mut updated_tasks = Vec::with_capacity(tasks.len());
        for change in tasks {
            let completed_at = completion_timestamp(change.status, change.completed_at, now);
            let task = self
                .service_repo
                .update_task(&mut *conn, service_id, change.id, change.status, completed_at)
                .await?;
            updated_tasks.push(found(task, "Tarefa")?);
        }

        let mut updated_milestones = Vec::with_capacity(milestones.len());
        for change in milestones {
            let achieved_at = achievement_timestamp(change.achieved, change.achieved_at, now);
            let milestone = self
                .service_repo
                .update_milestone(&mut *conn, service_id, change.id, change.achieved, achieved_at)
                .await?;
            updated_milestones.push(found(milestone, "Marco")?);
        }

        Ok((updated_tasks, updated_milestones))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn template(active: bool) -> ServiceTemplate {
        ServiceTemplate {
            id: Uuid::new_v4(),
            name: "Gestão de Redes Sociais".into(),
            description: Some("Pacote mensal".into()),
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn steps(template_id: Uuid, n: usize) -> Vec<TemplateStep> {
        (0..n)
            .map(|i| TemplateStep {
                id: Uuid::new_v4(),
                template_id,
                title: format!("Passo {i}"),
                description: None,
                position: i as i32,
            })
            .collect()
    }

    fn payload(template_id: Uuid) -> CreateServicePayload {
        CreateServicePayload {
            template_id,
            client_id: Uuid::new_v4(),
            name: None,
            description: None,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn plan_copies_every_step_and_form() {
        let t = template(true);
        let forms = vec![Uuid::new_v4(), Uuid::new_v4()];
        let plan = InstantiationPlan::new(&t, &payload(t.id), steps(t.id, 3), steps(t.id, 2), forms.clone(), Utc::now())
            .unwrap();

        assert_eq!(plan.tasks.len(), 3);
        assert_eq!(plan.milestones.len(), 2);
        assert_eq!(plan.form_ids, forms);
    }

    #[test]
    fn plan_defaults_name_description_and_start_date() {
        let t = template(true);
        let now = Utc::now();
        let mut p = payload(t.id);
        p.name = Some("   ".into());

        let plan = InstantiationPlan::new(&t, &p, vec![], vec![], vec![], now).unwrap();
        assert_eq!(plan.name, t.name);
        assert_eq!(plan.description, t.description);
        assert_eq!(plan.start_date, now);
        assert_eq!(plan.end_date, None);
    }

    #[test]
    fn plan_keeps_explicit_values() {
        let t = template(true);
        let start = Utc::now() - Duration::days(2);
        let mut p = payload(t.id);
        p.name = Some("Redes - Padaria da Maria".into());
        p.description = Some("Contrato anual".into());
        p.start_date = Some(start);
        p.end_date = Some(start + Duration::days(365));

        let plan = InstantiationPlan::new(&t, &p, vec![], vec![], vec![], Utc::now()).unwrap();
        assert_eq!(plan.name, "Redes - Padaria da Maria");
        assert_eq!(plan.description.as_deref(), Some("Contrato anual"));
        assert_eq!(plan.start_date, start);
    }

    #[test]
    fn inactive_template_is_a_conflict() {
        let t = template(false);
        let result = InstantiationPlan::new(&t, &payload(t.id), vec![], vec![], vec![], Utc::now());
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let t = template(true);
        let now = Utc::now();
        let mut p = payload(t.id);
        p.end_date = Some(now - Duration::days(1));

        let result = InstantiationPlan::new(&t, &p, vec![], vec![], vec![], now);
        assert!(matches!(result, Err(AppError::InvalidPayload(_))));
    }

    #[test]
    fn owner_may_update_tasks_but_not_milestones() {
        assert!(authorize_changes(Role::Client, true, ServiceStatus::Active, true, false).is_ok());
        assert!(matches!(
            authorize_changes(Role::Client, true, ServiceStatus::Active, false, true),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn other_clients_are_forbidden_even_with_empty_changes() {
        assert!(matches!(
            authorize_changes(Role::Client, false, ServiceStatus::Active, false, false),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn staff_may_update_anything_in_any_status() {
        for role in [Role::Admin, Role::Manager] {
            for status in [ServiceStatus::Active, ServiceStatus::Paused, ServiceStatus::Completed] {
                assert!(authorize_changes(role, false, status, true, true).is_ok());
            }
        }
    }

    #[test]
    fn owner_cannot_touch_tasks_of_inactive_service() {
        for status in [ServiceStatus::Paused, ServiceStatus::Completed, ServiceStatus::Cancelled] {
            assert!(matches!(
                authorize_changes(Role::Client, true, status, true, false),
                Err(AppError::Conflict(_))
            ));
        }
    }
}
