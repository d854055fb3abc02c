// src/services/request_service.rs

use chrono::Utc;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::found, error::AppError},
    db::{RequestRepository, ServiceRepository},
    models::{
        auth::User,
        request::{
            resolution_timestamp, CreateRequestPayload, RequestStatus, ServiceRequest, ServiceRequestEntry,
        },
    },
};

#[derive(Clone)]
pub struct RequestService {
    repo: RequestRepository,
    service_repo: ServiceRepository,
}

impl RequestService {
    pub fn new(repo: RequestRepository, service_repo: ServiceRepository) -> Self {
        Self { repo, service_repo }
    }

    /// Equipe vê todas as solicitações; cliente vê as próprias.
    pub async fn list<'e, E>(&self, executor: E, user: &User) -> Result<Vec<ServiceRequestEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permissions = user.role.permissions();
        let staff = permissions.can_assign_services || permissions.can_manage_services;
        self.repo.list(executor, (!staff).then_some(user.id)).await
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        user: &User,
        payload: &CreateRequestPayload,
    ) -> Result<ServiceRequest, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        if let Some(service_id) = payload.service_id {
            let service = found(self.service_repo.find_by_id(executor, service_id).await?, "Serviço")?;
            if service.client_id != user.id {
                return Err(AppError::Forbidden(
                    "A solicitação só pode ser vinculada a um serviço seu.".to_string(),
                ));
            }
        }

        let request = self
            .repo
            .create(
                executor,
                user.id,
                payload.service_id,
                payload.title.trim(),
                payload.description.trim(),
                payload.priority,
            )
            .await?;

        tracing::info!(request_id = %request.id, client_id = %user.id, priority = ?request.priority, "Solicitação aberta");
        Ok(request)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        actor: &User,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<ServiceRequest, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let current = found(self.repo.find_by_id(executor, id).await?, "Solicitação")?;
        let resolved_at = resolution_timestamp(status, current.resolved_at, Utc::now());

        let updated = found(
            self.repo.update_status(executor, id, status, resolved_at).await?,
            "Solicitação",
        )?;

        tracing::info!(request_id = %id, from = ?current.status, to = ?status, actor = %actor.id, "Status da solicitação alterado");
        Ok(updated)
    }
}
