// src/db/request_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::request::{RequestPriority, RequestStatus, ServiceRequest, ServiceRequestEntry},
};

#[derive(Clone, Default)]
pub struct RequestRepository;

impl RequestRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(&self, executor: E, client_id: Option<Uuid>) -> Result<Vec<ServiceRequestEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requests = sqlx::query_as::<_, ServiceRequestEntry>(
            r#"
            SELECT
                r.*,
                u.email AS client_email, u.name AS client_name,
                s.name AS service_name
            FROM service_requests r
            JOIN users u ON u.id = r.client_id
            LEFT JOIN services s ON s.id = r.service_id
            WHERE ($1::uuid IS NULL OR r.client_id = $1)
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(executor)
        .await?;
        Ok(requests)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<ServiceRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, ServiceRequest>("SELECT * FROM service_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(request)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        client_id: Uuid,
        service_id: Option<Uuid>,
        title: &str,
        description: &str,
        priority: RequestPriority,
    ) -> Result<ServiceRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, ServiceRequest>(
            r#"
            INSERT INTO service_requests (client_id, service_id, title, description, priority)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(service_id)
        .bind(title)
        .bind(description)
        .bind(priority)
        .fetch_one(executor)
        .await?;
        Ok(request)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: RequestStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<Option<ServiceRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, ServiceRequest>(
            r#"
            UPDATE service_requests
            SET status = $2, resolved_at = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(resolved_at)
        .fetch_optional(executor)
        .await?;
        Ok(request)
    }
}
