// src/models/service.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

// --- ENUMS ---

// Mapeia o CREATE TYPE service_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "service_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

// Mapeia o CREATE TYPE task_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

// --- SERVIÇO (o dado) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    #[schema(example = "Gestão de Redes Sociais - Padaria da Maria")]
    pub name: String,
    pub description: Option<String>,
    pub template_id: Uuid,
    pub client_id: Uuid,
    pub status: ServiceStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTask {
    pub id: Uuid,
    pub service_id: Uuid,
    pub source_task_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMilestone {
    pub id: Uuid,
    pub service_id: Uuid,
    pub source_milestone_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub achieved: bool,
    pub achieved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- PROJEÇÕES ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientBrief {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateBrief {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

// Formulário vinculado ao serviço, com o nome do formulário
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignedFormEntry {
    pub id: Uuid,
    pub form_id: Uuid,
    pub form_name: String,
    pub required: bool,
    // O chamador já enviou alguma resposta para este formulário?
    pub submitted: bool,
}

/// Projeção completa: serviço + cliente + modelo + tarefas + marcos + formulários.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetail {
    #[serde(flatten)]
    pub service: Service,
    pub client: ClientBrief,
    pub template: TemplateBrief,
    pub tasks: Vec<ServiceTask>,
    pub milestones: Vec<ServiceMilestone>,
    pub assigned_forms: Vec<AssignedFormEntry>,
}

// Linha da listagem (GET /api/services)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ServiceStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub client_id: Uuid,
    pub client_email: String,
    pub client_name: Option<String>,
    pub template_id: Uuid,
    pub template_name: String,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub total_milestones: i64,
    pub achieved_milestones: i64,
    pub created_at: DateTime<Utc>,
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateServicePayload {
    pub template_id: Uuid,
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServicePayload {
    pub status: Option<ServiceStatus>,
    // Ausente = mantém; null = limpa
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub end_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusChange {
    pub id: Uuid,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneChange {
    pub id: Uuid,
    pub achieved: bool,
    pub achieved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdatePayload {
    #[serde(default)]
    pub tasks: Vec<TaskStatusChange>,
    #[serde(default)]
    pub milestones: Vec<MilestoneChange>,
}

// Corpo dos PATCH de linha única (o id vem do path)
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatchPayload {
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MilestonePatchPayload {
    pub achieved: bool,
    pub achieved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResult {
    pub updated_tasks: Vec<ServiceTask>,
    pub updated_milestones: Vec<ServiceMilestone>,
    pub service: ServiceDetail,
}

// --- REGRAS DE CARIMBO DE DATA ---

/// COMPLETED sempre tem data (a enviada ou agora); qualquer outro status limpa.
pub fn completion_timestamp(
    status: TaskStatus,
    provided: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match status {
        TaskStatus::Completed => Some(provided.unwrap_or(now)),
        TaskStatus::Pending | TaskStatus::InProgress => None,
    }
}

/// Mesma regra para marcos: atingido tem data, não atingido limpa.
pub fn achievement_timestamp(
    achieved: bool,
    provided: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    achieved.then(|| provided.unwrap_or(now))
}

// Distingue campo ausente de `null` explícito
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn completed_uses_provided_timestamp_or_now() {
        let now = Utc::now();
        let earlier = now - Duration::hours(3);

        assert_eq!(completion_timestamp(TaskStatus::Completed, None, now), Some(now));
        assert_eq!(completion_timestamp(TaskStatus::Completed, Some(earlier), now), Some(earlier));
    }

    #[test]
    fn other_statuses_clear_timestamp() {
        let now = Utc::now();
        assert_eq!(completion_timestamp(TaskStatus::Pending, Some(now), now), None);
        assert_eq!(completion_timestamp(TaskStatus::InProgress, None, now), None);
    }

    #[test]
    fn toggling_back_to_completed_gets_a_fresh_timestamp() {
        let first = Utc::now();
        let stamped = completion_timestamp(TaskStatus::Completed, None, first);
        let cleared = completion_timestamp(TaskStatus::Pending, None, first + Duration::seconds(1));
        let again = completion_timestamp(TaskStatus::Completed, None, first + Duration::seconds(2));

        assert_eq!(stamped, Some(first));
        assert_eq!(cleared, None);
        assert_eq!(again, Some(first + Duration::seconds(2)));
        assert_ne!(again, stamped);
    }

    #[test]
    fn milestones_follow_the_same_rule() {
        let now = Utc::now();
        assert_eq!(achievement_timestamp(true, None, now), Some(now));
        assert_eq!(achievement_timestamp(false, Some(now), now), None);
    }

    #[test]
    fn end_date_distinguishes_missing_from_null() {
        let missing: UpdateServicePayload = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.end_date, None);

        let cleared: UpdateServicePayload = serde_json::from_str(r#"{"endDate": null}"#).unwrap();
        assert_eq!(cleared.end_date, Some(None));
    }

    #[test]
    fn unknown_task_status_is_rejected() {
        let parsed = serde_json::from_str::<TaskPatchPayload>(r#"{"status": "DONE"}"#);
        assert!(parsed.is_err());
    }
}
