// src/models/dashboard.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::models::rbac::Role;

pub const RECENT_ACTIVITY_LIMIT: usize = 5;

// 1. Cards do topo (contagens por papel)
#[derive(Debug, Default, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub total_services: i64,
    pub active_services: i64,
    pub open_requests: i64,
    pub urgent_requests: i64,
    // Para clientes: formulários obrigatórios ainda sem resposta
    pub pending_forms: i64,
    pub achieved_milestones: i64,
    pub total_milestones: i64,
    // Só faz sentido para a equipe
    pub total_clients: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    User,
    Service,
    Form,
    Request,
}

// 2. Feed de atividade recente
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[schema(example = "Novo serviço: Gestão de Redes Sociais")]
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub role: Role,
    pub counts: DashboardCounts,
    pub recent_activity: Vec<ActivityEntry>,
}

// 3. Estatísticas do painel administrativo
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleCount {
    pub role: Role,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    #[schema(example = "healthy")]
    pub database: String,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub new_users_this_month: i64,
    pub users_by_role: Vec<RoleCount>,
    pub system_health: SystemHealth,
    pub recent_activity: Vec<ActivityEntry>,
}

/// Junta os feeds de várias tabelas, do mais novo para o mais velho, e fica com os primeiros.
pub fn merge_recent_activity<I>(feeds: I, limit: usize) -> Vec<ActivityEntry>
where
    I: IntoIterator<Item = Vec<ActivityEntry>>,
{
    let mut merged: Vec<ActivityEntry> = feeds.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged.truncate(limit);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(kind: ActivityKind, minutes_ago: i64) -> ActivityEntry {
        ActivityEntry {
            id: Uuid::new_v4(),
            kind,
            title: format!("{kind:?} {minutes_ago}"),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn merges_newest_first_and_truncates() {
        let users = vec![entry(ActivityKind::User, 10), entry(ActivityKind::User, 50)];
        let services = vec![entry(ActivityKind::Service, 5), entry(ActivityKind::Service, 40)];
        let forms = vec![entry(ActivityKind::Form, 1), entry(ActivityKind::Form, 30)];

        let merged = merge_recent_activity([users, services, forms], RECENT_ACTIVITY_LIMIT);

        assert_eq!(merged.len(), 5);
        let kinds: Vec<_> = merged.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::Form,
                ActivityKind::Service,
                ActivityKind::User,
                ActivityKind::Form,
                ActivityKind::Service,
            ]
        );
        assert!(merged.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn activity_serializes_kind_as_type() {
        let value = serde_json::to_value(entry(ActivityKind::Request, 0)).unwrap();
        assert_eq!(value["type"], "request");
    }
}
