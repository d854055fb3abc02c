// src/services/dashboard_service.rs

use chrono::Utc;
use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::{
        auth::User,
        dashboard::{merge_recent_activity, AdminStats, DashboardData, SystemHealth, RECENT_ACTIVITY_LIMIT},
    },
};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    /// Contadores e atividade recente no escopo do papel: equipe vê tudo, cliente vê o seu.
    pub async fn get_dashboard<'e, E>(&self, executor: E, user: &User) -> Result<DashboardData, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let sees_everything = user.role.permissions().can_view_all_services;
        let scope = (!sees_everything).then_some(user.id);
        let limit = RECENT_ACTIVITY_LIMIT as i64;

        let counts = self.repo.counts(executor, scope).await?;

        let mut feeds = vec![
            self.repo.recent_services(executor, scope, limit).await?,
            self.repo.recent_submissions(executor, scope, limit).await?,
            self.repo.recent_requests(executor, scope, limit).await?,
        ];
        if sees_everything {
            feeds.push(self.repo.recent_users(executor, limit).await?);
        }

        Ok(DashboardData {
            role: user.role,
            counts,
            recent_activity: merge_recent_activity(feeds, RECENT_ACTIVITY_LIMIT),
        })
    }

    pub async fn get_admin_stats<'e, E>(&self, executor: E) -> Result<AdminStats, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let (total_users, new_users_this_month) = self.repo.user_totals(executor).await?;
        let users_by_role = self.repo.users_by_role(executor).await?;

        let database = match self.repo.ping(executor).await {
            Ok(()) => "healthy",
            Err(e) => {
                tracing::warn!("Banco de dados não respondeu ao ping: {:?}", e);
                "degraded"
            }
        };

        let limit = RECENT_ACTIVITY_LIMIT as i64;
        let feeds = [
            self.repo.recent_users(executor, limit).await?,
            self.repo.recent_services(executor, None, limit).await?,
            self.repo.recent_submissions(executor, None, limit).await?,
        ];

        Ok(AdminStats {
            total_users,
            new_users_this_month,
            users_by_role,
            system_health: SystemHealth { database: database.to_string(), checked_at: Utc::now() },
            recent_activity: merge_recent_activity(feeds, RECENT_ACTIVITY_LIMIT),
        })
    }
}
