// src/db/client_repo.rs

use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::client::{ClientProfileRow, ProfileFields, SocialMediaInput, SocialMediaProfile},
};

#[derive(Clone, Default)]
pub struct ClientRepository;

impl ClientRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_profile_by_user<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<ClientProfileRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, ClientProfileRow>(
            "SELECT * FROM client_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(profile)
    }

    pub async fn list_social_profiles<'e, E>(
        &self,
        executor: E,
        profile_id: Uuid,
    ) -> Result<Vec<SocialMediaProfile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let links = sqlx::query_as::<_, SocialMediaProfile>(
            "SELECT id, profile_id, platform, url FROM social_media_profiles WHERE profile_id = $1 ORDER BY platform",
        )
        .bind(profile_id)
        .fetch_all(executor)
        .await?;
        Ok(links)
    }

    /// Cria o perfil ou atualiza os campos enviados (ausentes mantêm o valor atual).
    pub async fn upsert_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        fields: &ProfileFields,
    ) -> Result<ClientProfileRow, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, ClientProfileRow>(
            r#"
            INSERT INTO client_profiles (
                user_id, business_name, phone_number, work_hours, logo_url, custom_font,
                brand_color1, brand_color2, brand_color3, brand_color4
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE SET
                business_name = COALESCE(EXCLUDED.business_name, client_profiles.business_name),
                phone_number  = COALESCE(EXCLUDED.phone_number, client_profiles.phone_number),
                work_hours    = COALESCE(EXCLUDED.work_hours, client_profiles.work_hours),
                logo_url      = COALESCE(EXCLUDED.logo_url, client_profiles.logo_url),
                custom_font   = COALESCE(EXCLUDED.custom_font, client_profiles.custom_font),
                brand_color1  = COALESCE(EXCLUDED.brand_color1, client_profiles.brand_color1),
                brand_color2  = COALESCE(EXCLUDED.brand_color2, client_profiles.brand_color2),
                brand_color3  = COALESCE(EXCLUDED.brand_color3, client_profiles.brand_color3),
                brand_color4  = COALESCE(EXCLUDED.brand_color4, client_profiles.brand_color4),
                updated_at    = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&fields.business_name)
        .bind(&fields.phone_number)
        .bind(&fields.work_hours)
        .bind(&fields.logo_url)
        .bind(&fields.custom_font)
        .bind(&fields.brand_color1)
        .bind(&fields.brand_color2)
        .bind(&fields.brand_color3)
        .bind(&fields.brand_color4)
        .fetch_one(executor)
        .await?;
        Ok(profile)
    }

    /// Substitui todas as redes sociais do perfil. Roda na transação do chamador.
    pub async fn replace_social_profiles(
        &self,
        conn: &mut PgConnection,
        profile_id: Uuid,
        links: &[SocialMediaInput],
    ) -> Result<Vec<SocialMediaProfile>, AppError> {
        sqlx::query("DELETE FROM social_media_profiles WHERE profile_id = $1")
            .bind(profile_id)
            .execute(&mut *conn)
            .await?;

        let platforms: Vec<&str> = links.iter().map(|l| l.platform.as_str()).collect();
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();

        let inserted = sqlx::query_as::<_, SocialMediaProfile>(
            r#"
            INSERT INTO social_media_profiles (profile_id, platform, url)
            SELECT $1, platform, url
            FROM UNNEST($2::text[], $3::text[]) AS t(platform, url)
            RETURNING id, profile_id, platform, url
            "#,
        )
        .bind(profile_id)
        .bind(&platforms)
        .bind(&urls)
        .fetch_all(&mut *conn)
        .await?;

        Ok(inserted)
    }
}
