// src/models/client.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

// --- PERFIL (linha do banco) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: Option<String>,
    pub phone_number: Option<String>,
    pub work_hours: Option<String>,
    pub logo_url: Option<String>,
    pub custom_font: Option<String>,
    pub brand_color1: Option<String>,
    pub brand_color2: Option<String>,
    pub brand_color3: Option<String>,
    pub brand_color4: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaProfile {
    pub id: Uuid,
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub profile_id: Uuid,
    #[schema(example = "instagram")]
    pub platform: String,
    #[schema(example = "https://instagram.com/minhaempresa")]
    pub url: String,
}

// Perfil completo (linha + redes sociais)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    #[serde(flatten)]
    pub profile: ClientProfileRow,
    pub social_media_profiles: Vec<SocialMediaProfile>,
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaInput {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "instagram")]
    pub platform: String,

    #[validate(url(message = "invalid_url"))]
    #[schema(example = "https://instagram.com/minhaempresa")]
    pub url: String,
}

/// Campos editáveis do perfil (PUT /api/client/profile e criação manual de cliente).
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    #[schema(example = "Padaria da Maria")]
    pub business_name: Option<String>,
    #[schema(example = "+55 11 99999-0000")]
    pub phone_number: Option<String>,
    #[schema(example = "Seg-Sex 08:00-18:00")]
    pub work_hours: Option<String>,
    #[validate(url(message = "invalid_url"))]
    pub logo_url: Option<String>,
    pub custom_font: Option<String>,
    #[schema(example = "#FF5733")]
    pub brand_color1: Option<String>,
    pub brand_color2: Option<String>,
    pub brand_color3: Option<String>,
    pub brand_color4: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfilePayload {
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: ProfileFields,

    // Ausente = mantém as redes atuais; presente = substitui todas.
    #[validate(nested)]
    pub social_media_profiles: Option<Vec<SocialMediaInput>>,
}

// --- ADMIN: convite / criação manual de cliente ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    Invite,
    Create,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientActionPayload {
    pub action: Option<ClientAction>,

    #[validate(email(message = "invalid_email"))]
    #[schema(example = "client-test@example.com")]
    pub email: Option<String>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,

    #[serde(flatten)]
    #[validate(nested)]
    pub profile: ProfileFields,

    #[serde(default)]
    #[validate(nested)]
    pub social_media_profiles: Vec<SocialMediaInput>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientActionResponse {
    #[schema(example = "Client action completed successfully")]
    pub message: String,
    // Preenchido apenas na criação manual
    pub user_id: Option<Uuid>,
}
