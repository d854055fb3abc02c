// src/models/template.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::form::FormTemplateSummary;

// --- O MOLDE ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTemplate {
    pub id: Uuid,
    #[schema(example = "Gestão de Redes Sociais")]
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Tarefa e marco do modelo têm o mesmo formato
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStep {
    pub id: Uuid,
    pub template_id: Uuid,
    #[schema(example = "Reunião de kickoff")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = 0)]
    pub position: i32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCounts {
    pub services: i64,
    pub tasks: i64,
    pub milestones: i64,
}

// Linha da listagem: modelo + contagens
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListEntry {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub template: ServiceTemplate,
    #[serde(rename = "_count")]
    #[sqlx(flatten)]
    pub count: TemplateCounts,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetail {
    #[serde(flatten)]
    pub template: ServiceTemplate,
    pub tasks: Vec<TemplateStep>,
    pub milestones: Vec<TemplateStep>,
    pub required_forms: Vec<FormTemplateSummary>,
    #[serde(rename = "_count")]
    pub count: TemplateCounts,
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Reunião de kickoff")]
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplatePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Gestão de Redes Sociais")]
    pub name: String,
    pub description: Option<String>,

    // A ordem do array vira a posição
    #[serde(default)]
    #[validate(nested)]
    pub tasks: Vec<StepInput>,
    #[serde(default)]
    #[validate(nested)]
    pub milestones: Vec<StepInput>,
    #[serde(default)]
    pub required_form_ids: Vec<Uuid>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// PATCH: campos ausentes ficam como estão. `tasks`/`milestones`/`requiredFormIds`
/// presentes substituem a lista inteira.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplatePayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    #[validate(nested)]
    pub tasks: Option<Vec<StepInput>>,
    #[validate(nested)]
    pub milestones: Option<Vec<StepInput>>,
    pub required_form_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// Quebra uma lista ordenada de passos em colunas paralelas para o INSERT com UNNEST.
pub fn step_columns(steps: &[StepInput]) -> (Vec<String>, Vec<Option<String>>, Vec<i32>) {
    let titles = steps.iter().map(|s| s.title.clone()).collect();
    let descriptions = steps.iter().map(|s| s.description.clone()).collect();
    let positions = (0..steps.len() as i32).collect();
    (titles, descriptions, positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_columns_use_array_order_as_position() {
        let steps = vec![
            StepInput { title: "Kickoff".into(), description: None },
            StepInput { title: "Entrega".into(), description: Some("final".into()) },
        ];
        let (titles, descriptions, positions) = step_columns(&steps);
        assert_eq!(titles, vec!["Kickoff", "Entrega"]);
        assert_eq!(descriptions, vec![None, Some("final".to_string())]);
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn create_payload_defaults() {
        let payload: CreateTemplatePayload =
            serde_json::from_value(serde_json::json!({ "name": "SEO" })).unwrap();
        assert!(payload.is_active);
        assert!(payload.tasks.is_empty());
        assert!(payload.required_form_ids.is_empty());
    }
}
