// src/models/form.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::{Validate, ValidateEmail};

pub const FORM_SCHEMA_VERSION: u32 = 1;

// =========================================================================
//  DOCUMENTO DO FORMULÁRIO (coluna JSONB `fields`)
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormDocument {
    #[serde(default = "schema_version")]
    pub version: u32,
    pub sections: Vec<FormSection>,
}

fn schema_version() -> u32 {
    FORM_SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSection {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    #[schema(example = "field_1712345678")]
    pub id: String,
    #[schema(example = "Nome da empresa")]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    // O "type" fica no mesmo nível do objeto: { "type": "select", "options": [...] }
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Um variante por tipo de entrada. Só select/radio têm opções; só number tem limites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Email,
    Phone,
    Date,
    Select {
        options: Vec<String>,
    },
    Checkbox,
    Radio {
        options: Vec<String>,
    },
}

impl FieldKind {
    pub fn options(&self) -> Option<&[String]> {
        match self {
            FieldKind::Select { options } | FieldKind::Radio { options } => Some(options),
            _ => None,
        }
    }
}

impl FormDocument {
    pub fn fields(&self) -> impl Iterator<Item = &FormField> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Valida a estrutura no momento da escrita.
    /// Retorna um mapa "id do campo -> código do erro", como na validação de dados customizados.
    pub fn validate(&self) -> Result<(), HashMap<String, String>> {
        let mut errors: HashMap<String, String> = HashMap::new();

        if self.version != FORM_SCHEMA_VERSION {
            errors.insert("version".to_string(), "unsupported_version".to_string());
        }

        let mut seen = HashSet::new();
        for (index, field) in self.fields().enumerate() {
            let key = if field.id.trim().is_empty() {
                format!("fields[{index}]")
            } else {
                field.id.clone()
            };

            if field.id.trim().is_empty() {
                errors.insert(key, "missing_id".to_string());
                continue;
            }
            if !seen.insert(field.id.as_str()) {
                errors.entry(key).or_insert_with(|| "duplicate_id".to_string());
                continue;
            }
            if field.label.trim().is_empty() {
                errors.insert(key, "missing_label".to_string());
                continue;
            }

            match &field.kind {
                FieldKind::Select { options } | FieldKind::Radio { options } => {
                    if !options.iter().any(|o| !o.trim().is_empty()) {
                        errors.insert(key, "missing_options".to_string());
                    }
                }
                FieldKind::Number { min: Some(min), max: Some(max) } if min > max => {
                    errors.insert(key, "invalid_range".to_string());
                }
                _ => {}
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Confere um objeto de respostas contra os campos do documento.
    /// Campos desconhecidos são ignorados.
    pub fn validate_answers(&self, data: &Value) -> Result<(), HashMap<String, String>> {
        let mut errors: HashMap<String, String> = HashMap::new();

        let Some(obj) = data.as_object() else {
            errors.insert("data".to_string(), "invalid_object".to_string());
            return Err(errors);
        };

        for field in self.fields() {
            let value = obj.get(&field.id).filter(|v| !is_blank(v));

            let Some(value) = value else {
                if field.required {
                    errors.insert(field.id.clone(), "required".to_string());
                }
                continue;
            };

            if let Some(code) = answer_error(&field.kind, value) {
                errors.insert(field.id.clone(), code.to_string());
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn answer_error(kind: &FieldKind, value: &Value) -> Option<&'static str> {
    match kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Phone => {
            (!value.is_string()).then_some("invalid_text")
        }
        FieldKind::Email => match value.as_str() {
            Some(s) if ValidateEmail::validate_email(&s.to_string()) => None,
            _ => Some("invalid_email"),
        },
        FieldKind::Date => match value.as_str() {
            Some(s) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => None,
            _ => Some("invalid_date_format"),
        },
        FieldKind::Checkbox => (!value.is_boolean()).then_some("invalid_boolean"),
        FieldKind::Number { min, max } => {
            // Aceita número ou texto numérico (inputs HTML mandam string)
            let number = value
                .as_f64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
                .filter(|n| n.is_finite());
            match number {
                None => Some("invalid_number"),
                Some(n) if min.is_some_and(|m| n < m) => Some("below_min"),
                Some(n) if max.is_some_and(|m| n > m) => Some("above_max"),
                Some(_) => None,
            }
        }
        FieldKind::Select { options } | FieldKind::Radio { options } => match value.as_str() {
            Some(s) if options.iter().any(|o| o == s) => None,
            _ => Some("invalid_option"),
        },
    }
}

// =========================================================================
//  LINHAS DO BANCO
// =========================================================================

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    pub id: Uuid,
    #[schema(example = "Briefing inicial")]
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = FormDocument)]
    pub fields: sqlx::types::Json<FormDocument>,
    pub is_template: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Usado nas listagens de modelos de serviço
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplateSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

// GET /api/forms para quem gerencia formulários
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormListEntry {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_template: bool,
    pub assigned_count: i64,
    pub submission_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// GET /api/forms para clientes: formulários vinculados aos seus serviços
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientFormEntry {
    pub assignment_id: Uuid,
    pub form_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = FormDocument)]
    pub fields: sqlx::types::Json<FormDocument>,
    pub required: bool,
    pub service_id: Uuid,
    pub service_name: String,
    pub submitted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub user_id: Uuid,
    #[schema(value_type = Object)]
    pub data: Value,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEntry {
    pub id: Uuid,
    pub form_id: Uuid,
    pub form_name: String,
    pub user_id: Uuid,
    pub user_email: String,
    #[schema(value_type = Object)]
    pub data: Value,
    pub submitted_at: DateTime<Utc>,
}

/// GET /api/forms: quem gerencia vê todos com contadores; o cliente, só os atribuídos a ele.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum FormListing {
    Managed(Vec<FormListEntry>),
    Assigned(Vec<ClientFormEntry>),
}

// =========================================================================
//  PAYLOADS
// =========================================================================

/// O corpo aceita o documento completo ou só a lista de campos do editor,
/// que o servidor embrulha na seção única "main".
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum FormFieldsInput {
    Document(FormDocument),
    Fields(Vec<FormField>),
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,
    pub description: Option<String>,
    pub fields: FormFieldsInput,
    #[serde(default = "default_true")]
    pub is_template: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub fields: Option<FormFieldsInput>,
    pub is_template: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionPayload {
    pub form_id: Uuid,
    #[schema(value_type = Object)]
    pub data: Value,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionListQuery {
    pub form_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(fields: Value) -> FormDocument {
        serde_json::from_value(json!({
            "sections": [{ "id": "main", "title": "Form Fields", "fields": fields }]
        }))
        .unwrap()
    }

    #[test]
    fn parses_tagged_fields_and_defaults_version() {
        let doc = document(json!([
            { "id": "a", "type": "text", "label": "Nome", "required": true },
            { "id": "b", "type": "select", "label": "Plano", "options": ["Básico", "Pro"] },
            { "id": "c", "type": "number", "label": "Funcionários", "min": 1 }
        ]));

        assert_eq!(doc.version, FORM_SCHEMA_VERSION);
        let kinds: Vec<_> = doc.fields().map(|f| f.kind.clone()).collect();
        assert_eq!(kinds[0], FieldKind::Text);
        assert_eq!(kinds[1].options().map(<[String]>::len), Some(2));
        assert_eq!(kinds[2], FieldKind::Number { min: Some(1.0), max: None });
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn unknown_field_type_does_not_parse() {
        let parsed = serde_json::from_value::<FormField>(json!({
            "id": "a", "type": "signature", "label": "Assinatura"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn select_without_options_does_not_parse() {
        let parsed = serde_json::from_value::<FormField>(json!({
            "id": "a", "type": "radio", "label": "Escolha"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_structural_mistakes() {
        let doc = document(json!([
            { "id": "a", "type": "text", "label": "" },
            { "id": "b", "type": "select", "label": "Plano", "options": ["  "] },
            { "id": "b", "type": "text", "label": "Duplicado" },
            { "id": "c", "type": "number", "label": "Idade", "min": 10, "max": 1 }
        ]));

        let errors = doc.validate().unwrap_err();
        assert_eq!(errors.get("a").map(String::as_str), Some("missing_label"));
        assert_eq!(errors.get("b").map(String::as_str), Some("missing_options"));
        assert_eq!(errors.get("c").map(String::as_str), Some("invalid_range"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let doc = document(json!([
            { "id": "x", "type": "text", "label": "Um" },
            { "id": "x", "type": "email", "label": "Dois" }
        ]));
        let errors = doc.validate().unwrap_err();
        assert_eq!(errors.get("x").map(String::as_str), Some("duplicate_id"));
    }

    #[test]
    fn answers_are_checked_against_field_types() {
        let doc = document(json!([
            { "id": "name", "type": "text", "label": "Nome", "required": true },
            { "id": "email", "type": "email", "label": "E-mail" },
            { "id": "start", "type": "date", "label": "Início" },
            { "id": "staff", "type": "number", "label": "Equipe", "min": 1, "max": 50 },
            { "id": "plan", "type": "select", "label": "Plano", "options": ["Básico", "Pro"] },
            { "id": "terms", "type": "checkbox", "label": "Aceito" }
        ]));

        let ok = json!({
            "name": "Padaria", "email": "a@b.com", "start": "2025-02-01",
            "staff": "12", "plan": "Pro", "terms": true, "extra": 1
        });
        assert!(doc.validate_answers(&ok).is_ok());

        let bad = json!({
            "name": "  ", "email": "nope", "start": "01/02/2025",
            "staff": 99, "plan": "Enterprise", "terms": "yes"
        });
        let errors = doc.validate_answers(&bad).unwrap_err();
        assert_eq!(errors["name"], "required");
        assert_eq!(errors["email"], "invalid_email");
        assert_eq!(errors["start"], "invalid_date_format");
        assert_eq!(errors["staff"], "above_max");
        assert_eq!(errors["plan"], "invalid_option");
        assert_eq!(errors["terms"], "invalid_boolean");
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let bounded = document(json!([
            { "id": "staff", "type": "number", "label": "Equipe", "min": 1, "max": 50 }
        ]));
        let open = document(json!([{ "id": "staff", "type": "number", "label": "Equipe" }]));

        for text in ["NaN", "inf", "-inf", "infinity"] {
            for doc in [&bounded, &open] {
                let errors = doc.validate_answers(&json!({ "staff": text })).unwrap_err();
                assert_eq!(errors["staff"], "invalid_number", "{text}");
            }
        }
    }

    #[test]
    fn answers_must_be_an_object() {
        let doc = document(json!([]));
        let errors = doc.validate_answers(&json!([1, 2])).unwrap_err();
        assert_eq!(errors["data"], "invalid_object");
    }

    #[test]
    fn fields_input_accepts_document_or_bare_list() {
        let document: FormFieldsInput = serde_json::from_value(json!({
            "version": 1,
            "sections": [{ "id": "s1", "title": "Dados", "fields": [] }]
        }))
        .unwrap();
        assert!(matches!(document, FormFieldsInput::Document(_)));

        let list: FormFieldsInput = serde_json::from_value(json!([
            { "id": "a", "type": "phone", "label": "Telefone" }
        ]))
        .unwrap();
        assert!(matches!(list, FormFieldsInput::Fields(ref f) if f.len() == 1));
    }

    #[test]
    fn serializes_type_tag_inline() {
        let field = FormField {
            id: "p".into(),
            label: "Canal".into(),
            required: false,
            placeholder: None,
            kind: FieldKind::Radio { options: vec!["Site".into()] },
        };
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["type"], "radio");
        assert_eq!(value["options"], json!(["Site"]));
        assert!(value.get("placeholder").is_none());
    }
}
