// src/services/form_builder.rs

use crate::models::form::{FieldKind, FormDocument, FormField, FormSection, FORM_SCHEMA_VERSION};

pub const MAIN_SECTION_ID: &str = "main";
pub const MAIN_SECTION_TITLE: &str = "Form Fields";

/// Edição parcial de um campo. `None` = não mexe.
#[derive(Debug, Clone, Default)]
pub struct FieldPatch {
    pub label: Option<String>,
    pub required: Option<bool>,
    pub placeholder: Option<Option<String>>,
    pub kind: Option<FieldKind>,
}

/// Lista ordenada de campos em memória. Nada é persistido até `into_document`.
#[derive(Debug, Clone, Default)]
pub struct FormBuilder {
    fields: Vec<FormField>,
    next_id: usize,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Vec<FormField>) -> Self {
        let next_id = fields.len();
        Self { fields, next_id }
    }

    /// Achata todas as seções em uma lista só.
    pub fn from_document(document: FormDocument) -> Self {
        Self::from_fields(document.sections.into_iter().flat_map(|s| s.fields).collect())
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn append(&mut self, field: FormField) {
        self.fields.push(field);
    }

    /// Novo campo com id gerado e rótulo padrão. Select/radio já nascem com uma opção.
    pub fn add_field(&mut self, kind: FieldKind) -> &FormField {
        let id = self.fresh_id();
        let kind = match kind {
            FieldKind::Select { options } if options.is_empty() => FieldKind::Select { options: vec!["Opção 1".into()] },
            FieldKind::Radio { options } if options.is_empty() => FieldKind::Radio { options: vec!["Opção 1".into()] },
            other => other,
        };
        self.fields.push(FormField {
            id,
            label: "Novo campo".to_string(),
            required: false,
            placeholder: None,
            kind,
        });
        &self.fields[self.fields.len() - 1]
    }

    pub fn update(&mut self, id: &str, patch: FieldPatch) -> bool {
        let Some(field) = self.fields.iter_mut().find(|f| f.id == id) else {
            return false;
        };
        if let Some(label) = patch.label {
            field.label = label;
        }
        if let Some(required) = patch.required {
            field.required = required;
        }
        if let Some(placeholder) = patch.placeholder {
            field.placeholder = placeholder;
        }
        if let Some(kind) = patch.kind {
            field.kind = kind;
        }
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<FormField> {
        let index = self.position(id)?;
        Some(self.fields.remove(index))
    }

    /// Arrasta `active_id` para a posição ocupada por `over_id`.
    pub fn move_field(&mut self, active_id: &str, over_id: &str) -> bool {
        let (Some(from), Some(to)) = (self.position(active_id), self.position(over_id)) else {
            return false;
        };
        if from != to {
            let field = self.fields.remove(from);
            self.fields.insert(to, field);
        }
        true
    }

    /// Embrulha a lista na seção única do editor.
    pub fn into_document(self) -> FormDocument {
        FormDocument {
            version: FORM_SCHEMA_VERSION,
            sections: vec![FormSection {
                id: MAIN_SECTION_ID.to_string(),
                title: MAIN_SECTION_TITLE.to_string(),
                fields: self.fields,
            }],
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    fn fresh_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let candidate = format!("field_{}", self.next_id);
            if self.position(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(builder: &FormBuilder) -> Vec<&str> {
        builder.fields().iter().map(|f| f.id.as_str()).collect()
    }

    fn builder_with(n: usize) -> FormBuilder {
        let mut builder = FormBuilder::new();
        for _ in 0..n {
            builder.add_field(FieldKind::Text);
        }
        builder
    }

    #[test]
    fn add_field_generates_unique_ids() {
        let mut builder = FormBuilder::from_fields(vec![FormField {
            id: "field_2".into(),
            label: "Existente".into(),
            required: false,
            placeholder: None,
            kind: FieldKind::Text,
        }]);
        builder.add_field(FieldKind::Email);
        builder.add_field(FieldKind::Date);

        assert_eq!(ids(&builder), vec!["field_2", "field_3", "field_4"]);
    }

    #[test]
    fn choice_fields_start_with_an_option() {
        let mut builder = FormBuilder::new();
        let field = builder.add_field(FieldKind::Select { options: vec![] });
        assert_eq!(field.kind.options().map(<[String]>::len), Some(1));
    }

    #[test]
    fn move_field_follows_drag_semantics() {
        let mut builder = builder_with(4);
        assert!(builder.move_field("field_1", "field_3"));
        assert_eq!(ids(&builder), vec!["field_2", "field_3", "field_1", "field_4"]);

        assert!(builder.move_field("field_4", "field_2"));
        assert_eq!(ids(&builder), vec!["field_4", "field_2", "field_3", "field_1"]);

        assert!(!builder.move_field("field_9", "field_2"));
    }

    #[test]
    fn update_is_partial() {
        let mut builder = builder_with(1);
        let patched = builder.update(
            "field_1",
            FieldPatch {
                label: Some("Empresa".into()),
                placeholder: Some(Some("Nome fantasia".into())),
                ..FieldPatch::default()
            },
        );
        assert!(patched);

        let field = &builder.fields()[0];
        assert_eq!(field.label, "Empresa");
        assert_eq!(field.placeholder.as_deref(), Some("Nome fantasia"));
        assert!(!field.required);
        assert_eq!(field.kind, FieldKind::Text);

        assert!(!builder.update("nope", FieldPatch::default()));
    }

    #[test]
    fn remove_drops_only_the_target() {
        let mut builder = builder_with(3);
        let removed = builder.remove("field_2").unwrap();
        assert_eq!(removed.id, "field_2");
        assert_eq!(ids(&builder), vec!["field_1", "field_3"]);
        assert!(builder.remove("field_2").is_none());
    }

    #[test]
    fn save_wraps_fields_in_main_section() {
        let mut builder = builder_with(2);
        builder.update("field_1", FieldPatch { label: Some("Nome".into()), ..Default::default() });
        builder.update("field_2", FieldPatch { label: Some("Email".into()), ..Default::default() });

        let document = builder.into_document();
        assert_eq!(document.version, FORM_SCHEMA_VERSION);
        assert_eq!(document.sections.len(), 1);
        assert_eq!(document.sections[0].id, MAIN_SECTION_ID);
        assert_eq!(document.sections[0].title, MAIN_SECTION_TITLE);
        assert_eq!(document.sections[0].fields.len(), 2);
        assert!(document.validate().is_ok());
    }

    #[test]
    fn round_trips_through_document() {
        let document = builder_with(3).into_document();
        let rebuilt = FormBuilder::from_document(document.clone());
        assert_eq!(rebuilt.into_document(), document);
    }
}
