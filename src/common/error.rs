use std::collections::HashMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Corpo, path ou query que nem chegou a ser desserializado
    #[error("Requisição inválida: {0}")]
    InvalidPayload(String),

    // Mapa "campo -> código" (documento de formulário ou respostas de um envio)
    #[error("Dados do formulário inválidos")]
    FormValidation(HashMap<String, String>),

    #[error("Não autenticado")]
    Unauthenticated,

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Webhook rejeitado: {0}")]
    WebhookVerification(String),

    #[error("Provedor de identidade recusou a operação: {0}")]
    IdentityProviderRejected(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Provedor de identidade indisponível: {0}")]
    IdentityProviderUnavailable(#[from] reqwest::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidPayload(_)
            | AppError::FormValidation(_)
            | AppError::WebhookVerification(_)
            | AppError::IdentityProviderRejected(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_)
            | AppError::IdentityProviderUnavailable(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }
            AppError::FormValidation(details) => json!({
                "error": "Um ou mais campos do formulário são inválidos.",
                "details": details,
            }),
            AppError::InvalidPayload(message) => json!({ "error": message }),
            AppError::Unauthenticated => {
                json!({ "error": "Token de autenticação inválido ou ausente." })
            }
            AppError::JwtError(e) => {
                tracing::debug!("Token recusado: {}", e);
                json!({ "error": "Token de autenticação inválido ou ausente." })
            }
            AppError::Forbidden(message) => json!({ "error": message }),
            AppError::NotFound(what) => json!({ "error": format!("{} não encontrado.", what) }),
            AppError::Conflict(message) => json!({ "error": message }),
            AppError::WebhookVerification(message) => {
                tracing::warn!("Webhook rejeitado: {}", message);
                json!({ "error": message })
            }
            AppError::IdentityProviderRejected(message) => json!({ "error": message }),

            // Todos os outros erros viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }
        };

        (status, Json(body)).into_response()
    }
}

// Rejeições dos extratores viram 400 no nosso formato
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidPayload(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidPayload(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("Serviço").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidPayload("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::IdentityProviderRejected("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn form_validation_exposes_field_codes() {
        let mut details = HashMap::new();
        details.insert("email".to_string(), "invalid_email".to_string());

        let response = AppError::FormValidation(details).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["details"]["email"], "invalid_email");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = AppError::InternalServerError(anyhow::anyhow!("senha do banco")).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("senha do banco"));
    }
}
