// src/services/webhook_service.rs

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use sqlx::{Acquire, Executor, Postgres};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    db::UserRepository,
    services::{identity_provider::ProviderUser, user_service::ensure_role_change_allowed},
};

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

// Janela aceita entre o carimbo do envelope e o nosso relógio (segundos)
const TIMESTAMP_TOLERANCE_SECS: u64 = 5 * 60;

// =========================================================================
//  VERIFICAÇÃO DA ASSINATURA
// =========================================================================

#[derive(Clone)]
pub struct WebhookVerifier {
    mac: HmacSha256,
}

impl WebhookVerifier {
    /// Aceita o segredo no formato do provedor (`whsec_<base64>`) ou só o base64.
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        let encoded = secret.trim().strip_prefix("whsec_").unwrap_or(secret.trim());
        let key = STANDARD
            .decode(encoded)
            .map_err(|e| anyhow::anyhow!("WEBHOOK_SECRET inválido: {e}"))?;
        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| anyhow::anyhow!("WEBHOOK_SECRET inválido: {e}"))?;
        Ok(Self { mac })
    }

    /// base64(HMAC-SHA256(chave, "{id}.{timestamp}.{corpo}"))
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
        self.verify_at(headers, body, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), AppError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AppError::WebhookVerification(format!("Cabeçalho '{name}' ausente.")))
        };

        let id = header(HEADER_ID)?;
        let timestamp: i64 = header(HEADER_TIMESTAMP)?
            .parse()
            .map_err(|_| AppError::WebhookVerification("Timestamp inválido.".to_string()))?;
        let signatures = header(HEADER_SIGNATURE)?;

        if now.abs_diff(timestamp) > TIMESTAMP_TOLERANCE_SECS {
            return Err(AppError::WebhookVerification(
                "Timestamp fora da janela de tolerância.".to_string(),
            ));
        }

        let expected = self.sign(id, timestamp, body);

        // "v1,<sig> v1,<sig2>": basta uma bater
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .any(|(_, signature)| bool::from(expected.as_bytes().ct_eq(signature.as_bytes())));

        if !matched {
            return Err(AppError::WebhookVerification("Assinatura inválida.".to_string()));
        }

        Ok(())
    }
}

// =========================================================================
//  EVENTOS
// =========================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct DeletedUser {
    id: Option<String>,
}

#[derive(Debug)]
pub enum WebhookEvent {
    UserUpserted(ProviderUser),
    UserDeleted(Option<String>),
    Ignored(String),
}

impl WebhookEvent {
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        let envelope: Envelope = serde_json::from_slice(body)
            .map_err(|e| AppError::InvalidPayload(format!("Evento inválido: {e}")))?;

        let event = match envelope.kind.as_str() {
            "user.created" | "user.updated" => {
                let user = serde_json::from_value::<ProviderUser>(envelope.data)
                    .map_err(|e| AppError::InvalidPayload(format!("Evento inválido: {e}")))?;
                WebhookEvent::UserUpserted(user)
            }
            "user.deleted" => {
                let deleted = serde_json::from_value::<DeletedUser>(envelope.data)
                    .map_err(|e| AppError::InvalidPayload(format!("Evento inválido: {e}")))?;
                WebhookEvent::UserDeleted(deleted.id)
            }
            other => WebhookEvent::Ignored(other.to_string()),
        };
        Ok(event)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    #[schema(example = "user.upserted")]
    pub outcome: String,
}

// =========================================================================
//  O SERVIÇO
// =========================================================================

#[derive(Clone)]
pub struct WebhookService {
    verifier: WebhookVerifier,
    user_repo: UserRepository,
}

impl WebhookService {
    pub fn new(verifier: WebhookVerifier, user_repo: UserRepository) -> Self {
        Self { verifier, user_repo }
    }

    /// Verifica, interpreta e aplica o evento. Reentregas produzem o mesmo estado.
    pub async fn handle<'e, E>(&self, executor: E, headers: &HeaderMap, body: &[u8]) -> Result<WebhookAck, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        self.verifier.verify(headers, body)?;

        let outcome = match WebhookEvent::parse(body)? {
            WebhookEvent::UserUpserted(provider_user) => {
                let mirror = provider_user.into_mirror()?;
                let mut tx = executor.begin().await?;

                if let Some(existing) = self.user_repo.lock_by_external_id(&mut *tx, &mirror.external_id).await? {
                    let owned = self.user_repo.count_client_records(&mut *tx, existing.id).await?;
                    ensure_role_change_allowed(existing.role, mirror.role, owned)?;
                }

                let user = self.user_repo.upsert_mirror(&mut *tx, &mirror).await?;
                tx.commit().await?;

                tracing::info!(external_id = %user.external_id, role = ?user.role, "Espelho de usuário sincronizado");
                "user.upserted".to_string()
            }
            WebhookEvent::UserDeleted(Some(external_id)) => {
                let mut tx = executor.begin().await?;
                match self.user_repo.find_by_external_id(&mut *tx, &external_id).await? {
                    Some(user) => {
                        self.user_repo.delete_cascade(&mut tx, user.id).await?;
                        tx.commit().await?;
                        tracing::info!(external_id = %external_id, "Espelho de usuário removido");
                        "user.deleted".to_string()
                    }
                    // Usuário desconhecido: nada a fazer
                    None => "user.deleted.unknown".to_string(),
                }
            }
            WebhookEvent::UserDeleted(None) => {
                return Err(AppError::InvalidPayload("Evento user.deleted sem id.".to_string()));
            }
            WebhookEvent::Ignored(kind) => {
                tracing::debug!(event = %kind, "Evento de webhook ignorado");
                format!("ignored:{kind}")
            }
        };

        Ok(WebhookAck { received: true, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    fn headers(id: &str, timestamp: i64, signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_ID, HeaderValue::from_str(id).unwrap());
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from_str(&timestamp.to_string()).unwrap());
        headers.insert(HEADER_SIGNATURE, HeaderValue::from_str(signature).unwrap());
        headers
    }

    #[test]
    fn accepts_valid_signature() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = br#"{"type":"user.created","data":{}}"#;
        let now = 1_700_000_000;
        let signature = format!("v1,{}", verifier.sign("msg_1", now, body));

        assert!(verifier.verify_at(&headers("msg_1", now, &signature), body, now).is_ok());
    }

    #[test]
    fn any_of_several_signatures_may_match() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = b"{}";
        let now = 1_700_000_000;
        let signature = format!("v1,bm9wZQ== v1,{}", verifier.sign("msg_2", now, body));

        assert!(verifier.verify_at(&headers("msg_2", now, &signature), body, now).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let now = 1_700_000_000;
        let signature = format!("v1,{}", verifier.sign("msg_3", now, b"{\"a\":1}"));

        let result = verifier.verify_at(&headers("msg_3", now, &signature), b"{\"a\":2}", now);
        assert!(matches!(result, Err(AppError::WebhookVerification(_))));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let sent = 1_700_000_000;
        let signature = format!("v1,{}", verifier.sign("msg_4", sent, b"{}"));

        let result = verifier.verify_at(&headers("msg_4", sent, &signature), b"{}", sent + 301);
        assert!(matches!(result, Err(AppError::WebhookVerification(_))));
    }

    #[test]
    fn extreme_timestamps_are_rejected_without_overflow() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let now = 1_700_000_000;

        for extreme in [i64::MIN, i64::MAX] {
            let result = verifier.verify_at(&headers("msg_5", extreme, "v1,abc"), b"{}", now);
            assert!(matches!(result, Err(AppError::WebhookVerification(_))));
        }
    }

    #[test]
    fn rejects_missing_headers() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let result = verifier.verify_at(&HeaderMap::new(), b"{}", 0);
        assert!(matches!(result, Err(AppError::WebhookVerification(_))));
    }

    #[test]
    fn secret_must_be_base64() {
        assert!(WebhookVerifier::new("whsec_***").is_err());
    }

    #[test]
    fn parses_event_kinds() {
        let created = br#"{"type":"user.created","data":{"id":"user_1","email_addresses":[]}}"#;
        assert!(matches!(WebhookEvent::parse(created).unwrap(), WebhookEvent::UserUpserted(u) if u.id == "user_1"));

        let deleted = br#"{"type":"user.deleted","data":{"id":"user_1","deleted":true}}"#;
        assert!(matches!(
            WebhookEvent::parse(deleted).unwrap(),
            WebhookEvent::UserDeleted(Some(id)) if id == "user_1"
        ));

        let session = br#"{"type":"session.created","data":{"id":"sess_1"}}"#;
        assert!(matches!(WebhookEvent::parse(session).unwrap(), WebhookEvent::Ignored(_)));

        assert!(WebhookEvent::parse(b"not json").is_err());
    }
}
