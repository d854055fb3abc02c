// src/services/auth.rs

use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    config::TokenVerification,
    db::UserRepository,
    models::auth::{Claims, User},
    services::identity_provider::IdentityProvider,
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    identity: Arc<dyn IdentityProvider>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        identity: Arc<dyn IdentityProvider>,
        verification: &TokenVerification,
    ) -> Result<Self, AppError> {
        let (decoding_key, algorithm) = match verification {
            TokenVerification::RsaPublicKey(pem) => (DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256),
            TokenVerification::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
        };

        let mut validation = Validation::new(algorithm);
        // Tokens de sessão do provedor não carregam `aud`
        validation.validate_aud = false;

        Ok(Self { user_repo, identity, decoding_key, validation })
    }

    /// Valida assinatura e expiração do token de sessão.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Token -> espelho local. Se o espelho ainda não existe (webhook atrasado),
    /// busca o usuário no provedor e cria a linha.
    pub async fn authenticate<'e, E>(&self, executor: E, token: &str) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres> + Copy,
    {
        let claims = self.validate_token(token)?;

        if let Some(user) = self.user_repo.find_by_external_id(executor, &claims.sub).await? {
            return Ok(user);
        }

        let mirror = self.identity.fetch_user(&claims.sub).await?.into_mirror()?;
        let user = self.user_repo.insert_mirror_if_absent(executor, &mirror).await?;
        tracing::info!(external_id = %user.external_id, role = ?user.role, "Espelho criado no primeiro acesso");

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::rbac::Role,
        services::identity_provider::{NewProviderUser, ProviderUser},
    };
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "segredo-de-teste";

    struct NoProvider;

    #[async_trait::async_trait]
    impl IdentityProvider for NoProvider {
        async fn fetch_user(&self, _external_id: &str) -> Result<ProviderUser, AppError> {
            Err(AppError::NotFound("Usuário"))
        }
        async fn create_invitation(&self, _email: &str, _role: Role, _redirect_url: &str) -> Result<(), AppError> {
            Ok(())
        }
        async fn create_user(&self, _user: &NewProviderUser<'_>) -> Result<ProviderUser, AppError> {
            Err(AppError::NotFound("Usuário"))
        }
        async fn update_role(&self, _external_id: &str, _role: Role) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn service() -> AuthService {
        AuthService::new(
            UserRepository::new(),
            Arc::new(NoProvider),
            &TokenVerification::Secret(SECRET.to_string()),
        )
        .unwrap()
    }

    fn token(sub: &str, exp: i64) -> String {
        let claims = Claims { sub: sub.to_string(), exp: exp as usize, iat: None };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_session_token() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let claims = service().validate_token(&token("user_abc", exp)).unwrap();
        assert_eq!(claims.sub, "user_abc");
    }

    #[tokio::test]
    async fn rejects_expired_or_foreign_tokens() {
        let auth = service();
        let expired = chrono::Utc::now().timestamp() - 3600;
        assert!(matches!(auth.validate_token(&token("user_abc", expired)), Err(AppError::JwtError(_))));

        let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
        let claims = Claims { sub: "x".into(), exp, iat: None };
        let forged = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"outro")).unwrap();
        assert!(matches!(auth.validate_token(&forged), Err(AppError::JwtError(_))));
    }

    #[tokio::test]
    async fn invalid_public_key_is_a_startup_error() {
        let result = AuthService::new(
            UserRepository::new(),
            Arc::new(NoProvider),
            &TokenVerification::RsaPublicKey("não é um PEM".to_string()),
        );
        assert!(result.is_err());
    }
}
