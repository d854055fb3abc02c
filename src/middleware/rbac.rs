// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::{auth::User, rbac::Capability},
};

/// 1. O Trait que define o que é uma Permissão: basta uma das capacidades listadas.
pub trait PermissionDef: Send + Sync + 'static {
    fn any_of() -> &'static [Capability];
}

/// 2. O Extractor (Guardião). Entrega o usuário já autorizado.
pub struct RequirePermission<T>(pub User, pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A. Extrai Usuário (colocado pelo auth_guard)
        let AuthenticatedUser(user) = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthenticated)?;

        // B. Consulta a tabela fixa do papel
        let permissions = user.role.permissions();
        let required = T::any_of();

        if !required.iter().any(|c| permissions.allows(*c)) {
            let flags: Vec<&str> = required.iter().map(|c| c.flag()).collect();
            return Err(AppError::Forbidden(format!(
                "Você precisa da permissão '{}' para realizar esta ação.",
                flags.join("' ou '")
            )));
        }

        Ok(RequirePermission(user, PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermManageUsers;
impl PermissionDef for PermManageUsers {
    fn any_of() -> &'static [Capability] { &[Capability::ManageUsers] }
}

// Listagem de usuários: quem gerencia usuários ou quem atribui serviços
pub struct PermViewUsers;
impl PermissionDef for PermViewUsers {
    fn any_of() -> &'static [Capability] { &[Capability::ManageUsers, Capability::AssignServices] }
}

pub struct PermViewAdminPanel;
impl PermissionDef for PermViewAdminPanel {
    fn any_of() -> &'static [Capability] { &[Capability::ViewAdminPanel] }
}

pub struct PermManageServices;
impl PermissionDef for PermManageServices {
    fn any_of() -> &'static [Capability] { &[Capability::ManageServices] }
}

pub struct PermAssignServices;
impl PermissionDef for PermAssignServices {
    fn any_of() -> &'static [Capability] { &[Capability::AssignServices] }
}

pub struct PermManageForms;
impl PermissionDef for PermManageForms {
    fn any_of() -> &'static [Capability] { &[Capability::ManageForms] }
}

pub struct PermSubmitRequests;
impl PermissionDef for PermSubmitRequests {
    fn any_of() -> &'static [Capability] { &[Capability::SubmitRequests] }
}

pub struct PermTriageRequests;
impl PermissionDef for PermTriageRequests {
    fn any_of() -> &'static [Capability] { &[Capability::AssignServices, Capability::ManageServices] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rbac::{Role, RolePermissions};
    use axum::http::Request;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            external_id: "user_test".into(),
            email: "teste@example.com".into(),
            first_name: None,
            last_name: None,
            name: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn parts(user: Option<User>) -> Parts {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        if let Some(user) = user {
            parts.extensions.insert(AuthenticatedUser(user));
        }
        parts
    }

    async fn check<T: PermissionDef>(role: Role) -> Result<(), AppError> {
        RequirePermission::<T>::from_request_parts(&mut parts(Some(user(role))), &())
            .await
            .map(|_| ())
    }

    // Cada marcador de capacidade única bate com a tabela para todos os papéis
    #[tokio::test]
    async fn single_capability_guards_follow_the_table() {
        for role in Role::ALL {
            let table: RolePermissions = role.permissions();
            assert_eq!(check::<PermManageUsers>(role).await.is_ok(), table.can_manage_users);
            assert_eq!(check::<PermViewAdminPanel>(role).await.is_ok(), table.can_view_admin_panel);
            assert_eq!(check::<PermManageServices>(role).await.is_ok(), table.can_manage_services);
            assert_eq!(check::<PermAssignServices>(role).await.is_ok(), table.can_assign_services);
            assert_eq!(check::<PermManageForms>(role).await.is_ok(), table.can_manage_forms);
            assert_eq!(check::<PermSubmitRequests>(role).await.is_ok(), table.can_submit_requests);
        }
    }

    #[tokio::test]
    async fn any_of_guards_accept_either_capability() {
        assert!(check::<PermViewUsers>(Role::Admin).await.is_ok());
        assert!(check::<PermViewUsers>(Role::Manager).await.is_ok());
        assert!(matches!(check::<PermViewUsers>(Role::Client).await, Err(AppError::Forbidden(_))));

        assert!(check::<PermTriageRequests>(Role::Manager).await.is_ok());
        assert!(matches!(check::<PermTriageRequests>(Role::Client).await, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn missing_user_is_unauthenticated() {
        let result = RequirePermission::<PermManageUsers>::from_request_parts(&mut parts(None), &()).await;
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn forbidden_message_names_the_capability() {
        let Err(AppError::Forbidden(message)) = check::<PermManageForms>(Role::Manager).await else {
            panic!("esperava Forbidden");
        };
        assert!(message.contains("canManageForms"));
    }
}
