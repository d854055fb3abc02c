// src/models/rbac.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// --- ENUMS ---

// Mapeia o CREATE TYPE user_role do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[serde(alias = "admin")]
    Admin,
    #[serde(alias = "manager")]
    Manager,
    #[serde(alias = "client")]
    Client,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Client];

    /// A tabela de permissões. Única fonte da verdade: o frontend recebe
    /// a mesma tabela via `GET /api/permissions`.
    pub const fn permissions(self) -> RolePermissions {
        match self {
            Role::Admin => RolePermissions {
                can_view_admin_panel: true,
                can_manage_users: true,
                can_manage_services: true,
                can_manage_forms: true,
                can_assign_services: true,
                can_submit_requests: false,
                can_view_all_services: true,
                can_view_own_data: true,
            },
            Role::Manager => RolePermissions {
                can_view_admin_panel: true,
                can_manage_users: false,
                can_manage_services: false,
                can_manage_forms: false,
                can_assign_services: true,
                can_submit_requests: false,
                can_view_all_services: true,
                can_view_own_data: true,
            },
            Role::Client => RolePermissions {
                can_view_admin_panel: false,
                can_manage_users: false,
                can_manage_services: false,
                can_manage_forms: false,
                can_assign_services: false,
                can_submit_requests: true,
                can_view_all_services: false,
                can_view_own_data: true,
            },
        }
    }

    /// Converte o valor de metadado do provedor de identidade ("admin", "ADMIN", ...).
    /// Ausente ou desconhecido vira CLIENT.
    pub fn from_claim(value: Option<&str>) -> Role {
        match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
            Some("ADMIN") => Role::Admin,
            Some("MANAGER") => Role::Manager,
            _ => Role::Client,
        }
    }

    /// Valor gravado nos metadados públicos do provedor.
    pub fn as_claim(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Client => "client",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Manager => "Manager",
            Role::Client => "Client",
        }
    }
}

// --- CAPACIDADES ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissions {
    pub can_view_admin_panel: bool,
    pub can_manage_users: bool,
    pub can_manage_services: bool,
    pub can_manage_forms: bool,
    pub can_assign_services: bool,
    pub can_submit_requests: bool,
    pub can_view_all_services: bool,
    pub can_view_own_data: bool,
}

impl RolePermissions {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewAdminPanel => self.can_view_admin_panel,
            Capability::ManageUsers => self.can_manage_users,
            Capability::ManageServices => self.can_manage_services,
            Capability::ManageForms => self.can_manage_forms,
            Capability::AssignServices => self.can_assign_services,
            Capability::SubmitRequests => self.can_submit_requests,
            Capability::ViewAllServices => self.can_view_all_services,
            Capability::ViewOwnData => self.can_view_own_data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    ViewAdminPanel,
    ManageUsers,
    ManageServices,
    ManageForms,
    AssignServices,
    SubmitRequests,
    ViewAllServices,
    ViewOwnData,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::ViewAdminPanel,
        Capability::ManageUsers,
        Capability::ManageServices,
        Capability::ManageForms,
        Capability::AssignServices,
        Capability::SubmitRequests,
        Capability::ViewAllServices,
        Capability::ViewOwnData,
    ];

    pub fn flag(self) -> &'static str {
        match self {
            Capability::ViewAdminPanel => "canViewAdminPanel",
            Capability::ManageUsers => "canManageUsers",
            Capability::ManageServices => "canManageServices",
            Capability::ManageForms => "canManageForms",
            Capability::AssignServices => "canAssignServices",
            Capability::SubmitRequests => "canSubmitRequests",
            Capability::ViewAllServices => "canViewAllServices",
            Capability::ViewOwnData => "canViewOwnData",
        }
    }
}

// Resposta do GET /api/permissions (tabela completa para o frontend)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionEntry {
    pub role: Role,
    #[schema(example = "Administrator")]
    pub display_name: String,
    pub permissions: RolePermissions,
}

// Resposta do GET /api/users/me/permissions
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyPermissions {
    pub role: Role,
    pub permissions: RolePermissions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_do_everything_but_submit_requests() {
        let perms = Role::Admin.permissions();
        for capability in Capability::ALL {
            let expected = capability != Capability::SubmitRequests;
            assert_eq!(perms.allows(capability), expected, "{}", capability.flag());
        }
    }

    #[test]
    fn manager_assigns_but_does_not_manage() {
        let perms = Role::Manager.permissions();
        assert!(perms.can_view_admin_panel);
        assert!(perms.can_assign_services);
        assert!(perms.can_view_all_services);
        assert!(!perms.can_manage_users);
        assert!(!perms.can_manage_services);
        assert!(!perms.can_manage_forms);
        assert!(!perms.can_submit_requests);
    }

    #[test]
    fn client_only_submits_and_sees_own_data() {
        let perms = Role::Client.permissions();
        let granted: Vec<_> = Capability::ALL
            .into_iter()
            .filter(|c| perms.allows(*c))
            .collect();
        assert_eq!(granted, vec![Capability::SubmitRequests, Capability::ViewOwnData]);
    }

    #[test]
    fn claims_are_case_insensitive_and_default_to_client() {
        assert_eq!(Role::from_claim(Some("admin")), Role::Admin);
        assert_eq!(Role::from_claim(Some("MANAGER")), Role::Manager);
        assert_eq!(Role::from_claim(Some(" Manager ")), Role::Manager);
        assert_eq!(Role::from_claim(Some("superuser")), Role::Client);
        assert_eq!(Role::from_claim(None), Role::Client);
    }

    #[test]
    fn permissions_serialize_with_ui_flag_names() {
        let value = serde_json::to_value(Role::Manager.permissions()).unwrap();
        for capability in Capability::ALL {
            assert!(value.get(capability.flag()).is_some(), "{}", capability.flag());
        }
    }
}
