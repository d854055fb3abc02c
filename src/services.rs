pub mod identity_provider;
pub mod auth;
pub mod webhook_service;
pub mod user_service;
pub mod client_service;
pub mod template_service;
pub mod assignment_service;
pub mod form_builder;
pub mod form_service;
pub mod request_service;
pub mod dashboard_service;
