pub mod permissions;
pub mod users;
pub mod client_profile;
pub mod admin;
pub mod dashboard;
pub mod service_templates;
pub mod services;
pub mod service_requests;
pub mod forms;
pub mod webhooks;
