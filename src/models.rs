pub mod auth;
pub mod client;
pub mod dashboard;
pub mod form;
pub mod rbac;
pub mod request;
pub mod service;
pub mod template;
