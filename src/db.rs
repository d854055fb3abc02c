pub mod user_repo;
pub use user_repo::UserRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod template_repo;
pub use template_repo::TemplateRepository;
pub mod service_repo;
pub use service_repo::ServiceRepository;
pub mod form_repo;
pub use form_repo::FormRepository;
pub mod request_repo;
pub use request_repo::RequestRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
