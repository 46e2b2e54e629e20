pub mod api;
pub mod app;
pub mod engine;
pub mod store;

pub use api::{HttpStatusApi, StatusApi};
pub use engine::DashboardEngine;
pub use store::ConfigStore;
