pub mod common;
pub mod containers;
pub mod definitions;
pub mod inventory;
pub mod label_templates;
pub mod locations;
pub mod materials;
pub mod packaging;
pub mod shipments;
pub mod trace;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
pub type AppServices = crate::services::factory::ServiceContainer;
