// Infrastructure layer (shared components)
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

// Domain layer (business logic)
pub mod channels;
pub mod notification;
pub mod store;

// Application layer
pub mod api;
pub mod queue;
pub mod server;
