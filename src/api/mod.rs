mod handlers;
mod health;
mod models;
mod routes;

pub use routes::{api_routes, public_routes};
