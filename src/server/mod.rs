mod app;
mod middleware;
mod state;

pub use app::create_app;
pub use middleware::bearer_auth;
pub use state::AppState;
