use axum::{middleware, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::{api_routes, public_routes};

use super::{bearer_auth, AppState};

pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Every /api route sits behind the bearer-token gate
    let authed = api_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        bearer_auth,
    ));

    Router::new()
        .merge(public_routes())
        .merge(authed)
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Add state
        .with_state(state)
}
