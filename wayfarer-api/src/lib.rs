use axum::{http::Method, middleware::from_fn_with_state, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod extract;
pub mod middleware;
pub mod rules;
pub mod state;

pub mod activities;
pub mod bookings;
pub mod destinations;
pub mod faqs;
pub mod favorites;
pub mod hotels;
pub mod notifications;
pub mod trips;
pub mod vehicles;

pub use error::AppError;
pub use state::AppState;

use middleware::{admin_auth_middleware, rate_limit_middleware, user_auth_middleware};

/// Full router: `/api/v1` plus static files under `/storage`.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let public = Router::new()
        .merge(destinations::public_routes())
        .merge(hotels::public_routes())
        .merge(vehicles::public_routes())
        .merge(activities::public_routes())
        .merge(faqs::public_routes());

    let admin = Router::new()
        .merge(destinations::admin_routes())
        .merge(hotels::admin_routes())
        .merge(vehicles::admin_routes())
        .merge(activities::admin_routes())
        .merge(faqs::admin_routes())
        .merge(notifications::admin_routes())
        .merge(bookings::admin_routes())
        .route_layer(from_fn_with_state(state.clone(), admin_auth_middleware));

    let user = Router::new()
        .merge(trips::user_routes())
        .merge(favorites::user_routes())
        .merge(notifications::user_routes())
        .merge(bookings::user_routes())
        .route_layer(from_fn_with_state(state.clone(), user_auth_middleware));

    Router::new()
        .nest("/api/v1", public.merge(admin).merge(user))
        .nest_service("/storage", ServeDir::new(&state.storage_root))
        .fallback(route_not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::NotFoundError("Route not found".to_string())
}
