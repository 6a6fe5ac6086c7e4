use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware::from_fn,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::core::middleware::basic_auth_middleware;
use crate::features::hospitals::handlers::{self, AdminHospitalState, HospitalState};

/// Request budgets, applied per route group
#[derive(Debug, Clone, Copy)]
pub struct RouteTimeouts {
    pub request: Duration,
    /// Imports pause between geocoder calls, so they get their own budget
    pub import: Duration,
}

/// Public read endpoints
///
/// Fixed segments (`nearby`, `status-counts`, `lookup`) are matched before `{id}`
pub fn public_routes(state: HospitalState) -> Router {
    Router::new()
        .route("/api/hospitals", get(handlers::search_hospitals))
        .route("/api/hospitals/nearby", get(handlers::list_nearby_hospitals))
        .route(
            "/api/hospitals/status-counts",
            get(handlers::get_status_counts),
        )
        .route("/api/hospitals/lookup", get(handlers::lookup_hospital))
        .route("/api/hospitals/{id}", get(handlers::get_hospital))
        .with_state(state)
}

/// Write endpoints (basic auth middleware applied by caller)
pub fn admin_routes(state: AdminHospitalState) -> Router {
    Router::new()
        .route("/api/admin/hospitals", post(handlers::create_hospital))
        .route(
            "/api/admin/hospitals/{id}",
            put(handlers::update_hospital).delete(handlers::delete_hospital),
        )
        .route(
            "/api/admin/hospitals/{id}/status",
            patch(handlers::change_hospital_status),
        )
        .route(
            "/api/admin/hospitals/{id}/location",
            put(handlers::update_hospital_location),
        )
        .with_state(state)
}

/// Dataset import (basic auth middleware applied by caller)
pub fn import_routes(state: AdminHospitalState) -> Router {
    Router::new()
        .route(
            "/api/admin/hospitals/import",
            post(handlers::import_hospitals),
        )
        .with_state(state)
}

/// All hospital routes with their timeouts. Admin and import routes are only
/// mounted when credentials are given.
pub fn routes(
    state: HospitalState,
    admin: Option<(AdminHospitalState, Arc<String>)>,
    timeouts: RouteTimeouts,
) -> Router {
    let request_timeout =
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeouts.request);

    let Some((admin_state, credentials)) = admin else {
        return public_routes(state).layer(request_timeout);
    };

    let admin = admin_routes(admin_state.clone()).route_layer(from_fn(basic_auth_middleware(
        Arc::clone(&credentials),
        "Admin",
    )));
    let import = import_routes(admin_state)
        .route_layer(from_fn(basic_auth_middleware(credentials, "Admin")))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeouts.import,
        ));

    public_routes(state)
        .merge(admin)
        .layer(request_timeout)
        .merge(import)
}
