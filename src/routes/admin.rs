use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users holding the "Admin" role:
/// user management, role management, department management, and the explicit
/// membership-removal operations.
///
/// Access Control:
/// This entire router is wrapped (in `create_router`) in a layer that first
/// authenticates the caller via the `CurrentUser` extractor and then runs the
/// `admit_admin` guard. A denied admission responds 403 before any handler
/// executes, so no handler here re-checks the role.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Users ---
        // Listing and creation. There is deliberately no user-delete route.
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        // Detail view (with assignable candidates) and the combined update
        // flow: rename plus optional role/department assignment in one request.
        .route(
            "/users/{id}",
            get(handlers::get_user_detail).put(handlers::update_user),
        )
        // --- Roles ---
        .route("/roles", get(handlers::list_roles).post(handlers::create_role))
        // Detail (role + members), rename with optional member attach, and
        // deletion (membership edges cascade).
        .route(
            "/roles/{id}",
            get(handlers::get_role_detail)
                .put(handlers::update_role)
                .delete(handlers::delete_role),
        )
        // DELETE /roles/{id}/members/{user_id}
        // Explicit removal of a single membership edge; absence is 404.
        .route(
            "/roles/{id}/members/{user_id}",
            delete(handlers::remove_role_member),
        )
        // --- Departments (symmetric to roles) ---
        .route(
            "/departments",
            get(handlers::list_departments).post(handlers::create_department),
        )
        .route(
            "/departments/{id}",
            get(handlers::get_department_detail)
                .put(handlers::update_department)
                .delete(handlers::delete_department),
        )
        .route(
            "/departments/{id}/members/{user_id}",
            delete(handlers::remove_department_member),
        )
}
