use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has passed the authentication
/// gate: session management, the caller's profile, and personal note CRUD.
///
/// Access Control Strategy:
/// Every handler here relies on the `CurrentUser` extractor layer being present
/// on the router above this module. All note queries are additionally
/// owner-scoped in the repository, so a foreign note is indistinguishable from
/// a missing one.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // DELETE /log_out
        // Revokes the session the request arrived with; the token stops
        // authenticating immediately.
        .route("/log_out", delete(handlers::log_out))
        // GET /me
        // The caller's profile with role and department memberships.
        .route("/me", get(handlers::get_me))
        // --- Personal Notes ---
        // GET lists the caller's notes; POST creates one (title required).
        .route("/notes", get(handlers::list_notes).post(handlers::create_note))
        // GET/PUT/DELETE a single note. Owner-scoped: foreign notes read as 404.
        .route(
            "/notes/{id}",
            get(handlers::get_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        )
}
