use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{error::ApiError, repository::RepositoryState, session::SessionState};

/// The role name that unlocks the admin routes. Exact match, case-sensitive.
pub const ADMIN_ROLE: &str = "Admin";

/// CurrentUser
///
/// The resolved identity of an authenticated request: the output of the
/// authentication gate. Handlers receive it as an explicit argument — there is
/// no ambient "current user" global anywhere in the application.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: uuid::Uuid,
    pub username: String,
    /// Names of the roles the user holds, loaded fresh on every request so a
    /// revoked role takes effect immediately.
    pub roles: Vec<String>,
    /// The bearer token the request arrived with; kept so logout can revoke it.
    pub token: String,
}

impl CurrentUser {
    /// True iff the user's role set contains the role named exactly "Admin".
    /// An empty role set is simply `false` — the gate fails closed, never errors.
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }
}

/// Admission
///
/// The typed result of an authorization decision. Guards return this instead
/// of short-circuiting inside handlers, so the decision is inspectable and the
/// denial reason travels with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { reason: &'static str },
}

/// admit_admin
///
/// The authorization gate: admits an already-resolved user to admin-only
/// operations. Pure — it looks only at the role set resolved at
/// authentication time.
pub fn admit_admin(user: &CurrentUser) -> Admission {
    if user.is_admin() {
        Admission::Allowed
    } else {
        Admission::Denied {
            reason: "insufficient permission",
        }
    }
}

/// CurrentUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making CurrentUser usable as a
/// function argument in any authenticated handler. This cleanly separates
/// authentication (extractor) from business logic (the handler).
///
/// The resolution chain:
/// 1. Bearer token extraction from the Authorization header.
/// 2. Session lookup — expired or unknown tokens resolve to nobody, and a
///    successful lookup refreshes the idle timer.
/// 3. DB lookup — the session may outlive the user row; a dangling session is
///    treated as anonymous, not as an error.
/// 4. Role names are loaded alongside, feeding the authorization gate.
///
/// Rejection: `ApiError::AuthenticationRequired` (401) on any failure. No
/// handler — and therefore no data-store mutation — runs for an anonymous caller.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    SessionState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let sessions = SessionState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::AuthenticationRequired)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::AuthenticationRequired)?;

        let user_id = sessions
            .resolve(token)
            .await
            .ok_or(ApiError::AuthenticationRequired)?;

        let user = repo
            .get_user(user_id)
            .await
            .ok_or(ApiError::AuthenticationRequired)?;

        let roles = repo
            .roles_for_user(user.id)
            .await
            .into_iter()
            .map(|role| role.name)
            .collect();

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
            roles,
            token: token.to_string(),
        })
    }
}
