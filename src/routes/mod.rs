/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules,
/// enforcing a Defense-in-Depth strategy. Access control is applied explicitly
/// at the module level (via Axum layers), preventing accidental exposure of
/// protected endpoints.
///
/// The three modules map directly to the gates a request must pass:
/// none, authentication, or authentication plus the admin role.

/// Routes accessible to all callers: registration, login, liveness.
pub mod public;

/// Routes behind the authentication gate (the `CurrentUser` extractor layer).
pub mod authenticated;

/// Routes behind both gates: authentication plus the Admin role check.
pub mod admin;
