use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record stored in the `users` table.
/// Internal use only: it carries the password hash and therefore never derives
/// `Serialize`. Everything client-facing goes through `UserResponse`/`UserDetail`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    // Globally unique, case-sensitive as stored.
    pub username: String,
    // Opaque one-way digest. Verified, never decoded.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Note
///
/// A personal note from the `notes` table. The owner reference (`user_id`) is
/// immutable after creation; every query touching notes is scoped by it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Note {
    pub id: Uuid,
    // FK to users.id (Owner).
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Role
///
/// A named role from the `roles` table. Membership lives in the `user_roles`
/// join table; deleting a role cascades its edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Role {
    pub id: Uuid,
    // Globally unique. The literal name "Admin" unlocks the admin routes.
    pub name: String,
}

/// Department
///
/// A department from the `departments` table. Same lifecycle and join-table
/// semantics as `Role`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Department {
    pub id: Uuid,
    // Globally unique.
    pub title: String,
}

// --- Response Schemas (Output) ---

/// UserResponse
///
/// The client-safe projection of a `User`: identity fields only, never the hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// UserProfile
///
/// Output schema for the authenticated user's own profile (GET /me), enriched
/// with the user's role and department memberships.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<Role>,
    pub departments: Vec<Department>,
}

/// UserDetail
///
/// Admin view of a single user (GET /users/{id} and the combined-update
/// response). Besides current memberships it lists the departments *not yet*
/// assigned, computed as a set difference, so the edit form can render
/// assignable candidates.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserDetail {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<Role>,
    pub departments: Vec<Department>,
    pub assignable_departments: Vec<Department>,
}

/// RoleDetail
///
/// Admin view of a role together with its current members (GET /roles/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleDetail {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<UserResponse>,
}

/// DepartmentDetail
///
/// Admin view of a department together with its current members.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DepartmentDetail {
    pub id: Uuid,
    pub title: String,
    pub members: Vec<UserResponse>,
}

/// LoginResponse
///
/// Output of a successful login: the opaque session token the client must send
/// as `Authorization: Bearer <token>` on every subsequent request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

// --- Request Payloads (Input Schemas) ---

/// SignUpRequest
///
/// Input payload for public registration (POST /sign_up). The password is
/// hashed before it touches the database and never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
}

/// LoginRequest
///
/// Input payload for POST /log_in.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// CreateNoteRequest
///
/// Input payload for POST /notes. Title presence is the only validation;
/// an empty body is fine.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// UpdateNoteRequest
///
/// Full-replace payload for PUT /notes/{id}. The owner reference is immutable
/// and deliberately absent here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// CreateUserRequest
///
/// Admin payload for POST /users. New users start with no roles and no
/// departments; assignment happens through the update flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

/// UpdateUserRequest
///
/// Admin payload for the combined user update (PUT /users/{id}): rename plus
/// optional role and/or department assignment in a single request.
///
/// Absence of a selection is expressed as `None` (omitted or JSON null), never
/// as a sentinel string, so a role or department legitimately named "None"
/// cannot be confused with "nothing selected".
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
}

/// CreateRoleRequest
///
/// Admin payload for POST /roles.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateRoleRequest {
    pub name: String,
}

/// UpdateRoleRequest
///
/// Admin payload for PUT /roles/{id}: rename, with an optional member to
/// attach in the same request (`member_id`, `None` meaning no assignment).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<Uuid>,
}

/// CreateDepartmentRequest
///
/// Admin payload for POST /departments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateDepartmentRequest {
    pub title: String,
}

/// UpdateDepartmentRequest
///
/// Admin payload for PUT /departments/{id}, symmetric to `UpdateRoleRequest`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateDepartmentRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<Uuid>,
}
