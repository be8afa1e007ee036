use crate::{
    AppState,
    auth::CurrentUser,
    error::ApiError,
    membership::{MembershipSelection, difference},
    models::{
        CreateDepartmentRequest, CreateNoteRequest, CreateRoleRequest, CreateUserRequest,
        Department, DepartmentDetail, LoginRequest, LoginResponse, Note, Role, RoleDetail,
        SignUpRequest, UpdateDepartmentRequest, UpdateNoteRequest, UpdateRoleRequest,
        UpdateUserRequest, UserDetail, UserProfile, UserResponse,
    },
    password,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Validation Helpers ---

/// Field-presence validation: the only validation this application performs.
/// Whitespace-only input counts as empty.
fn require_non_empty(value: &str, message: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

// --- Auth Handlers (Public) ---

/// sign_up
///
/// [Public Route] Registers a new user. Validates field presence, pre-checks
/// username availability (so a duplicate surfaces as a recoverable validation
/// error rather than a raw constraint violation), and stores only the Argon2
/// digest of the password.
#[utoipa::path(
    post,
    path = "/sign_up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Registered", body = UserResponse),
        (status = 400, description = "Missing field or username taken")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    require_non_empty(&payload.username, "Username is required.")?;
    require_non_empty(&payload.password, "Password is required.")?;

    if state
        .repo
        .get_user_by_username(&payload.username)
        .await
        .is_some()
    {
        return Err(ApiError::Validation("Username is already taken.".to_string()));
    }

    let digest = password::hash(&payload.password).map_err(|e| {
        tracing::error!("password hashing failed: {:?}", e);
        ApiError::Internal
    })?;

    let user = state
        .repo
        .create_user(&payload.username, &digest)
        .await
        // A sign-up racing past the pre-check loses to the unique index here.
        .ok_or_else(|| ApiError::Validation("Username is already taken.".to_string()))?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// log_in
///
/// [Public Route] Verifies credentials and opens a session. On success the
/// opaque session token is returned; on failure the message stays generic so
/// it never reveals whether the username or the password was wrong.
#[utoipa::path(
    post,
    path = "/log_in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 401, description = "Credential mismatch")
    )
)]
pub async fn log_in(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await
        .ok_or(ApiError::CredentialMismatch)?;

    if !password::verify(&payload.password, &user.password_hash) {
        return Err(ApiError::CredentialMismatch);
    }

    let token = state.sessions.create(user.id).await;
    tracing::info!("{} logged in successfully", user.username);

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// log_out
///
/// [Authenticated Route] Revokes the session the request arrived with. The
/// store-level revoke absorbs unknown tokens, but a second request with the
/// same token never reaches this handler: the revoked session no longer
/// authenticates, so the extractor rejects it with 401.
#[utoipa::path(
    delete,
    path = "/log_out",
    responses((status = 204, description = "Session revoked"))
)]
pub async fn log_out(user: CurrentUser, State(state): State<AppState>) -> StatusCode {
    state.sessions.revoke(&user.token).await;
    StatusCode::NO_CONTENT
}

/// get_me
///
/// [Authenticated Route] The caller's own profile, enriched with role and
/// department memberships.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(user: CurrentUser, State(state): State<AppState>) -> Json<UserProfile> {
    let roles = state.repo.roles_for_user(user.id).await;
    let departments = state.repo.departments_for_user(user.id).await;
    Json(UserProfile {
        id: user.id,
        username: user.username,
        roles,
        departments,
    })
}

// --- Note Handlers (Authenticated, Owner-Scoped) ---

/// list_notes
///
/// [Authenticated Route] Lists the caller's own notes, newest first.
#[utoipa::path(
    get,
    path = "/notes",
    responses((status = 200, description = "My notes", body = [Note]))
)]
pub async fn list_notes(
    CurrentUser { id, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Json<Vec<Note>> {
    Json(state.repo.notes_for_user(id).await)
}

/// create_note
///
/// [Authenticated Route] Creates a note owned by the caller. Title presence is
/// the only validation; a failed validation performs zero writes.
#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Created", body = Note),
        (status = 400, description = "Title missing")
    )
)]
pub async fn create_note(
    CurrentUser { id, .. }: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    require_non_empty(&payload.title, "Title is required.")?;

    let note = state
        .repo
        .create_note(id, &payload.title, &payload.body)
        .await
        .ok_or(ApiError::Internal)?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// get_note
///
/// [Authenticated Route] Fetches one of the caller's notes. A note belonging
/// to someone else is indistinguishable from a missing one: 404 either way.
#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(("id" = Uuid, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Found", body = Note),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn get_note(
    CurrentUser { id: user_id, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, ApiError> {
    state
        .repo
        .get_note(id, user_id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// update_note
///
/// [Authenticated Route] Replaces the title and body of one of the caller's
/// notes. The owner reference is immutable.
#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(("id" = Uuid, Path, description = "Note ID")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Updated", body = Note),
        (status = 400, description = "Title missing"),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn update_note(
    CurrentUser { id: user_id, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateNoteRequest>,
) -> Result<Json<Note>, ApiError> {
    require_non_empty(&payload.title, "Title is required.")?;

    state
        .repo
        .update_note(id, user_id, &payload.title, &payload.body)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_note
///
/// [Authenticated Route] Deletes one of the caller's notes. The repository
/// query is owner-scoped, so a foreign note affects zero rows and reads as 404.
#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(("id" = Uuid, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn delete_note(
    CurrentUser { id: user_id, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_note(id, user_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- User Handlers (Admin) ---

/// list_users
///
/// [Admin Route] Full user listing. The admin gate has already run as a
/// router layer by the time this executes.
#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users", body = [UserResponse]))
)]
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<UserResponse>> {
    let users = state
        .repo
        .list_users()
        .await
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Json(users)
}

/// create_user
///
/// [Admin Route] Creates a user with no roles and no departments; assignment
/// happens through the update flow.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserResponse),
        (status = 400, description = "Missing field or username taken")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    require_non_empty(&payload.username, "Username is required.")?;
    require_non_empty(&payload.password, "Password is required.")?;

    if state
        .repo
        .get_user_by_username(&payload.username)
        .await
        .is_some()
    {
        return Err(ApiError::Validation("Username is already taken.".to_string()));
    }

    let digest = password::hash(&payload.password).map_err(|e| {
        tracing::error!("password hashing failed: {:?}", e);
        ApiError::Internal
    })?;

    let user = state
        .repo
        .create_user(&payload.username, &digest)
        .await
        .ok_or_else(|| ApiError::Validation("Username is already taken.".to_string()))?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Assembles the admin detail view of a user: current memberships plus the
/// departments not yet assigned (the set difference the edit form renders).
async fn build_user_detail(state: &AppState, id: Uuid, username: String) -> UserDetail {
    let roles = state.repo.roles_for_user(id).await;
    let departments = state.repo.departments_for_user(id).await;
    let all_departments = state.repo.list_departments().await;
    let assignable_departments = difference(&departments, &all_departments);

    UserDetail {
        id,
        username,
        roles,
        departments,
        assignable_departments,
    }
}

/// get_user_detail
///
/// [Admin Route] Single-user view backing the edit form.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserDetail),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDetail>, ApiError> {
    let user = state.repo.get_user(id).await.ok_or(ApiError::NotFound)?;
    Ok(Json(build_user_detail(&state, user.id, user.username).await))
}

/// update_user
///
/// [Admin Route] The combined update flow: rename plus optional role and/or
/// department assignment in one request.
///
/// The submitted selection drives a four-state machine
/// (`NoChange | RoleOnly | DepartmentOnly | Both`): each selected edge is
/// committed exactly once. Every referenced entity is resolved *before* any
/// mutation, so a missing role or department aborts with 404 and zero writes.
/// Duplicate assignments are absorbed by the idempotent edge insert, making
/// it safe to re-submit the same form.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserDetail),
        (status = 400, description = "Missing field or username taken"),
        (status = 404, description = "User, role, or department not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserDetail>, ApiError> {
    require_non_empty(&payload.username, "Username is required.")?;

    let user = state.repo.get_user(id).await.ok_or(ApiError::NotFound)?;

    // Renaming onto another user's name is recoverable, not a constraint blowup.
    if payload.username != user.username
        && state
            .repo
            .get_user_by_username(&payload.username)
            .await
            .is_some()
    {
        return Err(ApiError::Validation("Username is already taken.".to_string()));
    }

    let selection =
        MembershipSelection::from_submitted(payload.role_id, payload.department_id);

    // Resolve everything the selection references before mutating anything.
    if let Some(role_id) = selection.role() {
        state.repo.get_role(role_id).await.ok_or(ApiError::NotFound)?;
    }
    if let Some(department_id) = selection.department() {
        state
            .repo
            .get_department(department_id)
            .await
            .ok_or(ApiError::NotFound)?;
    }

    let updated = state
        .repo
        .update_username(id, &payload.username)
        .await
        .ok_or(ApiError::NotFound)?;

    if let Some(role_id) = selection.role() {
        state.repo.add_role(id, role_id).await;
    }
    if let Some(department_id) = selection.department() {
        state.repo.add_department(id, department_id).await;
    }

    Ok(Json(
        build_user_detail(&state, updated.id, updated.username).await,
    ))
}

// --- Role Handlers (Admin) ---

/// list_roles
///
/// [Admin Route] Lists every role.
#[utoipa::path(
    get,
    path = "/roles",
    responses((status = 200, description = "All roles", body = [Role]))
)]
pub async fn list_roles(State(state): State<AppState>) -> Json<Vec<Role>> {
    Json(state.repo.list_roles().await)
}

/// create_role
///
/// [Admin Route] Creates a role with a globally unique name.
#[utoipa::path(
    post,
    path = "/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Created", body = Role),
        (status = 400, description = "Missing field or name taken")
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    require_non_empty(&payload.name, "Name is required.")?;

    if state.repo.get_role_by_name(&payload.name).await.is_some() {
        return Err(ApiError::Validation("Name is already taken.".to_string()));
    }

    let role = state
        .repo
        .create_role(&payload.name)
        .await
        .ok_or_else(|| ApiError::Validation("Name is already taken.".to_string()))?;

    Ok((StatusCode::CREATED, Json(role)))
}

/// get_role_detail
///
/// [Admin Route] A role and its current members.
#[utoipa::path(
    get,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Found", body = RoleDetail),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_role_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleDetail>, ApiError> {
    let role = state.repo.get_role(id).await.ok_or(ApiError::NotFound)?;
    let members = state
        .repo
        .members_of_role(id)
        .await
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(RoleDetail {
        id: role.id,
        name: role.name,
        members,
    }))
}

/// update_role
///
/// [Admin Route] Renames a role and optionally attaches a member in the same
/// request (`member_id`, absence meaning "rename only"). The member, when
/// given, is resolved before any write; the attach is idempotent.
#[utoipa::path(
    put,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated", body = RoleDetail),
        (status = 400, description = "Missing field or name taken"),
        (status = 404, description = "Role or member not found")
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<RoleDetail>, ApiError> {
    require_non_empty(&payload.name, "Name is required.")?;

    let role = state.repo.get_role(id).await.ok_or(ApiError::NotFound)?;

    if payload.name != role.name
        && state.repo.get_role_by_name(&payload.name).await.is_some()
    {
        return Err(ApiError::Validation("Name is already taken.".to_string()));
    }

    if let Some(member_id) = payload.member_id {
        state.repo.get_user(member_id).await.ok_or(ApiError::NotFound)?;
    }

    let renamed = state
        .repo
        .rename_role(id, &payload.name)
        .await
        .ok_or(ApiError::NotFound)?;

    if let Some(member_id) = payload.member_id {
        state.repo.add_role(member_id, id).await;
    }

    let members = state
        .repo
        .members_of_role(id)
        .await
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(RoleDetail {
        id: renamed.id,
        name: renamed.name,
        members,
    }))
}

/// delete_role
///
/// [Admin Route] Deletes a role. Its membership edges cascade with it, so no
/// edge can dangle against an absent role.
#[utoipa::path(
    delete,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_role(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// remove_role_member
///
/// [Admin Route] Removes a single (user, role) edge — the explicit removal
/// operation, deliberately separate from the assignment flows. Both endpoints
/// of the edge are resolved first; an edge that does not exist ("not a
/// member") is 404, with nothing mutated.
#[utoipa::path(
    delete,
    path = "/roles/{id}/members/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Role ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Edge removed"),
        (status = 404, description = "Role, user, or membership not found")
    )
)]
pub async fn remove_role_member(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let role = state.repo.get_role(id).await.ok_or(ApiError::NotFound)?;
    let user = state.repo.get_user(user_id).await.ok_or(ApiError::NotFound)?;

    if state.repo.remove_role(user_id, id).await {
        tracing::info!("removed role '{}' from user '{}'", role.name, user.username);
        Ok(StatusCode::NO_CONTENT)
    } else {
        // The edge was never there: not a member.
        Err(ApiError::NotFound)
    }
}

// --- Department Handlers (Admin) ---

/// list_departments
///
/// [Admin Route] Lists every department.
#[utoipa::path(
    get,
    path = "/departments",
    responses((status = 200, description = "All departments", body = [Department]))
)]
pub async fn list_departments(State(state): State<AppState>) -> Json<Vec<Department>> {
    Json(state.repo.list_departments().await)
}

/// create_department
///
/// [Admin Route] Creates a department with a globally unique title.
#[utoipa::path(
    post,
    path = "/departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Created", body = Department),
        (status = 400, description = "Missing field or title taken")
    )
)]
pub async fn create_department(
    State(state): State<AppState>,
    Json(payload): Json<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<Department>), ApiError> {
    require_non_empty(&payload.title, "Title is required.")?;

    if state
        .repo
        .get_department_by_title(&payload.title)
        .await
        .is_some()
    {
        return Err(ApiError::Validation("Title is already taken.".to_string()));
    }

    let department = state
        .repo
        .create_department(&payload.title)
        .await
        .ok_or_else(|| ApiError::Validation("Title is already taken.".to_string()))?;

    Ok((StatusCode::CREATED, Json(department)))
}

/// get_department_detail
///
/// [Admin Route] A department and its current members.
#[utoipa::path(
    get,
    path = "/departments/{id}",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Found", body = DepartmentDetail),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_department_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DepartmentDetail>, ApiError> {
    let department = state.repo.get_department(id).await.ok_or(ApiError::NotFound)?;
    let members = state
        .repo
        .members_of_department(id)
        .await
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(DepartmentDetail {
        id: department.id,
        title: department.title,
        members,
    }))
}

/// update_department
///
/// [Admin Route] Renames a department and optionally attaches a member,
/// symmetric to `update_role`.
#[utoipa::path(
    put,
    path = "/departments/{id}",
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Updated", body = DepartmentDetail),
        (status = 400, description = "Missing field or title taken"),
        (status = 404, description = "Department or member not found")
    )
)]
pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDepartmentRequest>,
) -> Result<Json<DepartmentDetail>, ApiError> {
    require_non_empty(&payload.title, "Title is required.")?;

    let department = state.repo.get_department(id).await.ok_or(ApiError::NotFound)?;

    if payload.title != department.title
        && state
            .repo
            .get_department_by_title(&payload.title)
            .await
            .is_some()
    {
        return Err(ApiError::Validation("Title is already taken.".to_string()));
    }

    if let Some(member_id) = payload.member_id {
        state.repo.get_user(member_id).await.ok_or(ApiError::NotFound)?;
    }

    let renamed = state
        .repo
        .rename_department(id, &payload.title)
        .await
        .ok_or(ApiError::NotFound)?;

    if let Some(member_id) = payload.member_id {
        state.repo.add_department(member_id, id).await;
    }

    let members = state
        .repo
        .members_of_department(id)
        .await
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(DepartmentDetail {
        id: renamed.id,
        title: renamed.title,
        members,
    }))
}

/// delete_department
///
/// [Admin Route] Deletes a department; its membership edges cascade.
#[utoipa::path(
    delete,
    path = "/departments/{id}",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_department(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// remove_department_member
///
/// [Admin Route] Removes a single (user, department) edge; symmetric to
/// `remove_role_member`.
#[utoipa::path(
    delete,
    path = "/departments/{id}/members/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Department ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Edge removed"),
        (status = 404, description = "Department, user, or membership not found")
    )
)]
pub async fn remove_department_member(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let department = state.repo.get_department(id).await.ok_or(ApiError::NotFound)?;
    let user = state.repo.get_user(user_id).await.ok_or(ApiError::NotFound)?;

    if state.repo.remove_department(user_id, id).await {
        tracing::info!(
            "removed department '{}' from user '{}'",
            department.title,
            user.username
        );
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
