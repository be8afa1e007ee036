use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use notedesk::{
    AppState,
    auth::CurrentUser,
    config::AppConfig,
    error::ApiError,
    handlers,
    models::{
        CreateNoteRequest, CreateRoleRequest, Department, LoginRequest, Note, Role,
        SignUpRequest, UpdateUserRequest, User,
    },
    password,
    repository::Repository,
    session::{InMemorySessionStore, SessionState},
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// A stateful in-memory repository. Handlers rely on the Repository trait, so
// tests drive real handler logic against this mock and then inspect the state
// behind it (edge sets in particular) to verify what was actually committed.
#[derive(Default)]
struct MockState {
    users: Vec<User>,
    notes: Vec<Note>,
    roles: Vec<Role>,
    departments: Vec<Department>,
    // (user_id, role_id) — a HashSet models the set semantics of the join table.
    role_edges: HashSet<(Uuid, Uuid)>,
    // (user_id, department_id)
    department_edges: HashSet<(Uuid, Uuid)>,
}

pub struct MockRepo {
    state: Mutex<MockState>,
}

impl MockRepo {
    fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    fn role_edge_count(&self) -> usize {
        self.state.lock().unwrap().role_edges.len()
    }

    fn department_edge_count(&self) -> usize {
        self.state.lock().unwrap().department_edges.len()
    }

    fn seed_user(&self, username: &str) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: "unused".to_string(),
            ..User::default()
        };
        let id = user.id;
        self.state.lock().unwrap().users.push(user);
        id
    }

    fn seed_role(&self, name: &str) -> Uuid {
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        let id = role.id;
        self.state.lock().unwrap().roles.push(role);
        id
    }

    fn seed_department(&self, title: &str) -> Uuid {
        let department = Department {
            id: Uuid::new_v4(),
            title: title.to_string(),
        };
        let id = department.id;
        self.state.lock().unwrap().departments.push(department);
        id
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn create_user(&self, username: &str, password_hash: &str) -> Option<User> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.username == username) {
            return None; // Unique index stand-in.
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            ..User::default()
        };
        state.users.push(user.clone());
        Some(user)
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    async fn list_users(&self) -> Vec<User> {
        self.state.lock().unwrap().users.clone()
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Option<User> {
        let mut state = self.state.lock().unwrap();
        let user = state.users.iter_mut().find(|u| u.id == id)?;
        user.username = username.to_string();
        Some(user.clone())
    }

    async fn notes_for_user(&self, user_id: Uuid) -> Vec<Note> {
        self.state
            .lock()
            .unwrap()
            .notes
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn get_note(&self, id: Uuid, user_id: Uuid) -> Option<Note> {
        // Owner-scoped, like the real query.
        self.state
            .lock()
            .unwrap()
            .notes
            .iter()
            .find(|n| n.id == id && n.user_id == user_id)
            .cloned()
    }

    async fn create_note(&self, user_id: Uuid, title: &str, body: &str) -> Option<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            ..Note::default()
        };
        self.state.lock().unwrap().notes.push(note.clone());
        Some(note)
    }

    async fn update_note(
        &self,
        id: Uuid,
        user_id: Uuid,
        title: &str,
        body: &str,
    ) -> Option<Note> {
        let mut state = self.state.lock().unwrap();
        let note = state
            .notes
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)?;
        note.title = title.to_string();
        note.body = body.to_string();
        Some(note.clone())
    }

    async fn delete_note(&self, id: Uuid, user_id: Uuid) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.notes.len();
        state.notes.retain(|n| !(n.id == id && n.user_id == user_id));
        state.notes.len() < before
    }

    async fn list_roles(&self) -> Vec<Role> {
        self.state.lock().unwrap().roles.clone()
    }

    async fn get_role(&self, id: Uuid) -> Option<Role> {
        self.state
            .lock()
            .unwrap()
            .roles
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    async fn get_role_by_name(&self, name: &str) -> Option<Role> {
        self.state
            .lock()
            .unwrap()
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }

    async fn create_role(&self, name: &str) -> Option<Role> {
        let mut state = self.state.lock().unwrap();
        if state.roles.iter().any(|r| r.name == name) {
            return None;
        }
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        state.roles.push(role.clone());
        Some(role)
    }

    async fn rename_role(&self, id: Uuid, name: &str) -> Option<Role> {
        let mut state = self.state.lock().unwrap();
        let role = state.roles.iter_mut().find(|r| r.id == id)?;
        role.name = name.to_string();
        Some(role.clone())
    }

    async fn delete_role(&self, id: Uuid) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.roles.len();
        state.roles.retain(|r| r.id != id);
        // Simulates the foreign-key ON DELETE CASCADE on user_roles.
        state.role_edges.retain(|(_, role_id)| *role_id != id);
        state.roles.len() < before
    }

    async fn list_departments(&self) -> Vec<Department> {
        self.state.lock().unwrap().departments.clone()
    }

    async fn get_department(&self, id: Uuid) -> Option<Department> {
        self.state
            .lock()
            .unwrap()
            .departments
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    async fn get_department_by_title(&self, title: &str) -> Option<Department> {
        self.state
            .lock()
            .unwrap()
            .departments
            .iter()
            .find(|d| d.title == title)
            .cloned()
    }

    async fn create_department(&self, title: &str) -> Option<Department> {
        let mut state = self.state.lock().unwrap();
        if state.departments.iter().any(|d| d.title == title) {
            return None;
        }
        let department = Department {
            id: Uuid::new_v4(),
            title: title.to_string(),
        };
        state.departments.push(department.clone());
        Some(department)
    }

    async fn rename_department(&self, id: Uuid, title: &str) -> Option<Department> {
        let mut state = self.state.lock().unwrap();
        let department = state.departments.iter_mut().find(|d| d.id == id)?;
        department.title = title.to_string();
        Some(department.clone())
    }

    async fn delete_department(&self, id: Uuid) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.departments.len();
        state.departments.retain(|d| d.id != id);
        state
            .department_edges
            .retain(|(_, department_id)| *department_id != id);
        state.departments.len() < before
    }

    async fn add_role(&self, user_id: Uuid, role_id: Uuid) -> bool {
        // HashSet::insert is exactly the idempotent-insert contract.
        self.state.lock().unwrap().role_edges.insert((user_id, role_id))
    }

    async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> bool {
        self.state.lock().unwrap().role_edges.remove(&(user_id, role_id))
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Vec<Role> {
        let state = self.state.lock().unwrap();
        state
            .roles
            .iter()
            .filter(|r| state.role_edges.contains(&(user_id, r.id)))
            .cloned()
            .collect()
    }

    async fn members_of_role(&self, role_id: Uuid) -> Vec<User> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .filter(|u| state.role_edges.contains(&(u.id, role_id)))
            .cloned()
            .collect()
    }

    async fn add_department(&self, user_id: Uuid, department_id: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .department_edges
            .insert((user_id, department_id))
    }

    async fn remove_department(&self, user_id: Uuid, department_id: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .department_edges
            .remove(&(user_id, department_id))
    }

    async fn departments_for_user(&self, user_id: Uuid) -> Vec<Department> {
        let state = self.state.lock().unwrap();
        state
            .departments
            .iter()
            .filter(|d| state.department_edges.contains(&(user_id, d.id)))
            .cloned()
            .collect()
    }

    async fn members_of_department(&self, department_id: Uuid) -> Vec<User> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .filter(|u| state.department_edges.contains(&(u.id, department_id)))
            .cloned()
            .collect()
    }
}

// --- TEST UTILITIES ---

fn create_test_state(repo: Arc<MockRepo>) -> AppState {
    let sessions =
        Arc::new(InMemorySessionStore::new(Duration::from_secs(300))) as SessionState;
    AppState {
        repo,
        sessions,
        config: AppConfig::default(),
    }
}

fn current_user(id: Uuid, username: &str) -> CurrentUser {
    CurrentUser {
        id,
        username: username.to_string(),
        roles: vec![],
        token: "test-token".to_string(),
    }
}

// --- AUTH HANDLER TESTS ---

#[tokio::test]
async fn test_sign_up_requires_username() {
    let repo = Arc::new(MockRepo::new());
    let state = create_test_state(repo);

    let result = handlers::sign_up(
        State(state),
        Json(SignUpRequest {
            username: "".to_string(),
            password: "pw1".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn test_sign_up_rejects_taken_username() {
    let repo = Arc::new(MockRepo::new());
    repo.seed_user("alice");
    let state = create_test_state(repo);

    let result = handlers::sign_up(
        State(state),
        Json(SignUpRequest {
            username: "alice".to_string(),
            password: "pw1".to_string(),
        }),
    )
    .await;

    match result {
        Err(ApiError::Validation(msg)) => assert!(msg.contains("already taken")),
        other => panic!("expected validation error, got {:?}", other.is_ok()),
    }
}

#[tokio::test]
async fn test_sign_up_then_log_in() {
    let repo = Arc::new(MockRepo::new());
    let state = create_test_state(repo);

    let (status, _) = handlers::sign_up(
        State(state.clone()),
        Json(SignUpRequest {
            username: "alice".to_string(),
            password: "pw1".to_string(),
        }),
    )
    .await
    .expect("sign up should succeed");
    assert_eq!(status, StatusCode::CREATED);

    let result = handlers::log_in(
        State(state.clone()),
        Json(LoginRequest {
            username: "alice".to_string(),
            password: "pw1".to_string(),
        }),
    )
    .await
    .expect("log in should succeed");

    // The returned token must resolve through the session store.
    let Json(login) = result;
    assert_eq!(login.user.username, "alice");
    let resolved = state.sessions.resolve(&login.token).await;
    assert_eq!(resolved, Some(login.user.id));
}

#[tokio::test]
async fn test_log_in_wrong_password_is_generic_mismatch() {
    let repo = Arc::new(MockRepo::new());
    let state = create_test_state(repo.clone());

    let digest = password::hash("right").unwrap();
    repo.create_user("alice", &digest).await.unwrap();

    let result = handlers::log_in(
        State(state),
        Json(LoginRequest {
            username: "alice".to_string(),
            password: "wrong".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::CredentialMismatch)));
}

#[tokio::test]
async fn test_log_in_unknown_user_is_same_mismatch() {
    // Unknown username and wrong password must be indistinguishable.
    let repo = Arc::new(MockRepo::new());
    let state = create_test_state(repo);

    let result = handlers::log_in(
        State(state),
        Json(LoginRequest {
            username: "nobody".to_string(),
            password: "pw".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::CredentialMismatch)));
}

// --- NOTE HANDLER TESTS ---

#[tokio::test]
async fn test_create_note_requires_title() {
    let repo = Arc::new(MockRepo::new());
    let alice = repo.seed_user("alice");
    let state = create_test_state(repo.clone());

    let result = handlers::create_note(
        current_user(alice, "alice"),
        State(state),
        Json(CreateNoteRequest {
            title: "  ".to_string(),
            body: "text".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
    // Failed validation performs zero writes.
    assert!(repo.state.lock().unwrap().notes.is_empty());
}

#[tokio::test]
async fn test_foreign_note_reads_as_not_found() {
    let repo = Arc::new(MockRepo::new());
    let alice = repo.seed_user("alice");
    let bob = repo.seed_user("bob");
    let note = repo.create_note(bob, "bob's note", "secret").await.unwrap();
    let state = create_test_state(repo);

    let result = handlers::get_note(
        current_user(alice, "alice"),
        State(state.clone()),
        Path(note.id),
    )
    .await;
    assert!(matches!(result, Err(ApiError::NotFound)));

    let result = handlers::delete_note(
        current_user(alice, "alice"),
        State(state),
        Path(note.id),
    )
    .await;
    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn test_note_lifecycle_for_owner() {
    let repo = Arc::new(MockRepo::new());
    let alice = repo.seed_user("alice");
    let state = create_test_state(repo);

    let (status, Json(note)) = handlers::create_note(
        current_user(alice, "alice"),
        State(state.clone()),
        Json(CreateNoteRequest {
            title: "groceries".to_string(),
            body: "eggs".to_string(),
        }),
    )
    .await
    .expect("create should succeed");
    assert_eq!(status, StatusCode::CREATED);

    let Json(notes) =
        handlers::list_notes(current_user(alice, "alice"), State(state.clone())).await;
    assert_eq!(notes.len(), 1);

    let status = handlers::delete_note(
        current_user(alice, "alice"),
        State(state.clone()),
        Path(note.id),
    )
    .await
    .expect("delete should succeed");
    assert_eq!(status, StatusCode::NO_CONTENT);

    let Json(notes) = handlers::list_notes(current_user(alice, "alice"), State(state)).await;
    assert!(notes.is_empty());
}

// --- COMBINED USER UPDATE (ASSOCIATION MANAGER) TESTS ---

#[tokio::test]
async fn test_update_user_assigns_role_and_department_once() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let admin_role = repo.seed_role("Admin");
    let eng = repo.seed_department("Eng");
    let state = create_test_state(repo.clone());

    let payload = UpdateUserRequest {
        username: "bob".to_string(),
        role_id: Some(admin_role),
        department_id: Some(eng),
    };

    let Json(detail) =
        handlers::update_user(State(state.clone()), Path(bob), Json(payload.clone()))
            .await
            .expect("update should succeed");

    assert_eq!(detail.roles.len(), 1);
    assert_eq!(detail.departments.len(), 1);
    assert_eq!(repo.role_edge_count(), 1);
    assert_eq!(repo.department_edge_count(), 1);

    // Re-running the identical update must not duplicate any edge.
    let Json(detail) = handlers::update_user(State(state), Path(bob), Json(payload))
        .await
        .expect("repeat update should succeed");

    assert_eq!(detail.roles.len(), 1);
    assert_eq!(detail.departments.len(), 1);
    assert_eq!(repo.role_edge_count(), 1);
    assert_eq!(repo.department_edge_count(), 1);
}

#[tokio::test]
async fn test_update_user_no_selection_mutates_no_edges() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let state = create_test_state(repo.clone());

    let Json(detail) = handlers::update_user(
        State(state),
        Path(bob),
        Json(UpdateUserRequest {
            username: "robert".to_string(),
            role_id: None,
            department_id: None,
        }),
    )
    .await
    .expect("rename should succeed");

    assert_eq!(detail.username, "robert");
    assert_eq!(repo.role_edge_count(), 0);
    assert_eq!(repo.department_edge_count(), 0);
}

#[tokio::test]
async fn test_update_user_missing_role_aborts_without_mutation() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let eng = repo.seed_department("Eng");
    let state = create_test_state(repo.clone());

    let result = handlers::update_user(
        State(state),
        Path(bob),
        Json(UpdateUserRequest {
            username: "robert".to_string(),
            role_id: Some(Uuid::new_v4()), // does not exist
            department_id: Some(eng),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::NotFound)));
    // Nothing was committed: no rename, no edges.
    assert_eq!(
        repo.get_user(bob).await.unwrap().username,
        "bob".to_string()
    );
    assert_eq!(repo.department_edge_count(), 0);
}

#[tokio::test]
async fn test_user_detail_lists_assignable_departments() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let eng = repo.seed_department("Eng");
    let _sales = repo.seed_department("Sales");
    repo.add_department(bob, eng).await;
    let state = create_test_state(repo);

    let Json(detail) = handlers::get_user_detail(State(state), Path(bob))
        .await
        .expect("detail should succeed");

    assert_eq!(detail.departments.len(), 1);
    assert_eq!(detail.departments[0].title, "Eng");
    assert_eq!(detail.assignable_departments.len(), 1);
    assert_eq!(detail.assignable_departments[0].title, "Sales");
}

// --- ROLE / MEMBERSHIP TESTS ---

#[tokio::test]
async fn test_create_role_rejects_duplicate_name() {
    let repo = Arc::new(MockRepo::new());
    repo.seed_role("Admin");
    let state = create_test_state(repo);

    let result = handlers::create_role(
        State(state),
        Json(CreateRoleRequest {
            name: "Admin".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn test_remove_role_member_when_not_a_member() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let role = repo.seed_role("Editor");
    let state = create_test_state(repo);

    // Both endpoints exist, but the edge does not.
    let result =
        handlers::remove_role_member(State(state), Path((role, bob))).await;

    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn test_remove_role_member_deletes_edge() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let role = repo.seed_role("Editor");
    repo.add_role(bob, role).await;
    let state = create_test_state(repo.clone());

    let status = handlers::remove_role_member(State(state), Path((role, bob)))
        .await
        .expect("removal should succeed");

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(repo.role_edge_count(), 0);
}

#[tokio::test]
async fn test_delete_role_cascades_membership_edges() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let alice = repo.seed_user("alice");
    let role = repo.seed_role("Editor");
    repo.add_role(bob, role).await;
    repo.add_role(alice, role).await;
    assert_eq!(repo.role_edge_count(), 2);

    let state = create_test_state(repo.clone());
    let status = handlers::delete_role(State(state), Path(role))
        .await
        .expect("delete should succeed");

    assert_eq!(status, StatusCode::NO_CONTENT);
    // No dangling edge may reference an absent role.
    assert_eq!(repo.role_edge_count(), 0);
}

// --- DEPARTMENT / MEMBERSHIP TESTS (symmetric to roles) ---

#[tokio::test]
async fn test_remove_department_member_when_not_a_member() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let department = repo.seed_department("Eng");
    let state = create_test_state(repo);

    let result =
        handlers::remove_department_member(State(state), Path((department, bob))).await;

    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn test_remove_department_member_deletes_edge() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let department = repo.seed_department("Eng");
    repo.add_department(bob, department).await;
    let state = create_test_state(repo.clone());

    let status = handlers::remove_department_member(State(state), Path((department, bob)))
        .await
        .expect("removal should succeed");

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(repo.department_edge_count(), 0);
}

#[tokio::test]
async fn test_delete_department_cascades_membership_edges() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let alice = repo.seed_user("alice");
    let department = repo.seed_department("Eng");
    repo.add_department(bob, department).await;
    repo.add_department(alice, department).await;
    assert_eq!(repo.department_edge_count(), 2);

    let state = create_test_state(repo.clone());
    let status = handlers::delete_department(State(state), Path(department))
        .await
        .expect("delete should succeed");

    assert_eq!(status, StatusCode::NO_CONTENT);
    // No dangling edge may reference an absent department.
    assert_eq!(repo.department_edge_count(), 0);
}

#[tokio::test]
async fn test_update_department_attaches_member_idempotently() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let department = repo.seed_department("Eng");
    let state = create_test_state(repo.clone());

    let payload = notedesk::models::UpdateDepartmentRequest {
        title: "Eng".to_string(),
        member_id: Some(bob),
    };

    let Json(detail) = handlers::update_department(
        State(state.clone()),
        Path(department),
        Json(payload.clone()),
    )
    .await
    .expect("update should succeed");
    assert_eq!(detail.members.len(), 1);

    let Json(detail) =
        handlers::update_department(State(state), Path(department), Json(payload))
            .await
            .expect("repeat update should succeed");
    assert_eq!(detail.members.len(), 1);
    assert_eq!(repo.department_edge_count(), 1);
}

#[tokio::test]
async fn test_update_role_attaches_member_idempotently() {
    let repo = Arc::new(MockRepo::new());
    let bob = repo.seed_user("bob");
    let role = repo.seed_role("Editor");
    let state = create_test_state(repo.clone());

    let payload = notedesk::models::UpdateRoleRequest {
        name: "Editor".to_string(),
        member_id: Some(bob),
    };

    let Json(detail) =
        handlers::update_role(State(state.clone()), Path(role), Json(payload.clone()))
            .await
            .expect("update should succeed");
    assert_eq!(detail.members.len(), 1);

    let Json(detail) = handlers::update_role(State(state), Path(role), Json(payload))
        .await
        .expect("repeat update should succeed");
    assert_eq!(detail.members.len(), 1);
    assert_eq!(repo.role_edge_count(), 1);
}
