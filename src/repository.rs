use crate::models::{Department, Note, Role, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact with
/// the data layer without knowing the specific implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable and usable across Axum's
/// asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    // Returns None when the INSERT fails (typically a lost uniqueness race);
    // handlers pre-check availability and surface "already taken" before this.
    async fn create_user(&self, username: &str, password_hash: &str) -> Option<User>;
    async fn get_user(&self, id: Uuid) -> Option<User>;
    // Login and uniqueness pre-checks. Case-sensitive, as stored.
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    async fn list_users(&self) -> Vec<User>;
    async fn update_username(&self, id: Uuid, username: &str) -> Option<User>;

    // --- Notes ---
    // Every note query is owner-scoped: a foreign note behaves exactly like a
    // missing one, so existence is never leaked across tenants.
    async fn notes_for_user(&self, user_id: Uuid) -> Vec<Note>;
    async fn get_note(&self, id: Uuid, user_id: Uuid) -> Option<Note>;
    async fn create_note(&self, user_id: Uuid, title: &str, body: &str) -> Option<Note>;
    async fn update_note(&self, id: Uuid, user_id: Uuid, title: &str, body: &str)
    -> Option<Note>;
    async fn delete_note(&self, id: Uuid, user_id: Uuid) -> bool;

    // --- Roles ---
    async fn list_roles(&self) -> Vec<Role>;
    async fn get_role(&self, id: Uuid) -> Option<Role>;
    async fn get_role_by_name(&self, name: &str) -> Option<Role>;
    async fn create_role(&self, name: &str) -> Option<Role>;
    async fn rename_role(&self, id: Uuid, name: &str) -> Option<Role>;
    // Cascades the role's membership edges (FK ON DELETE CASCADE).
    async fn delete_role(&self, id: Uuid) -> bool;

    // --- Departments ---
    async fn list_departments(&self) -> Vec<Department>;
    async fn get_department(&self, id: Uuid) -> Option<Department>;
    async fn get_department_by_title(&self, title: &str) -> Option<Department>;
    async fn create_department(&self, title: &str) -> Option<Department>;
    async fn rename_department(&self, id: Uuid, title: &str) -> Option<Department>;
    async fn delete_department(&self, id: Uuid) -> bool;

    // --- Membership Edges ---
    // Idempotent insert: returns true if a row was inserted, false if the edge
    // already existed (conflict absorbed, never an error).
    async fn add_role(&self, user_id: Uuid, role_id: Uuid) -> bool;
    // Returns false when the edge did not exist ("not a member").
    async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> bool;
    async fn roles_for_user(&self, user_id: Uuid) -> Vec<Role>;
    async fn members_of_role(&self, role_id: Uuid) -> Vec<User>;

    async fn add_department(&self, user_id: Uuid, department_id: Uuid) -> bool;
    async fn remove_department(&self, user_id: Uuid, department_id: Uuid) -> bool;
    async fn departments_for_user(&self, user_id: Uuid) -> Vec<Department>;
    async fn members_of_department(&self, department_id: Uuid) -> Vec<User>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, password_hash, created_at";
const NOTE_COLUMNS: &str = "id, user_id, title, body, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, username: &str, password_hash: &str) -> Option<User> {
        let sql = format!(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                // A unique violation lands here if two sign-ups race past the
                // handler's pre-check; the caller reports "already taken".
                tracing::error!("create_user error: {:?}", e);
                None
            })
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user_by_username error: {:?}", e);
                None
            })
    }

    async fn list_users(&self) -> Vec<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username ASC");
        match sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            }
        }
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Option<User> {
        let sql = format!(
            "UPDATE users SET username = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_username error: {:?}", e);
                None
            })
    }

    // --- NOTES ---

    async fn notes_for_user(&self, user_id: Uuid) -> Vec<Note> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 ORDER BY created_at DESC"
        );
        match sqlx::query_as::<_, Note>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(notes) => notes,
            Err(e) => {
                tracing::error!("notes_for_user error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_note(&self, id: Uuid, user_id: Uuid) -> Option<Note> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_note error: {:?}", e);
                None
            })
    }

    async fn create_note(&self, user_id: Uuid, title: &str, body: &str) -> Option<Note> {
        let sql = format!(
            "INSERT INTO notes (id, user_id, title, body) VALUES ($1, $2, $3, $4) \
             RETURNING {NOTE_COLUMNS}"
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(title)
            .bind(body)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("create_note error: {:?}", e);
                None
            })
    }

    async fn update_note(
        &self,
        id: Uuid,
        user_id: Uuid,
        title: &str,
        body: &str,
    ) -> Option<Note> {
        let sql = format!(
            "UPDATE notes SET title = $3, body = $4, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {NOTE_COLUMNS}"
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(title)
            .bind(body)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_note error: {:?}", e);
                None
            })
    }

    async fn delete_note(&self, id: Uuid, user_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_note error: {:?}", e);
                false
            }
        }
    }

    // --- ROLES ---

    async fn list_roles(&self) -> Vec<Role> {
        match sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
        {
            Ok(roles) => roles,
            Err(e) => {
                tracing::error!("list_roles error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_role(&self, id: Uuid) -> Option<Role> {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_role error: {:?}", e);
                None
            })
    }

    async fn get_role_by_name(&self, name: &str) -> Option<Role> {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_role_by_name error: {:?}", e);
                None
            })
    }

    async fn create_role(&self, name: &str) -> Option<Role> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_role error: {:?}", e);
            None
        })
    }

    async fn rename_role(&self, id: Uuid, name: &str) -> Option<Role> {
        sqlx::query_as::<_, Role>(
            "UPDATE roles SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("rename_role error: {:?}", e);
            None
        })
    }

    async fn delete_role(&self, id: Uuid) -> bool {
        // user_roles rows go with it via ON DELETE CASCADE.
        match sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_role error: {:?}", e);
                false
            }
        }
    }

    // --- DEPARTMENTS ---

    async fn list_departments(&self) -> Vec<Department> {
        match sqlx::query_as::<_, Department>(
            "SELECT id, title FROM departments ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(departments) => departments,
            Err(e) => {
                tracing::error!("list_departments error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_department(&self, id: Uuid) -> Option<Department> {
        sqlx::query_as::<_, Department>("SELECT id, title FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_department error: {:?}", e);
                None
            })
    }

    async fn get_department_by_title(&self, title: &str) -> Option<Department> {
        sqlx::query_as::<_, Department>("SELECT id, title FROM departments WHERE title = $1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_department_by_title error: {:?}", e);
                None
            })
    }

    async fn create_department(&self, title: &str) -> Option<Department> {
        sqlx::query_as::<_, Department>(
            "INSERT INTO departments (id, title) VALUES ($1, $2) RETURNING id, title",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_department error: {:?}", e);
            None
        })
    }

    async fn rename_department(&self, id: Uuid, title: &str) -> Option<Department> {
        sqlx::query_as::<_, Department>(
            "UPDATE departments SET title = $2 WHERE id = $1 RETURNING id, title",
        )
        .bind(id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("rename_department error: {:?}", e);
            None
        })
    }

    async fn delete_department(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_department error: {:?}", e);
                false
            }
        }
    }

    // --- MEMBERSHIP EDGES ---

    /// add_role
    ///
    /// Inserts a (user, role) edge. Uses `ON CONFLICT DO NOTHING` so a duplicate
    /// add is absorbed by the composite primary key rather than erroring — the
    /// idempotence contract. Returns true only if a new row was inserted.
    async fn add_role(&self, user_id: Uuid, role_id: Uuid) -> bool {
        match sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                // A true conflict does not error; only database failures land here.
                tracing::error!("add_role error: {:?}", e);
                false
            }
        }
    }

    async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("remove_role error: {:?}", e);
                false
            }
        }
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Vec<Role> {
        match sqlx::query_as::<_, Role>(
            "SELECT r.id, r.name FROM roles r \
             JOIN user_roles ur ON r.id = ur.role_id \
             WHERE ur.user_id = $1 ORDER BY r.name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(roles) => roles,
            Err(e) => {
                tracing::error!("roles_for_user error: {:?}", e);
                vec![]
            }
        }
    }

    async fn members_of_role(&self, role_id: Uuid) -> Vec<User> {
        match sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.password_hash, u.created_at FROM users u \
             JOIN user_roles ur ON u.id = ur.user_id \
             WHERE ur.role_id = $1 ORDER BY u.username ASC",
        )
            .bind(role_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("members_of_role error: {:?}", e);
                vec![]
            }
        }
    }

    async fn add_department(&self, user_id: Uuid, department_id: Uuid) -> bool {
        match sqlx::query(
            "INSERT INTO user_departments (user_id, department_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(department_id)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("add_department error: {:?}", e);
                false
            }
        }
    }

    async fn remove_department(&self, user_id: Uuid, department_id: Uuid) -> bool {
        match sqlx::query(
            "DELETE FROM user_departments WHERE user_id = $1 AND department_id = $2",
        )
        .bind(user_id)
        .bind(department_id)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("remove_department error: {:?}", e);
                false
            }
        }
    }

    async fn departments_for_user(&self, user_id: Uuid) -> Vec<Department> {
        match sqlx::query_as::<_, Department>(
            "SELECT d.id, d.title FROM departments d \
             JOIN user_departments ud ON d.id = ud.department_id \
             WHERE ud.user_id = $1 ORDER BY d.title ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(departments) => departments,
            Err(e) => {
                tracing::error!("departments_for_user error: {:?}", e);
                vec![]
            }
        }
    }

    async fn members_of_department(&self, department_id: Uuid) -> Vec<User> {
        match sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.password_hash, u.created_at FROM users u \
             JOIN user_departments ud ON u.id = ud.user_id \
             WHERE ud.department_id = $1 ORDER BY u.username ASC",
        )
            .bind(department_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("members_of_department error: {:?}", e);
                vec![]
            }
        }
    }
}
