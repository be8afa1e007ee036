use std::collections::HashSet;
use std::hash::Hash;
use uuid::Uuid;

/// difference
///
/// Returns the elements of `universe` not present in `owned`. Both inputs are
/// treated as unordered sets: the result contains no duplicates and is the
/// same set for any permutation of either input. Output order follows
/// `universe` so rendered candidate lists stay stable.
///
/// Used to present "assignable" candidates, e.g. the departments a user does
/// not belong to yet.
pub fn difference<T>(owned: &[T], universe: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let owned_set: HashSet<&T> = owned.iter().collect();
    let mut seen: HashSet<&T> = HashSet::new();
    universe
        .iter()
        .filter(|item| !owned_set.contains(*item) && seen.insert(*item))
        .cloned()
        .collect()
}

/// MembershipSelection
///
/// The state machine behind the combined "assign role and/or department"
/// user update. Which of the submitted identifiers are present selects the
/// state; each assignment state commits its corresponding edge insert exactly
/// once. Removal never happens through this flow — it is a separate, explicit
/// operation on the membership routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipSelection {
    /// Neither field submitted: a plain rename, no edge mutation.
    NoChange,
    /// Only a role selected.
    RoleOnly(Uuid),
    /// Only a department selected.
    DepartmentOnly(Uuid),
    /// Both selected; both edges are committed.
    Both {
        role_id: Uuid,
        department_id: Uuid,
    },
}

impl MembershipSelection {
    /// Classifies the optional submitted identifiers. `None` is the absence
    /// marker — there is no sentinel value that could collide with a real
    /// entity name.
    pub fn from_submitted(role_id: Option<Uuid>, department_id: Option<Uuid>) -> Self {
        match (role_id, department_id) {
            (None, None) => MembershipSelection::NoChange,
            (Some(role_id), None) => MembershipSelection::RoleOnly(role_id),
            (None, Some(department_id)) => MembershipSelection::DepartmentOnly(department_id),
            (Some(role_id), Some(department_id)) => MembershipSelection::Both {
                role_id,
                department_id,
            },
        }
    }

    /// The role to assign, if this state carries one.
    pub fn role(&self) -> Option<Uuid> {
        match self {
            MembershipSelection::RoleOnly(role_id)
            | MembershipSelection::Both { role_id, .. } => Some(*role_id),
            _ => None,
        }
    }

    /// The department to assign, if this state carries one.
    pub fn department(&self) -> Option<Uuid> {
        match self {
            MembershipSelection::DepartmentOnly(department_id)
            | MembershipSelection::Both { department_id, .. } => Some(*department_id),
            _ => None,
        }
    }
}
