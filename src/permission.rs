//! Permission gate for category mutations.
//!
//! Reads are never restricted. Writes depend on the actor's [`Role`] and on the
//! department scope of the category being touched:
//!
//! | Role          | Global scope | Own department | Other department |
//! |---------------|--------------|----------------|------------------|
//! | Administrator | yes          | yes            | yes              |
//! | Editor        | yes          | yes            | no               |
//! | Reader        | no           | no             | no               |
//!
//! Deletion is reserved to administrators regardless of scope.

use crate::error::{Action, CategoryError};
use crate::model::{Actor, Category, CategoryId, DepartmentId, Role};

/// Whether `actor` may modify `target`.
///
/// With `target == None` (creation at the root, before the concrete scope is known)
/// any actor with write privilege passes; the caller must then check the scope the
/// new record will carry with [`can_modify_scope`].
pub fn can_modify(actor: &Actor, target: Option<&Category>) -> bool {
    match target {
        Some(category) => can_modify_scope(actor, category.department_id.as_ref()),
        None => actor.role != Role::Reader,
    }
}

/// Whether `actor` may write into a department scope (`None` is Global).
pub fn can_modify_scope(actor: &Actor, department: Option<&DepartmentId>) -> bool {
    match actor.role {
        Role::Administrator => true,
        Role::Reader => false,
        Role::Editor => match department {
            None => true,
            Some(scope) => actor.department.as_ref() == Some(scope),
        },
    }
}

/// Whether `actor` may delete categories.
pub fn can_delete(actor: &Actor) -> bool {
    actor.is_administrator()
}

/// [`can_modify`] as a `Result`, for use with `?` ahead of a mutation.
///
/// # Errors
///
/// Returns `CategoryError::PermissionDenied` naming the actor, action and category.
pub fn require_modify(
    actor: &Actor,
    action: Action,
    target: Option<&Category>,
) -> Result<(), CategoryError> {
    if can_modify(actor, target) {
        Ok(())
    } else {
        Err(denied(actor, action, target.map(|c| c.id)))
    }
}

/// [`can_modify_scope`] as a `Result`.
///
/// # Errors
///
/// Returns `CategoryError::PermissionDenied` when the scope is not writable by `actor`.
pub fn require_scope(
    actor: &Actor,
    action: Action,
    department: Option<&DepartmentId>,
    category: Option<CategoryId>,
) -> Result<(), CategoryError> {
    if can_modify_scope(actor, department) {
        Ok(())
    } else {
        Err(denied(actor, action, category))
    }
}

/// [`can_delete`] as a `Result`.
///
/// # Errors
///
/// Returns `CategoryError::PermissionDenied` for every non-administrator.
pub fn require_delete(actor: &Actor, target: &Category) -> Result<(), CategoryError> {
    if can_delete(actor) {
        Ok(())
    } else {
        Err(denied(actor, Action::Delete, Some(target.id)))
    }
}

fn denied(actor: &Actor, action: Action, category: Option<CategoryId>) -> CategoryError {
    log::debug!("Denied {} on {:?} for {}", action, category, actor);
    CategoryError::PermissionDenied {
        actor: actor.to_string(),
        action,
        category,
    }
}
