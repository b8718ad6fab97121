//! Error kinds returned by category operations.

use crate::model::CategoryId;
use std::fmt;

/// A request that cannot be accepted as-is; the caller can correct and resubmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Trimmed name is shorter than the configured minimum
    NameTooShort { min: usize, actual: usize },
    /// Slug is empty after normalization, or an explicit slug is malformed
    InvalidSlug(String),
    /// A sibling under the same parent already uses this slug
    SlugCollision { slug: String, parent_id: Option<CategoryId> },
    /// Placing the node (and its subtree) would create levels beyond the maximum
    MaxDepthExceeded { max_depth: usize, required: usize },
    /// Destination is the node itself or one of its descendants
    Cycle { id: CategoryId, new_parent_id: CategoryId },
    /// Document reassignment target lies inside the subtree being deleted
    InvalidReassignmentTarget(CategoryId),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NameTooShort { min, actual } => {
                write!(f, "name too short: {actual} characters, minimum is {min}")
            }
            ValidationError::InvalidSlug(slug) => {
                write!(f, "invalid slug: '{slug}'")
            }
            ValidationError::SlugCollision { slug, parent_id } => match parent_id {
                Some(parent) => write!(f, "slug collision: '{slug}' already exists under {parent}"),
                None => write!(f, "slug collision: '{slug}' already exists at the root"),
            },
            ValidationError::MaxDepthExceeded { max_depth, required } => {
                write!(
                    f,
                    "max depth exceeded: placement needs {required} levels, maximum is {max_depth}"
                )
            }
            ValidationError::Cycle { id, new_parent_id } => {
                write!(
                    f,
                    "cannot move {id} under {new_parent_id}: destination is the category itself or one of its descendants"
                )
            }
            ValidationError::InvalidReassignmentTarget(id) => {
                write!(
                    f,
                    "documents cannot be reassigned to {id}: it is removed by the same delete"
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Kind of mutation that was refused by the permission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Rename,
    Move,
    Reorder,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Rename => "rename",
            Action::Move => "move",
            Action::Reorder => "reorder",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Error returned by every [`CategoryService`](crate::service::CategoryService) operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    /// Bad name, slug collision, depth exceeded, cycle
    Validation(ValidationError),
    /// The actor lacks rights on the targeted scope
    PermissionDenied {
        actor: String,
        action: Action,
        category: Option<CategoryId>,
    },
    /// A referenced id does not resolve
    NotFound(CategoryId),
    /// Delete refused under the reject-if-nonempty policy
    NotEmpty {
        id: CategoryId,
        children: usize,
        documents: usize,
    },
    /// The store rejected or failed the write; re-read and reapply
    StorageConflict(String),
    /// Data-integrity fault (corrupted ancestry); not user-correctable
    Internal(String),
}

impl CategoryError {
    /// Only storage conflicts may succeed when the same request is replayed after a re-read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CategoryError::StorageConflict(_))
    }
}

impl fmt::Display for CategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryError::Validation(e) => write!(f, "Validation error: {e}"),
            CategoryError::PermissionDenied {
                actor,
                action,
                category,
            } => match category {
                Some(id) => write!(f, "Permission denied: {actor} may not {action} category {id}"),
                None => write!(f, "Permission denied: {actor} may not {action} categories"),
            },
            CategoryError::NotFound(id) => write!(f, "Category not found: {id}"),
            CategoryError::NotEmpty {
                id,
                children,
                documents,
            } => write!(
                f,
                "Category {id} is not empty: {children} subcategories, {documents} documents"
            ),
            CategoryError::StorageConflict(msg) => write!(f, "Storage conflict: {msg}"),
            CategoryError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for CategoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CategoryError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for CategoryError {
    fn from(err: ValidationError) -> Self {
        CategoryError::Validation(err)
    }
}

/// Error returned by store implementations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Write rejected by a uniqueness constraint or a concurrent writer
    Conflict(String),
    /// No record with this id
    NotFound(CategoryId),
    /// Driver, connection or row decoding failure
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "Write conflict: {msg}"),
            StoreError::NotFound(id) => write!(f, "Record not found: {id}"),
            StoreError::Backend(msg) => write!(f, "Store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for CategoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CategoryError::NotFound(id),
            StoreError::Conflict(msg) => CategoryError::StorageConflict(msg),
            StoreError::Backend(msg) => CategoryError::StorageConflict(msg),
        }
    }
}

/// An ancestor walk exceeded its iteration cap.
///
/// Only reachable with corrupted data (a cycle written out-of-band); moves reject cycles
/// structurally before they reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestryError {
    pub start: CategoryId,
    pub cap: usize,
}

impl fmt::Display for AncestryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ancestor chain of {} exceeds {} hops; parent links are likely cyclic",
            self.start, self.cap
        )
    }
}

impl std::error::Error for AncestryError {}

impl From<AncestryError> for CategoryError {
    fn from(err: AncestryError) -> Self {
        log::error!("Category data-integrity fault: {}", err);
        CategoryError::Internal(err.to_string())
    }
}
