//! Category data model.
//!
//! Records are stored flat (one row per category, linked by `parent_id`). The nested
//! view is produced on read by [`crate::tree::TreeBuilder`].

mod actor;
mod category;

pub use actor::{Actor, Role};
pub use category::{
    Category, CategoryId, CategoryNode, CategoryPatch, DepartmentId, NewCategory, RenameCategory,
};
