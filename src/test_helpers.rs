//! Fixtures shared by the unit tests.

use crate::model::{Category, CategoryId};
use crate::slug::slugify;
use chrono::Utc;

/// A Global category named `name` with a derived slug and order 0.
pub fn category(name: &str, parent_id: Option<CategoryId>) -> Category {
    let now = Utc::now();
    Category {
        id: CategoryId::new(),
        name: name.to_string(),
        slug: slugify(name),
        slug_pinned: false,
        parent_id,
        department_id: None,
        order: 0,
        icon: None,
        description: None,
        created_at: now,
        updated_at: now,
    }
}

/// Categories nested one under the other, root first.
pub fn chain(names: &[&str]) -> Vec<Category> {
    let mut out: Vec<Category> = Vec::with_capacity(names.len());
    for name in names {
        let parent = out.last().map(|c| c.id);
        out.push(category(name, parent));
    }
    out
}
