//! Category records and the request/patch types that mutate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, stable identifier of a category. Assigned at creation, never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(Uuid);

impl CategoryId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CategoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Department scope tag restricting non-administrator writes.
///
/// The "Global" scope is represented by the absence of a department
/// (`Option<DepartmentId>::None`), never by a `DepartmentId` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(String);

impl DepartmentId {
    /// Sentinel label used by callers for "no department".
    pub const GLOBAL: &'static str = "Global";

    /// Parse a department label, mapping blank input and the "Global" sentinel to `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use docwiki::model::DepartmentId;
    ///
    /// assert_eq!(DepartmentId::parse("TI").map(|d| d.to_string()), Some("TI".to_string()));
    /// assert!(DepartmentId::parse("global").is_none());
    /// assert!(DepartmentId::parse("  ").is_none());
    /// ```
    pub fn parse(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::GLOBAL) {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A flat category record, as held by a [`CategoryStore`](crate::store::CategoryStore).
///
/// Children and document counts are not part of the record; they only exist on
/// [`CategoryNode`] in a materialized tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    /// When set, renames keep `slug` instead of re-deriving it from `name`.
    #[serde(default)]
    pub slug_pinned: bool,
    pub parent_id: Option<CategoryId>,
    pub department_id: Option<DepartmentId>,
    /// Primary sibling sort key.
    pub order: i32,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Apply a patch in place and stamp `updated_at`.
    pub fn apply(&mut self, patch: &CategoryPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(slug) = &patch.slug {
            self.slug = slug.clone();
        }
        if let Some(pinned) = patch.slug_pinned {
            self.slug_pinned = pinned;
        }
        if let Some(parent_id) = patch.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(department_id) = &patch.department_id {
            self.department_id = department_id.clone();
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(icon) = &patch.icon {
            self.icon = icon.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update of a category record.
///
/// Outer `None` leaves a field untouched; for nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub slug_pinned: Option<bool>,
    pub parent_id: Option<Option<CategoryId>>,
    pub department_id: Option<Option<DepartmentId>>,
    pub order: Option<i32>,
    pub icon: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

impl CategoryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn slug(mut self, slug: impl Into<String>, pinned: bool) -> Self {
        self.slug = Some(slug.into());
        self.slug_pinned = Some(pinned);
        self
    }

    pub fn parent(mut self, parent_id: Option<CategoryId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn icon(mut self, icon: Option<String>) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// True when applying the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Creation request handled by [`CategoryService::create_category`](crate::service::CategoryService::create_category).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<CategoryId>,
    /// Explicit department; `None` inherits the parent's department (roots become Global).
    pub department_id: Option<DepartmentId>,
    pub icon: Option<String>,
    pub description: Option<String>,
    /// Explicit slug, pinned against later renames.
    pub slug: Option<String>,
    /// Explicit sibling position; defaults to last.
    pub order: Option<i32>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn under(mut self, parent_id: CategoryId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn in_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn at_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
}

/// Rename request handled by [`CategoryService::rename_category`](crate::service::CategoryService::rename_category).
///
/// `description` and `icon` follow the patch convention: `None` keeps the current
/// value, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameCategory {
    pub name: String,
    pub description: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    /// Pin a new explicit slug.
    pub slug: Option<String>,
    /// Drop an existing pin and derive the slug from `name` again.
    #[serde(default)]
    pub unpin_slug: bool,
}

impl RenameCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn unpinned(mut self) -> Self {
        self.unpin_slug = true;
        self
    }
}

/// A category in a materialized tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    /// Documents filed directly under this category (not transitive).
    pub doc_count: usize,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn id(&self) -> CategoryId {
        self.category.id
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::subtree_len).sum::<usize>()
    }

    /// Depth-first search for a node by id within this subtree.
    pub fn find(&self, id: CategoryId) -> Option<&CategoryNode> {
        if self.category.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}
