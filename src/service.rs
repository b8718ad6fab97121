//! Category lifecycle: create, rename, move, reorder and delete, plus the read side.
//!
//! Every operation reads a fresh snapshot from the [`CategoryStore`], validates against
//! it and writes. Nothing is coordinated across calls; a write that loses a race is
//! rejected by the store and surfaces as [`CategoryError::StorageConflict`].

use crate::config::CategoryConfig;
use crate::error::{Action, CategoryError, ValidationError};
use crate::index::CategoryIndex;
use crate::model::{Actor, Category, CategoryId, CategoryNode, CategoryPatch, NewCategory, RenameCategory};
use crate::path;
use crate::permission::{require_delete, require_modify, require_scope};
use crate::slug::{is_valid_slug, slugify};
use crate::store::{CategoryStore, DocumentStore};
use crate::tree::{self, PickerOption, TreeBuilder};
use crate::validator::{Placement, Validator};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// What happens to a non-empty category on delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Fail with `NotEmpty` when the category has subcategories or documents.
    RejectIfNonEmpty,
    /// Remove the whole subtree; its documents move to `reassign_to`
    /// (`None` leaves them uncategorized).
    Cascade { reassign_to: Option<CategoryId> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Removed ids, leaves first; the deleted category is last.
    pub removed: Vec<CategoryId>,
    pub documents_reassigned: usize,
}

/// The category orchestrator over a record store and a document collaborator.
pub struct CategoryService<S, D> {
    store: S,
    documents: D,
    validator: Validator,
}

impl<S: CategoryStore, D: DocumentStore> CategoryService<S, D> {
    pub fn new(store: S, documents: D) -> Self {
        Self::with_config(store, documents, CategoryConfig::default())
    }

    pub fn with_config(store: S, documents: D, config: CategoryConfig) -> Self {
        Self {
            store,
            documents,
            validator: Validator::new(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn config(&self) -> &CategoryConfig {
        self.validator.config()
    }

    /// Create a category under `request.parent_id` (a root when `None`).
    ///
    /// The slug is derived from the trimmed name unless the request pins one. The
    /// department defaults to the parent's. The new category goes last among its
    /// siblings unless the request carries an explicit order.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown parent, `PermissionDenied` when the actor may not write
    /// the parent or the target department, `Validation` for a short name, bad or
    /// colliding slug or exceeded depth, `StorageConflict` when the store rejects the
    /// insert.
    pub fn create_category(&self, actor: &Actor, request: NewCategory) -> Result<Category, CategoryError> {
        self.instrument("create_category", Some(actor), || {
            let snapshot = self.store.list_categories()?;
            let index = CategoryIndex::new(&snapshot);

            let parent = match request.parent_id {
                Some(parent_id) => Some(index.get(parent_id).ok_or(CategoryError::NotFound(parent_id))?),
                None => None,
            };
            let department_id = request
                .department_id
                .clone()
                .or_else(|| parent.and_then(|p| p.department_id.clone()));

            require_modify(actor, Action::Create, parent)?;
            require_scope(actor, Action::Create, department_id.as_ref(), request.parent_id)?;

            let name = request.name.trim().to_string();
            let (slug, slug_pinned) = match &request.slug {
                Some(explicit) => (pinned_slug(explicit)?, true),
                None => (slugify(&name), false),
            };

            self.validator.check_placement(
                &Placement {
                    name: &name,
                    slug: &slug,
                    parent_id: request.parent_id,
                    exclude: None,
                    subtree_height: 0,
                },
                &snapshot,
            )?;

            let now = Utc::now();
            let record = Category {
                id: CategoryId::new(),
                name,
                slug,
                slug_pinned,
                parent_id: request.parent_id,
                department_id,
                order: request.order.unwrap_or_else(|| next_order(&index, request.parent_id)),
                icon: request.icon,
                description: request.description,
                created_at: now,
                updated_at: now,
            };

            let created = self.store.insert(record)?;
            log::info!("{} created category {} ({})", actor, created.id, created.slug);
            Ok(created)
        })
    }

    /// Rename a category and update its description and icon.
    ///
    /// The slug follows the new name unless it is pinned. Renaming to the current
    /// values writes nothing and returns the record unchanged.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, `Validation` (short name, bad or colliding slug),
    /// `StorageConflict`.
    pub fn rename_category(
        &self,
        actor: &Actor,
        id: CategoryId,
        request: RenameCategory,
    ) -> Result<Category, CategoryError> {
        self.instrument("rename_category", Some(actor), || {
            let snapshot = self.store.list_categories()?;
            let current = find(&snapshot, id)?;
            require_modify(actor, Action::Rename, Some(current))?;

            let name = request.name.trim().to_string();
            let (slug, slug_pinned) = match &request.slug {
                Some(explicit) => (pinned_slug(explicit)?, true),
                None if current.slug_pinned && !request.unpin_slug => (current.slug.clone(), true),
                None => (slugify(&name), false),
            };

            self.validator.check_identity(
                &Placement {
                    name: &name,
                    slug: &slug,
                    parent_id: current.parent_id,
                    exclude: Some(id),
                    subtree_height: 0,
                },
                &snapshot,
            )?;

            let mut patch = CategoryPatch::new();
            if name != current.name {
                patch = patch.name(name);
            }
            if slug != current.slug || slug_pinned != current.slug_pinned {
                patch = patch.slug(slug, slug_pinned);
            }
            if let Some(description) = request.description {
                if description != current.description {
                    patch = patch.description(description);
                }
            }
            if let Some(icon) = request.icon {
                if icon != current.icon {
                    patch = patch.icon(icon);
                }
            }

            if patch.is_empty() {
                log::debug!("Rename of {} changes nothing", id);
                return Ok(current.clone());
            }

            let updated = self.store.update(id, &patch)?;
            log::info!("{} renamed category {} to '{}'", actor, id, updated.name);
            Ok(updated)
        })
    }

    /// Reparent a category (and its subtree) under `new_parent_id`, or make it a root.
    ///
    /// The actor needs write access to both the category and the destination. The
    /// node lands last among its new siblings.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown category or destination, `PermissionDenied`,
    /// `Validation` with `Cycle` when the destination is the node or one of its
    /// descendants, `SlugCollision` or `MaxDepthExceeded` (counting the subtree height),
    /// `StorageConflict`.
    pub fn move_category(
        &self,
        actor: &Actor,
        id: CategoryId,
        new_parent_id: Option<CategoryId>,
    ) -> Result<Category, CategoryError> {
        self.instrument("move_category", Some(actor), || {
            let snapshot = self.store.list_categories()?;
            let index = CategoryIndex::new(&snapshot);
            let current = index.get(id).ok_or(CategoryError::NotFound(id))?;
            require_modify(actor, Action::Move, Some(current))?;

            if let Some(parent_id) = new_parent_id {
                let destination = index.get(parent_id).ok_or(CategoryError::NotFound(parent_id))?;
                require_modify(actor, Action::Move, Some(destination))?;

                if parent_id == id || index.descendants(id).iter().any(|c| c.id == parent_id) {
                    return Err(ValidationError::Cycle {
                        id,
                        new_parent_id: parent_id,
                    }
                    .into());
                }
            }

            if new_parent_id == current.parent_id {
                log::debug!("Move of {} keeps its parent", id);
                return Ok(current.clone());
            }

            self.validator.check_placement(
                &Placement {
                    name: &current.name,
                    slug: &current.slug,
                    parent_id: new_parent_id,
                    exclude: Some(id),
                    subtree_height: index.subtree_height(id),
                },
                &snapshot,
            )?;

            let patch = CategoryPatch::new()
                .parent(new_parent_id)
                .order(next_order(&index, new_parent_id));
            let moved = self.store.update(id, &patch)?;
            log::info!(
                "{} moved category {} under {}",
                actor,
                id,
                new_parent_id.map_or_else(|| "the root".to_string(), |p| p.to_string())
            );
            Ok(moved)
        })
    }

    /// Set the sibling position of a category explicitly.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, `StorageConflict`.
    pub fn reorder_category(&self, actor: &Actor, id: CategoryId, order: i32) -> Result<Category, CategoryError> {
        self.instrument("reorder_category", Some(actor), || {
            let snapshot = self.store.list_categories()?;
            let current = find(&snapshot, id)?;
            require_modify(actor, Action::Reorder, Some(current))?;

            if current.order == order {
                return Ok(current.clone());
            }
            let updated = self.store.update(id, &CategoryPatch::new().order(order))?;
            log::info!("{} moved category {} to position {}", actor, id, order);
            Ok(updated)
        })
    }

    /// Delete a category according to `policy`.
    ///
    /// Documents are reassigned before any record is removed, so no document ever
    /// references a missing category. Under `Cascade` the subtree is removed leaves
    /// first.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown category or reassignment target, `PermissionDenied` for
    /// non-administrators, `NotEmpty` under `RejectIfNonEmpty`,
    /// `Validation(InvalidReassignmentTarget)` when the target is inside the deleted
    /// subtree, `StorageConflict`.
    pub fn delete_category(
        &self,
        actor: &Actor,
        id: CategoryId,
        policy: DeletePolicy,
    ) -> Result<DeleteOutcome, CategoryError> {
        self.instrument("delete_category", Some(actor), || {
            let snapshot = self.store.list_categories()?;
            let index = CategoryIndex::new(&snapshot);
            let current = index.get(id).ok_or(CategoryError::NotFound(id))?;
            require_delete(actor, current)?;

            let outcome = match policy {
                DeletePolicy::RejectIfNonEmpty => {
                    let children = index.children_of(Some(id)).len();
                    let documents = self.documents.count_documents_by_category(id)?;
                    if children > 0 || documents > 0 {
                        return Err(CategoryError::NotEmpty {
                            id,
                            children,
                            documents,
                        });
                    }
                    self.store.delete(id)?;
                    DeleteOutcome {
                        removed: vec![id],
                        documents_reassigned: 0,
                    }
                }
                DeletePolicy::Cascade { reassign_to } => {
                    let descendants = index.descendants(id);
                    if let Some(target) = reassign_to {
                        if target == id || descendants.iter().any(|c| c.id == target) {
                            return Err(ValidationError::InvalidReassignmentTarget(target).into());
                        }
                        if !index.contains(target) {
                            return Err(CategoryError::NotFound(target));
                        }
                    }

                    // Breadth-first order reversed: every child precedes its parent.
                    let removal: Vec<CategoryId> = descendants
                        .iter()
                        .rev()
                        .map(|c| c.id)
                        .chain(std::iter::once(id))
                        .collect();

                    let mut documents_reassigned = 0;
                    for category_id in &removal {
                        documents_reassigned += self.documents.reassign_documents(*category_id, reassign_to)?;
                    }
                    for category_id in &removal {
                        self.store.delete(*category_id)?;
                    }
                    DeleteOutcome {
                        removed: removal,
                        documents_reassigned,
                    }
                }
            };

            log::info!(
                "{} deleted category {} ({} record(s), {} document(s) reassigned)",
                actor,
                id,
                outcome.removed.len(),
                outcome.documents_reassigned
            );
            Ok(outcome)
        })
    }

    /// The materialized forest with live document counts.
    ///
    /// # Errors
    ///
    /// `StorageConflict` when either store fails.
    pub fn get_tree(&self) -> Result<Vec<CategoryNode>, CategoryError> {
        self.instrument("get_tree", None, || self.build_tree())
    }

    /// Ancestor names of `id`, root first, joined with the configured separator.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Internal` when the ancestor chain is cyclic.
    pub fn get_breadcrumb(&self, id: CategoryId) -> Result<String, CategoryError> {
        self.instrument("get_breadcrumb", None, || {
            let snapshot = self.store.list_categories()?;
            let config = self.validator.config();
            path::path_of(id, &snapshot, &config.path_separator, config.ancestor_walk_cap)?
                .ok_or(CategoryError::NotFound(id))
        })
    }

    /// Selector rows in display order, for filing a document.
    ///
    /// # Errors
    ///
    /// `StorageConflict` when either store fails.
    pub fn picker_options(&self) -> Result<Vec<PickerOption>, CategoryError> {
        self.instrument("picker_options", None, || {
            let forest = self.build_tree()?;
            Ok(tree::picker_options(&forest, &self.validator.config().path_separator))
        })
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub fn get_category(&self, id: CategoryId) -> Result<Category, CategoryError> {
        let snapshot = self.store.list_categories()?;
        find(&snapshot, id).cloned()
    }

    /// Every record, flat, in store order.
    ///
    /// # Errors
    ///
    /// `StorageConflict` when the store fails.
    pub fn list_categories(&self) -> Result<Vec<Category>, CategoryError> {
        Ok(self.store.list_categories()?)
    }

    /// Resolve a URL slug path such as `["support", "internal-systems"]`.
    ///
    /// # Errors
    ///
    /// `StorageConflict` when the store fails.
    pub fn find_by_slug_path<P: AsRef<str>>(&self, slugs: &[P]) -> Result<Option<Category>, CategoryError> {
        let snapshot = self.store.list_categories()?;
        Ok(path::find_by_slug_path(slugs, &snapshot).cloned())
    }

    fn build_tree(&self) -> Result<Vec<CategoryNode>, CategoryError> {
        let records = self.store.list_categories()?;
        let ids: Vec<CategoryId> = records.iter().map(|c| c.id).collect();
        let counts = self.documents.count_documents_for(&ids)?;
        Ok(TreeBuilder::new(&records, &counts).build())
    }

    fn instrument<T>(
        &self,
        operation: &'static str,
        actor: Option<&Actor>,
        run: impl FnOnce() -> Result<T, CategoryError>,
    ) -> Result<T, CategoryError> {
        #[cfg(feature = "tracing")]
        let span = tracing_helpers::category_operation_span(operation);
        #[cfg(feature = "tracing")]
        if let Some(actor) = actor {
            span.record("actor", tracing::field::display(actor));
        }
        #[cfg(feature = "tracing")]
        let _entered = span.enter();

        let start = Instant::now();
        let result = run();
        let outcome = outcome_label(&result);

        match &result {
            Err(CategoryError::StorageConflict(msg)) => {
                log::warn!("{} hit a storage conflict: {}", operation, msg);
            }
            Err(e) => log::debug!("{} rejected for {:?}: {}", operation, actor.map(|a| a.id.as_str()), e),
            Ok(_) => {}
        }

        #[cfg(feature = "metrics")]
        METRICS.record_operation(operation, outcome, start.elapsed());
        #[cfg(not(feature = "metrics"))]
        let _ = (start, outcome);

        result
    }
}

fn outcome_label<T>(result: &Result<T, CategoryError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(CategoryError::Validation(_)) => "validation",
        Err(CategoryError::PermissionDenied { .. }) => "permission_denied",
        Err(CategoryError::NotFound(_)) => "not_found",
        Err(CategoryError::NotEmpty { .. }) => "not_empty",
        Err(CategoryError::StorageConflict(_)) => "conflict",
        Err(CategoryError::Internal(_)) => "internal",
    }
}

fn find(snapshot: &[Category], id: CategoryId) -> Result<&Category, CategoryError> {
    snapshot
        .iter()
        .find(|c| c.id == id)
        .ok_or(CategoryError::NotFound(id))
}

fn pinned_slug(explicit: &str) -> Result<String, ValidationError> {
    let slug = explicit.trim();
    if is_valid_slug(slug) {
        Ok(slug.to_string())
    } else {
        Err(ValidationError::InvalidSlug(explicit.to_string()))
    }
}

/// One past the highest sibling order, so new and moved nodes land last.
fn next_order(index: &CategoryIndex<'_>, parent_id: Option<CategoryId>) -> i32 {
    index
        .children_of(parent_id)
        .iter()
        .map(|c| c.order)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}
