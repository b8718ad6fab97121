//! Structural invariants checked before any category mutation is accepted.
//!
//! The free functions are pure and independently callable. [`Validator`] binds them to
//! a [`CategoryConfig`] and runs them in the fixed order used for create and move
//! requests: name length, slug, sibling uniqueness, depth. The first failure wins.

use crate::config::CategoryConfig;
use crate::error::{AncestryError, CategoryError, ValidationError};
use crate::index::CategoryIndex;
use crate::model::{Category, CategoryId};

/// Depth a new child of `parent_id` would have (0 when `parent_id` is `None`).
///
/// Walks the ancestor chain upward counting nodes. A link to an unknown id ends the
/// walk as if it were a root. More than `cap` hops aborts the walk.
///
/// # Errors
///
/// Returns `AncestryError` when the chain exceeds `cap` hops (cyclic data).
pub fn depth_of(
    parent_id: Option<CategoryId>,
    all: &[Category],
    cap: usize,
) -> Result<usize, AncestryError> {
    let index = CategoryIndex::new(all);
    depth_in(parent_id, &index, cap)
}

pub(crate) fn depth_in(
    parent_id: Option<CategoryId>,
    index: &CategoryIndex<'_>,
    cap: usize,
) -> Result<usize, AncestryError> {
    Ok(ancestor_chain(parent_id, index, cap)?.len())
}

/// `parent_id` followed by its ancestors, nearest first, as long as they resolve.
///
/// # Errors
///
/// Returns `AncestryError` when more than `cap` nodes are visited.
pub(crate) fn ancestor_chain<'a>(
    start: Option<CategoryId>,
    index: &CategoryIndex<'a>,
    cap: usize,
) -> Result<Vec<&'a Category>, AncestryError> {
    let mut chain = Vec::new();
    let mut cursor = start;
    while let Some(id) = cursor {
        let Some(node) = index.get(id) else {
            break;
        };
        if chain.len() >= cap {
            return Err(AncestryError {
                start: start.unwrap_or(id),
                cap,
            });
        }
        chain.push(node);
        cursor = node.parent_id;
    }
    Ok(chain)
}

/// True iff no category under `parent_id` uses `slug`.
pub fn is_slug_unique(slug: &str, parent_id: Option<CategoryId>, all: &[Category]) -> bool {
    is_slug_unique_excluding(slug, parent_id, all, None)
}

/// Like [`is_slug_unique`], ignoring the record `exclude` (the one being renamed or moved).
pub fn is_slug_unique_excluding(
    slug: &str,
    parent_id: Option<CategoryId>,
    all: &[Category],
    exclude: Option<CategoryId>,
) -> bool {
    !all.iter()
        .any(|c| c.parent_id == parent_id && Some(c.id) != exclude && c.slug == slug)
}

/// True iff a new child of `parent_id` would sit beyond `max_depth` levels.
///
/// # Errors
///
/// Returns `AncestryError` when the ancestor walk exceeds `cap` hops.
pub fn would_exceed_max_depth(
    parent_id: Option<CategoryId>,
    all: &[Category],
    max_depth: usize,
    cap: usize,
) -> Result<bool, AncestryError> {
    Ok(depth_of(parent_id, all, cap)? + 1 > max_depth)
}

/// Whether `candidate` is `id` or lies anywhere below it.
pub fn is_self_or_descendant(candidate: CategoryId, id: CategoryId, all: &[Category]) -> bool {
    if candidate == id {
        return true;
    }
    let index = CategoryIndex::new(all);
    index.descendants(id).iter().any(|c| c.id == candidate)
}

/// A placement to validate: where a (possibly existing) node with `name`/`slug` goes.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'r> {
    pub name: &'r str,
    pub slug: &'r str,
    pub parent_id: Option<CategoryId>,
    /// The record itself, when it already exists (rename or move)
    pub exclude: Option<CategoryId>,
    /// Height of the subtree travelling with the node (0 for a new category)
    pub subtree_height: usize,
}

/// Invariant checks bound to configured limits.
#[derive(Debug, Clone)]
pub struct Validator {
    config: CategoryConfig,
}

impl Validator {
    pub fn new(config: CategoryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CategoryConfig {
        &self.config
    }

    /// Name length check on the trimmed name, in characters.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NameTooShort` below `min_name_length`.
    pub fn check_name(&self, name: &str) -> Result<(), ValidationError> {
        let actual = name.trim().chars().count();
        if actual < self.config.min_name_length {
            return Err(ValidationError::NameTooShort {
                min: self.config.min_name_length,
                actual,
            });
        }
        Ok(())
    }

    /// Run every check for `placement` against the snapshot `all`, failing fast.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError::Validation` for the first failing check, or
    /// `CategoryError::Internal` when the ancestor walk detects corrupted data.
    pub fn check_placement(
        &self,
        placement: &Placement<'_>,
        all: &[Category],
    ) -> Result<(), CategoryError> {
        self.check_identity(placement, all)?;

        let index = CategoryIndex::new(all);
        let depth = depth_in(placement.parent_id, &index, self.config.ancestor_walk_cap)?;
        // Levels used once the node lands: its own depth plus everything travelling below it.
        let required = depth + placement.subtree_height + 1;
        if required > self.config.max_depth {
            return Err(ValidationError::MaxDepthExceeded {
                max_depth: self.config.max_depth,
                required,
            }
            .into());
        }
        Ok(())
    }

    /// Name, slug and sibling uniqueness checks, without the depth bound.
    ///
    /// Renames use this directly: they never change where a node sits.
    ///
    /// # Errors
    ///
    /// Returns the first failing `ValidationError`.
    pub fn check_identity(
        &self,
        placement: &Placement<'_>,
        all: &[Category],
    ) -> Result<(), ValidationError> {
        self.check_name(placement.name)?;

        if placement.slug.is_empty() {
            return Err(ValidationError::InvalidSlug(placement.slug.to_string()));
        }

        if !is_slug_unique_excluding(placement.slug, placement.parent_id, all, placement.exclude) {
            return Err(ValidationError::SlugCollision {
                slug: placement.slug.to_string(),
                parent_id: placement.parent_id,
            });
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(CategoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{category, chain};

    #[test]
    fn test_depth_of_root_and_chain() {
        let nodes = chain(&["Level Zero", "Level One", "Level Two"]);
        assert_eq!(depth_of(None, &nodes, 10).unwrap(), 0);
        assert_eq!(depth_of(Some(nodes[0].id), &nodes, 10).unwrap(), 1);
        assert_eq!(depth_of(Some(nodes[2].id), &nodes, 10).unwrap(), 3);
    }

    #[test]
    fn test_depth_of_dangling_parent_counts_as_root() {
        let orphan = category("Orphan", Some(CategoryId::new()));
        let all = vec![orphan.clone()];
        assert_eq!(depth_of(Some(orphan.id), &all, 10).unwrap(), 1);
    }

    #[test]
    fn test_depth_of_aborts_on_cycle() {
        let mut a = category("Alpha", None);
        let b = category("Beta", Some(a.id));
        a.parent_id = Some(b.id);
        let all = vec![a.clone(), b];
        let err = depth_of(Some(a.id), &all, 10).unwrap_err();
        assert_eq!(err.cap, 10);
        assert_eq!(err.start, a.id);
    }

    #[test]
    fn test_slug_uniqueness_is_per_parent() {
        let root = category("Support", None);
        let child = category("Support", Some(root.id));
        let all = vec![root.clone(), child.clone()];

        assert!(!is_slug_unique("support", None, &all));
        assert!(!is_slug_unique("support", Some(root.id), &all));
        assert!(is_slug_unique("support", Some(child.id), &all));
        assert!(is_slug_unique_excluding("support", None, &all, Some(root.id)));
    }

    #[test]
    fn test_would_exceed_max_depth() {
        let nodes = chain(&["Level Zero", "Level One", "Level Two", "Level Three", "Level Four"]);
        assert!(!would_exceed_max_depth(Some(nodes[3].id), &nodes, 5, 10).unwrap());
        assert!(would_exceed_max_depth(Some(nodes[4].id), &nodes, 5, 10).unwrap());
        assert!(!would_exceed_max_depth(None, &nodes, 5, 10).unwrap());
    }

    #[test]
    fn test_is_self_or_descendant() {
        let nodes = chain(&["Level Zero", "Level One", "Level Two"]);
        assert!(is_self_or_descendant(nodes[0].id, nodes[0].id, &nodes));
        assert!(is_self_or_descendant(nodes[2].id, nodes[0].id, &nodes));
        assert!(!is_self_or_descendant(nodes[0].id, nodes[2].id, &nodes));
    }

    #[test]
    fn test_check_placement_order_is_fail_fast() {
        let validator = Validator::default();
        let existing = category("Support", None);
        let all = vec![existing];

        // Short name is reported before the slug collision it also has
        let placement = Placement {
            name: "Su",
            slug: "support",
            parent_id: None,
            exclude: None,
            subtree_height: 0,
        };
        assert!(matches!(
            validator.check_placement(&placement, &all),
            Err(CategoryError::Validation(ValidationError::NameTooShort { min: 3, actual: 2 }))
        ));

        let placement = Placement {
            name: "Support ",
            slug: "support",
            ..placement
        };
        assert!(matches!(
            validator.check_placement(&placement, &all),
            Err(CategoryError::Validation(ValidationError::SlugCollision { .. }))
        ));
    }

    #[test]
    fn test_check_placement_rejects_empty_slug() {
        let validator = Validator::default();
        let placement = Placement {
            name: "???",
            slug: "",
            parent_id: None,
            exclude: None,
            subtree_height: 0,
        };
        assert!(matches!(
            validator.check_placement(&placement, &[]),
            Err(CategoryError::Validation(ValidationError::InvalidSlug(_)))
        ));
    }

    #[test]
    fn test_check_placement_accounts_for_subtree_height() {
        let validator = Validator::default();
        let nodes = chain(&["Level Zero", "Level One", "Level Two"]);
        let placement = Placement {
            name: "Mover",
            slug: "mover",
            parent_id: Some(nodes[2].id),
            exclude: None,
            subtree_height: 0,
        };
        assert!(validator.check_placement(&placement, &nodes).is_ok());

        let tall = Placement {
            subtree_height: 1,
            ..placement
        };
        assert!(validator.check_placement(&tall, &nodes).is_ok());

        let taller = Placement {
            subtree_height: 2,
            ..placement
        };
        assert!(matches!(
            validator.check_placement(&taller, &nodes),
            Err(CategoryError::Validation(ValidationError::MaxDepthExceeded { max_depth: 5, required: 6 }))
        ));
    }

    #[test]
    fn test_check_name_counts_characters_not_bytes() {
        let validator = Validator::default();
        assert!(validator.check_name("Çäö").is_ok());
        assert!(validator.check_name("  ab  ").is_err());
    }
}
