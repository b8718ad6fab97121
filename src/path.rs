//! Breadcrumbs and slug-path lookups.

use crate::error::AncestryError;
use crate::index::CategoryIndex;
use crate::model::{Category, CategoryId};
use crate::validator::ancestor_chain;

/// Names from the root down to `id`, or `None` when `id` is unknown.
///
/// # Errors
///
/// Returns `AncestryError` when the walk exceeds `cap` hops.
pub fn segments_of(
    id: CategoryId,
    all: &[Category],
    cap: usize,
) -> Result<Option<Vec<String>>, AncestryError> {
    let index = CategoryIndex::new(all);
    segments_in(id, &index, cap)
}

pub(crate) fn segments_in(
    id: CategoryId,
    index: &CategoryIndex<'_>,
    cap: usize,
) -> Result<Option<Vec<String>>, AncestryError> {
    if !index.contains(id) {
        return Ok(None);
    }
    let mut names: Vec<String> = ancestor_chain(Some(id), index, cap)?
        .into_iter()
        .map(|c| c.name.clone())
        .collect();
    names.reverse();
    Ok(Some(names))
}

/// Breadcrumb for `id`: ancestor names joined root-to-leaf with `separator`.
///
/// Returns `Ok(None)` when `id` does not resolve.
///
/// # Errors
///
/// Returns `AncestryError` when the walk exceeds `cap` hops.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use docwiki::model::{Category, CategoryId};
/// use docwiki::path::path_of;
///
/// let now = Utc::now();
/// let support = Category {
///     id: CategoryId::new(),
///     name: "Support".into(),
///     slug: "support".into(),
///     slug_pinned: false,
///     parent_id: None,
///     department_id: None,
///     order: 0,
///     icon: None,
///     description: None,
///     created_at: now,
///     updated_at: now,
/// };
/// let internal = Category {
///     id: CategoryId::new(),
///     name: "Internal Systems".into(),
///     slug: "internal-systems".into(),
///     parent_id: Some(support.id),
///     ..support.clone()
/// };
/// let all = vec![support, internal.clone()];
/// let crumb = path_of(internal.id, &all, " > ", 10).unwrap();
/// assert_eq!(crumb.as_deref(), Some("Support > Internal Systems"));
/// ```
pub fn path_of(
    id: CategoryId,
    all: &[Category],
    separator: &str,
    cap: usize,
) -> Result<Option<String>, AncestryError> {
    Ok(segments_of(id, all, cap)?.map(|names| names.join(separator)))
}

/// Resolve a root-to-leaf slug path such as `["support", "internal-systems"]`.
///
/// Each segment is matched among the children of the previous match. An empty path
/// resolves to nothing.
pub fn find_by_slug_path<'a, S: AsRef<str>>(
    slugs: &[S],
    all: &'a [Category],
) -> Option<&'a Category> {
    let index = CategoryIndex::new(all);
    let mut parent: Option<CategoryId> = None;
    let mut found = None;
    for slug in slugs {
        let next = index
            .children_of(parent)
            .iter()
            .find(|c| c.slug == slug.as_ref())
            .copied()?;
        parent = Some(next.id);
        found = Some(next);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{category, chain};

    #[test]
    fn test_path_of_root_is_its_name() {
        let root = category("Support", None);
        let all = vec![root.clone()];
        assert_eq!(
            path_of(root.id, &all, " > ", 10).unwrap().as_deref(),
            Some("Support")
        );
    }

    #[test]
    fn test_path_of_nested_chain() {
        let nodes = chain(&["Support", "Internal Systems", "Printers"]);
        assert_eq!(
            path_of(nodes[2].id, &nodes, " > ", 10).unwrap().as_deref(),
            Some("Support > Internal Systems > Printers")
        );
        assert_eq!(
            path_of(nodes[2].id, &nodes, "/", 10).unwrap().as_deref(),
            Some("Support/Internal Systems/Printers")
        );
    }

    #[test]
    fn test_path_of_unknown_id() {
        let nodes = chain(&["Support"]);
        assert_eq!(path_of(CategoryId::new(), &nodes, " > ", 10).unwrap(), None);
    }

    #[test]
    fn test_path_of_stops_at_dangling_parent() {
        let orphan = category("Orphaned", Some(CategoryId::new()));
        let child = category("Child Node", Some(orphan.id));
        let all = vec![orphan, child.clone()];
        assert_eq!(
            path_of(child.id, &all, " > ", 10).unwrap().as_deref(),
            Some("Orphaned > Child Node")
        );
    }

    #[test]
    fn test_path_of_cycle_hits_cap() {
        let mut a = category("Alpha", None);
        let b = category("Beta", Some(a.id));
        a.parent_id = Some(b.id);
        let all = vec![a, b.clone()];
        assert!(path_of(b.id, &all, " > ", 10).is_err());
    }

    #[test]
    fn test_find_by_slug_path() {
        let nodes = chain(&["Support", "Internal Systems", "Printers"]);
        let found = find_by_slug_path(&["support", "internal-systems"], &nodes).unwrap();
        assert_eq!(found.id, nodes[1].id);
        assert!(find_by_slug_path(&["internal-systems"], &nodes).is_none());
        assert!(find_by_slug_path::<&str>(&[], &nodes).is_none());
    }
}
