//! Tree builds and breadcrumbs are pure over a snapshot and can run side by side.

use docwiki::model::{Actor, NewCategory};
use docwiki::path::path_of;
use docwiki::store::{MemoryCategoryStore, MemoryDocumentStore};
use docwiki::tree::{build, flatten, DocumentCounts};
use docwiki::CategoryService;
use std::sync::Arc;

#[test]
fn test_concurrent_tree_builds_agree() {
    may::config().set_stack_size(0x8000);
    let admin = Actor::administrator("admin");
    let svc = CategoryService::new(MemoryCategoryStore::new(), MemoryDocumentStore::new());
    let mut parent = None;
    for name in ["Support", "Internal Systems", "Printers", "Toner"] {
        let mut request = NewCategory::new(name);
        request.parent_id = parent;
        parent = Some(svc.create_category(&admin, request).unwrap().id);
    }
    for name in ["Sales", "Marketing", "Legal"] {
        svc.create_category(&admin, NewCategory::new(name)).unwrap();
    }
    let leaf = parent.unwrap();

    let snapshot = Arc::new(svc.list_categories().unwrap());
    let expected = flatten(&build(&snapshot, &DocumentCounts::new()));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let snapshot = Arc::clone(&snapshot);
            may::go!(move || {
                let forest = build(&snapshot, &DocumentCounts::new());
                let breadcrumb = path_of(leaf, &snapshot, " > ", 10).unwrap();
                (flatten(&forest), breadcrumb)
            })
        })
        .collect();

    for handle in handles {
        let (flat, breadcrumb) = handle.join().unwrap();
        assert_eq!(flat, expected);
        assert_eq!(
            breadcrumb.as_deref(),
            Some("Support > Internal Systems > Printers > Toner")
        );
    }
}
