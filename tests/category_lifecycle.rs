//! End-to-end category lifecycle over the in-memory stores.

use docwiki::error::{Action, StoreError, ValidationError};
use docwiki::model::{Actor, Category, CategoryId, CategoryPatch, DepartmentId, NewCategory, RenameCategory};
use docwiki::store::{CategoryStore, MemoryCategoryStore, MemoryDocumentStore};
use docwiki::validator::depth_of;
use docwiki::{CategoryError, CategoryService, DeletePolicy};

type Service = CategoryService<MemoryCategoryStore, MemoryDocumentStore>;

fn service() -> Service {
    CategoryService::new(MemoryCategoryStore::new(), MemoryDocumentStore::new())
}

fn admin() -> Actor {
    Actor::administrator("admin")
}

#[test]
fn test_support_scenario() {
    let svc = service();
    let support = svc.create_category(&admin(), NewCategory::new("Support")).unwrap();
    assert_eq!(support.slug, "support");
    assert!(support.is_root());

    let all = svc.list_categories().unwrap();
    assert_eq!(depth_of(support.parent_id, &all, 10).unwrap(), 0);

    let systems = svc
        .create_category(&admin(), NewCategory::new("Internal Systems").under(support.id))
        .unwrap();
    assert_eq!(systems.slug, "internal-systems");
    let all = svc.list_categories().unwrap();
    assert_eq!(depth_of(systems.parent_id, &all, 10).unwrap(), 1);

    let tree = svc.get_tree().unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].doc_count, 0);
    assert_eq!(tree[0].children[0].category.id, systems.id);

    let err = svc.create_category(&admin(), NewCategory::new("Support ")).unwrap_err();
    match err {
        CategoryError::Validation(ValidationError::SlugCollision { slug, parent_id }) => {
            assert_eq!(slug, "support");
            assert_eq!(parent_id, None);
        }
        other => panic!("expected slug collision, got {other:?}"),
    }
    assert!(err_message_contains(
        svc.create_category(&admin(), NewCategory::new("Support ")),
        "slug collision"
    ));
}

#[test]
fn test_short_name_rejected_before_slug_check() {
    let svc = service();
    svc.create_category(&admin(), NewCategory::new("QA Team")).unwrap();
    let err = svc.create_category(&admin(), NewCategory::new("QA")).unwrap_err();
    assert!(err.to_string().contains("name too short"));
}

#[test]
fn test_sixth_nested_create_exceeds_max_depth() {
    let svc = service();
    let mut parent: Option<CategoryId> = None;
    for level in 0..5 {
        let mut request = NewCategory::new(format!("Level {level}"));
        request.parent_id = parent;
        let created = svc.create_category(&admin(), request).unwrap();
        parent = Some(created.id);
    }

    let mut request = NewCategory::new("Level 5");
    request.parent_id = parent;
    let err = svc.create_category(&admin(), request).unwrap_err();
    assert!(matches!(
        err,
        CategoryError::Validation(ValidationError::MaxDepthExceeded { max_depth: 5, .. })
    ));
    assert!(err.to_string().contains("max depth exceeded"));
}

#[test]
fn test_delete_with_documents_under_both_policies() {
    let svc = service();
    let support = svc.create_category(&admin(), NewCategory::new("Support")).unwrap();
    for doc in ["runbook", "faq", "escalation"] {
        svc.documents().file_document(doc, Some(support.id)).unwrap();
    }

    let err = svc
        .delete_category(&admin(), support.id, DeletePolicy::RejectIfNonEmpty)
        .unwrap_err();
    assert_eq!(
        err,
        CategoryError::NotEmpty {
            id: support.id,
            children: 0,
            documents: 3,
        }
    );
    assert_eq!(svc.get_tree().unwrap()[0].doc_count, 3);

    let outcome = svc
        .delete_category(&admin(), support.id, DeletePolicy::Cascade { reassign_to: None })
        .unwrap();
    assert_eq!(outcome.removed, vec![support.id]);
    assert_eq!(outcome.documents_reassigned, 3);
    for doc in ["runbook", "faq", "escalation"] {
        assert_eq!(svc.documents().category_of(doc), Some(None));
    }
    assert_eq!(
        svc.get_category(support.id).unwrap_err(),
        CategoryError::NotFound(support.id)
    );
}

#[test]
fn test_reject_policy_counts_children() {
    let svc = service();
    let support = svc.create_category(&admin(), NewCategory::new("Support")).unwrap();
    svc.create_category(&admin(), NewCategory::new("Printers").under(support.id))
        .unwrap();
    let err = svc
        .delete_category(&admin(), support.id, DeletePolicy::RejectIfNonEmpty)
        .unwrap_err();
    assert!(matches!(err, CategoryError::NotEmpty { children: 1, documents: 0, .. }));
}

#[test]
fn test_editor_department_enforcement() {
    let svc = service();
    let ti = DepartmentId::parse("TI").unwrap();
    let infra = svc
        .create_category(&admin(), NewCategory::new("Infrastructure").in_department(ti))
        .unwrap();

    let rh_editor = Actor::editor("ana", "RH");
    let err = svc
        .create_category(&rh_editor, NewCategory::new("Payroll").under(infra.id))
        .unwrap_err();
    match err {
        CategoryError::PermissionDenied { actor, action, category } => {
            assert_eq!(actor, "ana (editor, RH)");
            assert_eq!(action, Action::Create);
            assert_eq!(category, Some(infra.id));
        }
        other => panic!("expected permission denied, got {other:?}"),
    }

    assert!(svc
        .create_category(&admin(), NewCategory::new("Payroll").under(infra.id))
        .is_ok());

    // Global scope is open to every editor
    assert!(svc.create_category(&rh_editor, NewCategory::new("Handbook")).is_ok());
    // Readers never write
    let err = svc
        .create_category(&Actor::reader("guest"), NewCategory::new("Notes"))
        .unwrap_err();
    assert!(matches!(err, CategoryError::PermissionDenied { .. }));
}

#[test]
fn test_move_needs_both_scopes() {
    let svc = service();
    let rh = svc
        .create_category(&admin(), NewCategory::new("People").in_department(DepartmentId::parse("RH").unwrap()))
        .unwrap();
    let ti = svc
        .create_category(&admin(), NewCategory::new("Systems").in_department(DepartmentId::parse("TI").unwrap()))
        .unwrap();
    let leaf = svc
        .create_category(&admin(), NewCategory::new("Onboarding").under(rh.id))
        .unwrap();

    let err = svc
        .move_category(&Actor::editor("ana", "RH"), leaf.id, Some(ti.id))
        .unwrap_err();
    assert!(matches!(err, CategoryError::PermissionDenied { action: Action::Move, .. }));
    assert!(svc.move_category(&admin(), leaf.id, Some(ti.id)).is_ok());
}

#[test]
fn test_move_rejects_cycles() {
    let svc = service();
    let a = svc.create_category(&admin(), NewCategory::new("Alpha")).unwrap();
    let b = svc.create_category(&admin(), NewCategory::new("Beta").under(a.id)).unwrap();
    let c = svc.create_category(&admin(), NewCategory::new("Gamma").under(b.id)).unwrap();

    for target in [a.id, b.id, c.id] {
        let err = svc.move_category(&admin(), a.id, Some(target)).unwrap_err();
        assert_eq!(
            err,
            CategoryError::Validation(ValidationError::Cycle {
                id: a.id,
                new_parent_id: target,
            })
        );
    }
}

#[test]
fn test_rename_is_idempotent() {
    let svc = service();
    let created = svc
        .create_category(&admin(), NewCategory::new("Support").with_description("Help desk"))
        .unwrap();

    let renamed = svc
        .rename_category(
            &admin(),
            created.id,
            RenameCategory::new("Support").with_description(Some("Help desk".to_string())),
        )
        .unwrap();
    assert_eq!(renamed, created);

    let renamed = svc
        .rename_category(&admin(), created.id, RenameCategory::new("Customer Support"))
        .unwrap();
    assert_eq!(renamed.slug, "customer-support");
    assert_eq!(renamed.description.as_deref(), Some("Help desk"));
}

#[test]
fn test_rename_collides_with_sibling() {
    let svc = service();
    svc.create_category(&admin(), NewCategory::new("Support")).unwrap();
    let other = svc.create_category(&admin(), NewCategory::new("Sales")).unwrap();
    let err = svc
        .rename_category(&admin(), other.id, RenameCategory::new("SUPPORT"))
        .unwrap_err();
    assert!(matches!(err, CategoryError::Validation(ValidationError::SlugCollision { .. })));
}

/// Serves a stale (empty) snapshot so validation passes, while writes hit the real store.
struct StaleReads<'a> {
    live: &'a MemoryCategoryStore,
}

impl CategoryStore for StaleReads<'_> {
    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(Vec::new())
    }

    fn insert(&self, record: Category) -> Result<Category, StoreError> {
        self.live.insert(record)
    }

    fn update(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category, StoreError> {
        self.live.update(id, patch)
    }

    fn delete(&self, id: CategoryId) -> Result<(), StoreError> {
        self.live.delete(id)
    }
}

#[test]
fn test_racing_write_surfaces_storage_conflict() {
    let live = MemoryCategoryStore::new();
    let winner = CategoryService::new(&live, MemoryDocumentStore::new());
    winner.create_category(&admin(), NewCategory::new("Support")).unwrap();

    let loser = CategoryService::new(StaleReads { live: &live }, MemoryDocumentStore::new());
    let err = loser.create_category(&admin(), NewCategory::new("Support")).unwrap_err();
    assert!(matches!(err, CategoryError::StorageConflict(_)));
    assert!(err.is_retryable());
    assert_eq!(live.len(), 1);
}

fn record(name: &str, id: CategoryId, parent_id: CategoryId) -> Category {
    let now = chrono::Utc::now();
    Category {
        id,
        name: name.to_string(),
        slug: name.to_lowercase(),
        slug_pinned: false,
        parent_id: Some(parent_id),
        department_id: None,
        order: 0,
        icon: None,
        description: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_cyclic_records_surface_internal_errors() {
    let (a, b) = (CategoryId::new(), CategoryId::new());
    let store = MemoryCategoryStore::with_records(vec![record("Alpha", a, b), record("Beta", b, a)]);
    let svc = CategoryService::new(store, MemoryDocumentStore::new());

    let err = svc.get_breadcrumb(a).unwrap_err();
    assert!(matches!(err, CategoryError::Internal(_)), "{err:?}");
    assert!(!err.is_retryable());

    let err = svc
        .create_category(&admin(), NewCategory::new("Printers").under(a))
        .unwrap_err();
    assert!(matches!(err, CategoryError::Internal(_)), "{err:?}");
    assert_eq!(svc.list_categories().unwrap().len(), 2);

    let tree = svc.get_tree().unwrap();
    let shown: usize = tree.iter().map(|node| node.subtree_len()).sum();
    assert_eq!(shown, 2);
    assert!(tree.iter().any(|node| node.find(a).is_some()));
    assert!(tree.iter().any(|node| node.find(b).is_some()));
}

fn err_message_contains<T: std::fmt::Debug>(result: Result<T, CategoryError>, needle: &str) -> bool {
    result.map_or_else(|e| e.to_string().contains(needle), |_| false)
}
