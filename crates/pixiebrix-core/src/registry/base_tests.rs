use super::*;

struct TestItem {
    id: String,
    version: u32,
}

impl TestItem {
    fn new(id: &str, version: u32) -> Self {
        Self {
            id: id.to_string(),
            version,
        }
    }
}

impl Registerable for TestItem {
    fn registry_id(&self) -> &str {
        &self.id
    }
}

#[test]
fn test_new_registry_is_empty() {
    let registry: BaseRegistry<TestItem> = BaseRegistry::default();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_register_and_get() {
    let registry = BaseRegistry::new();
    registry.register(Arc::new(TestItem::new("a", 1))).unwrap();

    let item = registry.get("a").unwrap();
    assert_eq!(item.version, 1);
    assert!(registry.contains("a"));
}

#[test]
fn test_duplicate_keeps_first() {
    let registry = BaseRegistry::new();
    registry.register(Arc::new(TestItem::new("a", 1))).unwrap();

    let result = registry.register(Arc::new(TestItem::new("a", 2)));
    assert!(matches!(result, Err(RegistryError::AlreadyRegistered(id)) if id == "a"));
    assert_eq!(registry.get("a").unwrap().version, 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_upsert_replaces() {
    let registry = BaseRegistry::new();
    assert!(registry.upsert(Arc::new(TestItem::new("a", 1))).is_none());

    let previous = registry.upsert(Arc::new(TestItem::new("a", 2))).unwrap();
    assert_eq!(previous.version, 1);
    assert_eq!(registry.get("a").unwrap().version, 2);
}

#[test]
fn test_unregister() {
    let registry = BaseRegistry::new();
    registry.register(Arc::new(TestItem::new("a", 1))).unwrap();

    let removed = registry.unregister("a").unwrap();
    assert_eq!(removed.version, 1);
    assert!(registry.is_empty());
    assert!(matches!(
        registry.unregister("a"),
        Err(RegistryError::NotFound(_))
    ));
}

#[test]
fn test_list_ids_sorted() {
    let registry = BaseRegistry::new();
    registry.register(Arc::new(TestItem::new("b", 1))).unwrap();
    registry.register(Arc::new(TestItem::new("a", 1))).unwrap();

    assert_eq!(registry.list_ids(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(registry.iter().count(), 2);
}

#[test]
fn test_concurrent_registration_single_winner() {
    let registry = Arc::new(BaseRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|version| {
            let registry = registry.clone();
            std::thread::spawn(move || registry.register(Arc::new(TestItem::new("x", version))).is_ok())
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
}
