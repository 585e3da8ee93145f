use entigen_core::{
    EntityDraft, EntityOptions, EntityRegistry, compose, default_registry, define_entity,
    field_map, mixins, text,
};

#[test]
fn define_entity_registers_in_default_registry() {
    let entity = define_entity(
        "Catalog",
        field_map([("label", text().required().build())]),
        EntityOptions::new(),
    );
    let found = default_registry()
        .get("Catalog")
        .expect("catalog registered");
    assert_eq!(found.name(), entity.name());
    assert!(found.field("label").is_some());
}

#[test]
fn explicit_registries_are_independent() {
    let left = EntityRegistry::new();
    let right = EntityRegistry::new();
    EntityDraft::new()
        .field("title", text())
        .build_in(&left, "Post");

    assert!(left.contains("Post"));
    assert!(!right.contains("Post"));

    left.clear();
    assert!(left.is_empty());
}

#[test]
fn registry_preserves_first_registration_order() {
    let registry = EntityRegistry::new();
    for name in ["B", "A", "C"] {
        EntityDraft::new().build_in(&registry, name);
    }
    EntityDraft::new().field("x", text()).build_in(&registry, "B");
    assert_eq!(registry.names(), vec!["B", "A", "C"]);
    assert!(registry.get("B").expect("B").field("x").is_some());
}

#[test]
fn composed_entity_is_registered_once_built() {
    let registry = EntityRegistry::new();
    let base = EntityDraft::new().field("title", text().required());
    let extra = EntityDraft::new().options(EntityOptions::new().soft_delete(true));
    let composed = compose([&base, &extra]).with(&mixins::auditable());
    assert!(registry.is_empty());

    let entity = composed.build_in(&registry, "Article");
    let names: Vec<&str> = entity.fields().keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec!["id", "title", "createdBy", "updatedBy", "createdAt", "updatedAt", "deletedAt"]
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn extension_is_visible_through_the_registry() {
    let registry = EntityRegistry::new();
    EntityDraft::new()
        .field("title", text())
        .options(EntityOptions::new().timestamps(true))
        .build_in(&registry, "Page");

    registry
        .extend_entity("Page", field_map([("summary", text().build())]))
        .expect("extend page");

    let page = registry.get("Page").expect("page");
    let names: Vec<&str> = page.fields().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["id", "title", "summary", "createdAt", "updatedAt"]);
}
