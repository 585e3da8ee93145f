//! Composition over field maps and options.
//!
//! Everything here is pure: drafts are combined into new drafts and nothing is
//! registered until [`EntityDraft::build`] or [`EntityDraft::build_in`] runs.

use std::fmt;
use std::sync::Arc;

use crate::entity::{Entity, EntityOptions, FieldMap};
use crate::field::IntoFieldDefinition;
use crate::registry::{EntityRegistry, default_registry};

/// Build a field map from `(name, field)` pairs, keeping their order.
pub fn field_map<I, K, F>(entries: I) -> FieldMap
where
    I: IntoIterator<Item = (K, F)>,
    K: Into<String>,
    F: IntoFieldDefinition,
{
    entries
        .into_iter()
        .map(|(name, field)| (name.into(), field.into_field_definition()))
        .collect()
}

/// Fields and options not yet bound to a name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDraft {
    pub fields: FieldMap,
    pub options: EntityOptions,
}

impl EntityDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: impl IntoFieldDefinition) -> Self {
        self.fields.insert(name.into(), field.into_field_definition());
        self
    }

    pub fn fields(mut self, fields: FieldMap) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn options(mut self, options: EntityOptions) -> Self {
        self.options = self.options.merge(&options);
        self
    }

    pub fn with(self, applied: &Mixin) -> Self {
        mixin(&self, std::slice::from_ref(applied))
    }

    pub fn when(self, condition: bool, fields: FieldMap) -> Self {
        self.fields(conditional(condition, fields))
    }

    /// Normalize into an entity without registering it.
    pub fn into_entity(self, name: impl Into<String>) -> Entity {
        Entity::new(name, self.fields, self.options)
    }

    /// Build and register in the default registry.
    pub fn build(self, name: impl Into<String>) -> Arc<Entity> {
        self.build_in(default_registry(), name)
    }

    pub fn build_in(self, registry: &EntityRegistry, name: impl Into<String>) -> Arc<Entity> {
        registry.define(name, self.fields, self.options)
    }
}

impl From<FieldMap> for EntityDraft {
    fn from(fields: FieldMap) -> Self {
        Self {
            fields,
            options: EntityOptions::default(),
        }
    }
}

impl From<&Entity> for EntityDraft {
    /// Declared fields and options; managed fields are re-derived on build.
    fn from(entity: &Entity) -> Self {
        Self {
            fields: entity
                .declared_fields()
                .map(|(name, field)| (name.to_string(), field.clone()))
                .collect(),
            options: entity.options().clone(),
        }
    }
}

/// Union of two drafts; `overlay` wins on name collisions.
pub fn extend(base: &EntityDraft, overlay: &EntityDraft) -> EntityDraft {
    let mut fields = base.fields.clone();
    for (name, field) in &overlay.fields {
        fields.insert(name.clone(), field.clone());
    }
    EntityDraft {
        fields,
        options: base.options.merge(&overlay.options),
    }
}

/// Left-to-right fold of [`extend`].
pub fn compose<'a, I>(drafts: I) -> EntityDraft
where
    I: IntoIterator<Item = &'a EntityDraft>,
{
    drafts
        .into_iter()
        .fold(EntityDraft::default(), |acc, draft| extend(&acc, draft))
}

/// Include `fields` only when `condition` holds.
pub fn conditional(condition: bool, fields: FieldMap) -> FieldMap {
    if condition { fields } else { FieldMap::new() }
}

/// A named, reusable group of fields and options.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixin {
    name: String,
    draft: EntityDraft,
}

impl Mixin {
    pub fn new(name: impl Into<String>, draft: EntityDraft) -> Self {
        Self {
            name: name.into(),
            draft,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn draft(&self) -> &EntityDraft {
        &self.draft
    }
}

/// Apply mixins to a draft. The draft's own fields and options take
/// precedence; mixin fields the draft does not declare are appended in mixin
/// order.
pub fn mixin(draft: &EntityDraft, mixins: &[Mixin]) -> EntityDraft {
    let mut fields = draft.fields.clone();
    let mut options = EntityOptions::default();
    for mixin in mixins {
        for (name, field) in &mixin.draft.fields {
            if !fields.contains_key(name) {
                fields.insert(name.clone(), field.clone());
            }
        }
        options = options.merge(&mixin.draft.options);
    }
    EntityDraft {
        fields,
        options: options.merge(&draft.options),
    }
}

/// A parameterized entity factory.
pub struct Template<P> {
    name: String,
    factory: Arc<dyn Fn(&P) -> EntityDraft + Send + Sync>,
}

impl<P> Template<P> {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&P) -> EntityDraft + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self, params: &P) -> EntityDraft {
        (self.factory)(params)
    }
}

impl<P> Clone for Template<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<P> fmt::Debug for Template<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template").field("name", &self.name).finish()
    }
}

/// Built-in mixins.
pub mod mixins {
    use serde_json::json;

    use super::{EntityDraft, Mixin};
    use crate::entity::{EntityOptions, IndexDefinition};
    use crate::field::{TextTransform, date, enumeration, integer, text};

    /// Creation/modification timestamps plus the acting user of each.
    pub fn auditable() -> Mixin {
        Mixin::new(
            "auditable",
            EntityDraft::new()
                .field("createdBy", text().description("User that created the record"))
                .field("updatedBy", text().description("User that last updated the record"))
                .options(EntityOptions::new().timestamps(true)),
        )
    }

    pub fn publishable() -> Mixin {
        Mixin::new(
            "publishable",
            EntityDraft::new()
                .field(
                    "status",
                    enumeration(["draft", "published", "archived"])
                        .default_value(json!("draft"))
                        .indexed(),
                )
                .field("publishedAt", date().nullable()),
        )
    }

    /// A unique, system-generated slug derived from `source`.
    pub fn sluggable(source: &str) -> Mixin {
        Mixin::new(
            "sluggable",
            EntityDraft::new()
                .field(
                    "slug",
                    text()
                        .trim()
                        .transform(TextTransform::Slugify)
                        .auto_generate()
                        .unique()
                        .description(format!("URL slug derived from `{source}`")),
                )
                .options(EntityOptions::new().index(IndexDefinition::unique(["slug"]))),
        )
    }

    pub fn sortable() -> Mixin {
        Mixin::new(
            "sortable",
            EntityDraft::new().field(
                "position",
                integer().min(0.0).default_value(json!(0)).indexed(),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldKind, Presence, integer, text};

    #[test]
    fn extend_overrides_fields_and_options() {
        let base = EntityDraft::new()
            .field("name", text().max_length(10))
            .field("age", integer())
            .options(EntityOptions::new().timestamps(true));
        let overlay = EntityDraft::new()
            .field("name", text().max_length(50))
            .options(EntityOptions::new().soft_delete(true));

        let merged = extend(&base, &overlay);
        let FieldKind::Text(options) = merged.fields["name"].kind() else {
            panic!("expected text kind");
        };
        assert_eq!(options.max_length, Some(50));
        assert_eq!(merged.fields.keys().collect::<Vec<_>>(), vec!["name", "age"]);
        assert_eq!(merged.options.timestamps, Some(true));
        assert_eq!(merged.options.soft_delete, Some(true));
    }

    #[test]
    fn compose_folds_left_to_right() {
        let a = EntityDraft::new().field("x", text().min_length(1));
        let b = EntityDraft::new().field("x", text().min_length(2));
        let c = EntityDraft::new().field("y", text());
        let composed = compose([&a, &b, &c]);
        let FieldKind::Text(options) = composed.fields["x"].kind() else {
            panic!("expected text kind");
        };
        assert_eq!(options.min_length, Some(2));
        assert_eq!(composed.fields.len(), 2);
    }

    #[test]
    fn mixin_never_overrides_declared_fields() {
        let draft = EntityDraft::new().field("status", text().required());
        let mixed = mixin(&draft, &[mixins::publishable(), mixins::sortable()]);
        assert_eq!(
            mixed.fields.keys().collect::<Vec<_>>(),
            vec!["status", "publishedAt", "position"]
        );
        assert!(matches!(mixed.fields["status"].kind(), FieldKind::Text(_)));
    }

    #[test]
    fn sluggable_is_defaulted() {
        let draft = EntityDraft::new().with(&mixins::sluggable("title"));
        assert_eq!(draft.fields["slug"].presence(), Presence::Defaulted);
    }

    #[test]
    fn conditional_drops_fields() {
        let fields = field_map([("beta", text().build())]);
        assert!(conditional(false, fields.clone()).is_empty());
        assert_eq!(conditional(true, fields).len(), 1);
    }

    #[test]
    fn template_instantiates_per_parameter() {
        let template = Template::new("localized_page", |locales: &Vec<&str>| {
            EntityDraft::new().field("title", crate::field::localized(locales.iter().copied()))
        });
        let draft = template.instantiate(&vec!["en", "de"]);
        let FieldKind::Localized(options) = draft.fields["title"].kind() else {
            panic!("expected localized kind");
        };
        assert_eq!(options.locales, vec!["en", "de"]);
    }

    #[test]
    fn drafts_register_only_on_build() {
        let registry = EntityRegistry::new();
        let draft = EntityDraft::new().field("name", text());
        let _unregistered = draft.clone().into_entity("Thing");
        assert!(registry.is_empty());
        draft.build_in(&registry, "Thing");
        assert!(registry.contains("Thing"));
    }
}
