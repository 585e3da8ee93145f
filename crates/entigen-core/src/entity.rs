//! Entities: named aggregates of field definitions plus storage options.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::field::{Cardinality, FieldDefinition, FieldRole, RelationOptions, date, id};
use crate::kinds::KindTag;
use crate::registry::default_registry;
use crate::schema::{
    ReferenceKeys, ValidationSchema, create_view, full_view, is_sortable, paginated_schema,
    query_schema_with, update_view,
};

/// Ordered map of field name to definition. Order is declaration order and
/// drives the output order of every generator.
pub type FieldMap = IndexMap<String, FieldDefinition>;

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";
pub const DELETED_AT_FIELD: &str = "deletedAt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexDefinition {
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IndexDefinition {
    pub fn new<I, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
            name: None,
        }
    }

    pub fn unique<I, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            unique: true,
            ..Self::new(fields)
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Entity-level storage options. Flags are optional so that composition can
/// tell "unset" apart from an explicit `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EntityOptions {
    /// Table name; defaults to the lower-cased entity name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_delete: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite_key: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage_name(mut self, name: impl Into<String>) -> Self {
        self.storage_name = Some(name.into());
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = Some(enabled);
        self
    }

    pub fn soft_delete(mut self, enabled: bool) -> Self {
        self.soft_delete = Some(enabled);
        self
    }

    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn composite_key<I, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.composite_key = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn has_timestamps(&self) -> bool {
        self.timestamps.unwrap_or(false)
    }

    pub fn has_soft_delete(&self) -> bool {
        self.soft_delete.unwrap_or(false)
    }

    /// Union of two option sets; values set in `other` win, index lists are
    /// concatenated without duplicates.
    pub fn merge(&self, other: &EntityOptions) -> EntityOptions {
        let mut indexes = self.indexes.clone();
        for index in &other.indexes {
            if !indexes.contains(index) {
                indexes.push(index.clone());
            }
        }
        EntityOptions {
            storage_name: other.storage_name.clone().or_else(|| self.storage_name.clone()),
            timestamps: other.timestamps.or(self.timestamps),
            soft_delete: other.soft_delete.or(self.soft_delete),
            indexes,
            composite_key: other
                .composite_key
                .clone()
                .or_else(|| self.composite_key.clone()),
            description: other.description.clone().or_else(|| self.description.clone()),
        }
    }
}

/// Serializable entity declaration, the on-disk form read by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityDeclaration {
    pub name: String,
    pub fields: FieldMap,
    #[serde(default)]
    pub options: EntityOptions,
}

/// A normalized entity.
///
/// Construction injects the managed fields the options ask for; after that the
/// value is never mutated. Composition and registry extension build new
/// entities instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    name: String,
    fields: FieldMap,
    options: EntityOptions,
}

impl Entity {
    pub fn new(name: impl Into<String>, fields: FieldMap, options: EntityOptions) -> Self {
        let fields = normalize(fields, &options);
        Self {
            name: name.into(),
            fields,
            options,
        }
    }

    pub fn from_declaration(declaration: EntityDeclaration) -> Self {
        Self::new(declaration.name, declaration.fields, declaration.options)
    }

    pub fn to_declaration(&self) -> EntityDeclaration {
        EntityDeclaration {
            name: self.name.clone(),
            fields: self.fields.clone(),
            options: self.options.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn options(&self) -> &EntityOptions {
        &self.options
    }

    pub fn storage_name(&self) -> String {
        self.options
            .storage_name
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    /// Composite key columns when set, otherwise the primary identifier fields.
    pub fn primary_key(&self) -> Vec<&str> {
        match &self.options.composite_key {
            Some(columns) => columns.iter().map(String::as_str).collect(),
            None => self
                .fields
                .iter()
                .filter(|(_, field)| field.is_primary())
                .map(|(name, _)| name.as_str())
                .collect(),
        }
    }

    pub fn relations(&self) -> impl Iterator<Item = (&str, &FieldDefinition, &RelationOptions)> {
        self.fields.iter().filter_map(|(name, field)| {
            field
                .relation()
                .map(|relation| (name.as_str(), field, relation))
        })
    }

    /// Fields declared by the user, i.e. everything but managed fields.
    pub fn declared_fields(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.fields
            .iter()
            .filter(|(_, field)| !field.is_managed())
            .map(|(name, field)| (name.as_str(), field))
    }

    /// Fields settable through a create or update payload. Managed fields and
    /// the "many" side of one-to-many relations are left out.
    pub fn input_fields(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.declared_fields().filter(|(_, field)| {
            !field
                .relation()
                .is_some_and(|relation| relation.cardinality == Cardinality::OneToMany)
        })
    }

    /// Scalar fields usable as an ordering key.
    pub fn sortable_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, field)| is_sortable(field.kind()))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The single column other entities store to reference this one. `None`
    /// for composite keys.
    pub fn key_field(&self) -> Option<(&str, &FieldDefinition)> {
        if self.options.composite_key.is_some() {
            return None;
        }
        self.fields
            .iter()
            .find(|(_, field)| field.is_primary())
            .map(|(name, field)| (name.as_str(), field))
    }

    /// Relation keys resolved through the default registry, with this entity
    /// taking precedence over a registered namesake.
    fn default_keys(&self) -> ReferenceKeys {
        let mut keys = default_registry().reference_keys();
        keys.insert_entity(self);
        keys
    }

    pub fn full_schema(&self) -> ValidationSchema {
        self.full_schema_with(&self.default_keys())
    }

    pub fn create_schema(&self) -> ValidationSchema {
        self.create_schema_with(&self.default_keys())
    }

    pub fn update_schema(&self) -> ValidationSchema {
        self.update_schema_with(&self.default_keys())
    }

    pub fn query_schema(&self) -> ValidationSchema {
        self.query_schema_with(&self.default_keys())
    }

    pub fn paginated_schema(&self) -> ValidationSchema {
        paginated_schema(self.full_schema())
    }

    pub fn full_schema_with(&self, keys: &ReferenceKeys) -> ValidationSchema {
        full_view(self, keys)
    }

    pub fn create_schema_with(&self, keys: &ReferenceKeys) -> ValidationSchema {
        create_view(self, keys)
    }

    pub fn update_schema_with(&self, keys: &ReferenceKeys) -> ValidationSchema {
        update_view(self, keys)
    }

    pub fn query_schema_with(&self, keys: &ReferenceKeys) -> ValidationSchema {
        query_schema_with(self, keys)
    }

    /// A new entity with `extra` merged over the declared fields.
    pub fn extended(&self, extra: FieldMap) -> Entity {
        let mut fields = self.fields.clone();
        fields.extend(extra);
        Entity::new(self.name.clone(), fields, self.options.clone())
    }
}

fn normalize(mut fields: FieldMap, options: &EntityOptions) -> FieldMap {
    fields.retain(|_, field| {
        !matches!(
            field.role(),
            Some(FieldRole::CreatedAt | FieldRole::UpdatedAt | FieldRole::DeletedAt)
        )
    });

    for field in fields.values_mut() {
        if field.tag() == KindTag::Id && field.role().is_none() {
            *field = field.clone().with_role(FieldRole::Primary);
        }
    }

    let has_identifier = fields.values().any(|field| field.tag() == KindTag::Id);
    if !has_identifier && options.composite_key.is_none() && !fields.contains_key(ID_FIELD) {
        let generated = id().build().with_role(FieldRole::GeneratedKey);
        fields.shift_insert(0, ID_FIELD.to_string(), generated);
    }

    if options.has_timestamps() {
        let created = date().required().build().with_role(FieldRole::CreatedAt);
        let updated = date().required().build().with_role(FieldRole::UpdatedAt);
        push_managed(&mut fields, CREATED_AT_FIELD, created);
        push_managed(&mut fields, UPDATED_AT_FIELD, updated);
    }
    if options.has_soft_delete() {
        let deleted = date().nullable().build().with_role(FieldRole::DeletedAt);
        push_managed(&mut fields, DELETED_AT_FIELD, deleted);
    }
    fields
}

fn push_managed(fields: &mut FieldMap, name: &str, field: FieldDefinition) {
    fields.shift_remove(name);
    fields.insert(name.to_string(), field);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{IdStrategy, text};

    fn fields(entries: Vec<(&str, FieldDefinition)>) -> FieldMap {
        entries
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect()
    }

    #[test]
    fn injects_identifier_first_and_managed_fields_last() {
        let entity = Entity::new(
            "Post",
            fields(vec![("title", text().required().build())]),
            EntityOptions::new().timestamps(true).soft_delete(true),
        );
        let names: Vec<&str> = entity.fields().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "title", "createdAt", "updatedAt", "deletedAt"]);
        assert_eq!(entity.primary_key(), vec!["id"]);
        assert_eq!(
            entity.field(ID_FIELD).and_then(FieldDefinition::role),
            Some(FieldRole::GeneratedKey)
        );
        assert_eq!(entity.key_field().map(|(name, _)| name), Some("id"));
    }

    #[test]
    fn keeps_declared_identifier() {
        let entity = Entity::new(
            "Tag",
            fields(vec![
                ("label", text().build()),
                ("key", id().strategy(IdStrategy::Cuid).build()),
            ]),
            EntityOptions::new(),
        );
        assert!(entity.field(ID_FIELD).is_none());
        assert_eq!(entity.primary_key(), vec!["key"]);
    }

    #[test]
    fn composite_key_suppresses_identifier() {
        let entity = Entity::new(
            "Membership",
            fields(vec![
                ("userId", text().required().build()),
                ("teamId", text().required().build()),
            ]),
            EntityOptions::new().composite_key(["userId", "teamId"]),
        );
        assert!(entity.field(ID_FIELD).is_none());
        assert_eq!(entity.primary_key(), vec!["userId", "teamId"]);
        assert!(entity.key_field().is_none());
    }

    #[test]
    fn normalization_is_idempotent() {
        let entity = Entity::new(
            "Post",
            fields(vec![("title", text().build())]),
            EntityOptions::new().timestamps(true),
        );
        let again = Entity::from_declaration(entity.to_declaration());
        assert_eq!(again, entity);
    }

    #[test]
    fn storage_name_defaults_to_lowercase() {
        let entity = Entity::new("BlogPost", FieldMap::new(), EntityOptions::new());
        assert_eq!(entity.storage_name(), "blogpost");
        let options = EntityOptions::new().storage_name("posts");
        let named = Entity::new("BlogPost", FieldMap::new(), options);
        assert_eq!(named.storage_name(), "posts");
    }

    #[test]
    fn merge_prefers_later_values() {
        let base = EntityOptions::new().timestamps(true).storage_name("a");
        let over = EntityOptions::new().timestamps(false).index(IndexDefinition::new(["x"]));
        let merged = base.merge(&over);
        assert_eq!(merged.timestamps, Some(false));
        assert_eq!(merged.storage_name.as_deref(), Some("a"));
        assert_eq!(merged.indexes.len(), 1);
    }
}
