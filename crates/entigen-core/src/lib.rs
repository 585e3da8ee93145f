//! Core contracts for entigen.
//!
//! This crate holds the single intermediate representation every generator
//! projects from: field definitions and their builders, entities and their
//! derived validation views, composition helpers, and the entity registry.

pub mod compose;
pub mod entity;
pub mod error;
pub mod field;
pub mod kinds;
pub mod registry;
pub mod schema;

pub use compose::{
    EntityDraft, Mixin, Template, compose, conditional, extend, field_map, mixin, mixins,
};
pub use entity::{
    CREATED_AT_FIELD, DELETED_AT_FIELD, Entity, EntityDeclaration, EntityOptions, FieldMap,
    ID_FIELD, IndexDefinition, UPDATED_AT_FIELD,
};
pub use error::{Error, Result};
pub use field::{
    ArrayOptions, BooleanSpec, Cardinality, CustomOptions, DateOptions, EnumOptions,
    FieldBuilder, FieldDefinition, FieldKind, FieldRole, IdOptions, IdStrategy,
    IntoFieldDefinition, JsonOptions, KindSpec, LocalizedOptions, NumberOptions, NumberSign,
    Presence, ReferentialAction, RelationOptions, TextOptions, TextSpec, TextTransform, array,
    belongs_to, boolean, custom, date, email, enumeration, has_many, has_one, id, integer, json,
    localized, many_to_many, number, relation, rich_text, text, url,
};
pub use kinds::{
    DocType, FilterClass, KindInfo, KindTag, ScalarClass, StorageClass, doc_type, filter_class,
    kind_info, scalar_class, storage_class,
};
pub use registry::{EntityRegistry, default_registry, define_entity};
pub use schema::{
    ObjectSchema, RESERVED_QUERY_KEYS, ReferenceKeys, StringFormat, ValidationErrors,
    ValidationIssue, ValidationSchema, paginated_schema, query_key_collisions, query_schema,
    query_schema_with, to_validation_schema, to_validation_schema_with,
};

/// Version of the declaration file contract accepted by the CLI.
pub const DECLARATION_VERSION: &str = "0.1";
