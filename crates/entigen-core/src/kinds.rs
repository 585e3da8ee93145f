//! Field-kind metadata table.
//!
//! Every backend agrees on what a kind means by reading it from here instead
//! of keeping its own switch. Adding a kind is one new [`KindTag`] and one row
//! in [`KINDS`]; structural kinds (enum, array, relation, json, localized)
//! still need assembly in each backend, but their leaf projections come from
//! this table.

use serde::Serialize;

use crate::field::{FieldDefinition, FieldKind, IdStrategy};
use crate::schema::StringFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    Text,
    Email,
    Url,
    RichText,
    Number,
    Boolean,
    Date,
    Enum,
    Array,
    Relation,
    Json,
    Localized,
    Id,
    Custom,
}

impl KindTag {
    pub const ALL: [KindTag; 14] = [
        KindTag::Text,
        KindTag::Email,
        KindTag::Url,
        KindTag::RichText,
        KindTag::Number,
        KindTag::Boolean,
        KindTag::Date,
        KindTag::Enum,
        KindTag::Array,
        KindTag::Relation,
        KindTag::Json,
        KindTag::Localized,
        KindTag::Id,
        KindTag::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        kind_info(self).name
    }
}

/// Relational storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    String,
    LongText,
    Integer,
    Float,
    Decimal,
    Boolean,
    DateTime,
    Json,
    Enum,
    Reference,
    List,
    Identifier,
}

/// Structural (interface) type class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarClass {
    String,
    Number,
    Boolean,
    Date,
    Literal,
    List,
    Reference,
    Object,
    Unknown,
}

/// Documentation-schema type and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocType {
    pub ty: Option<&'static str>,
    pub format: Option<&'static str>,
}

/// Which query filter shape a kind supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterClass {
    /// Equality plus contains/starts-with/ends-with.
    Text,
    /// Equality plus range comparisons.
    Comparable,
    /// Membership in a set of literals.
    Membership,
    Equality,
    None,
}

#[derive(Debug)]
pub struct KindInfo {
    pub tag: KindTag,
    pub name: &'static str,
    pub storage: StorageClass,
    pub scalar: ScalarClass,
    pub doc: DocType,
    pub filter: FilterClass,
    pub string_format: Option<StringFormat>,
}

const fn doc(ty: Option<&'static str>, format: Option<&'static str>) -> DocType {
    DocType { ty, format }
}

static KINDS: [KindInfo; 14] = [
    KindInfo {
        tag: KindTag::Text,
        name: "text",
        storage: StorageClass::String,
        scalar: ScalarClass::String,
        doc: doc(Some("string"), None),
        filter: FilterClass::Text,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Email,
        name: "email",
        storage: StorageClass::String,
        scalar: ScalarClass::String,
        doc: doc(Some("string"), Some("email")),
        filter: FilterClass::Text,
        string_format: Some(StringFormat::Email),
    },
    KindInfo {
        tag: KindTag::Url,
        name: "url",
        storage: StorageClass::String,
        scalar: ScalarClass::String,
        doc: doc(Some("string"), Some("uri")),
        filter: FilterClass::Text,
        string_format: Some(StringFormat::Url),
    },
    KindInfo {
        tag: KindTag::RichText,
        name: "rich_text",
        storage: StorageClass::LongText,
        scalar: ScalarClass::String,
        doc: doc(Some("string"), None),
        filter: FilterClass::Text,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Number,
        name: "number",
        storage: StorageClass::Float,
        scalar: ScalarClass::Number,
        doc: doc(Some("number"), None),
        filter: FilterClass::Comparable,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Boolean,
        name: "boolean",
        storage: StorageClass::Boolean,
        scalar: ScalarClass::Boolean,
        doc: doc(Some("boolean"), None),
        filter: FilterClass::Equality,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Date,
        name: "date",
        storage: StorageClass::DateTime,
        scalar: ScalarClass::Date,
        doc: doc(Some("string"), Some("date-time")),
        filter: FilterClass::Comparable,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Enum,
        name: "enum",
        storage: StorageClass::Enum,
        scalar: ScalarClass::Literal,
        doc: doc(Some("string"), None),
        filter: FilterClass::Membership,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Array,
        name: "array",
        storage: StorageClass::List,
        scalar: ScalarClass::List,
        doc: doc(Some("array"), None),
        filter: FilterClass::None,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Relation,
        name: "relation",
        storage: StorageClass::Reference,
        scalar: ScalarClass::Reference,
        // Type and format follow the target's key; see `ReferenceKeys`.
        doc: doc(None, None),
        filter: FilterClass::Equality,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Json,
        name: "json",
        storage: StorageClass::Json,
        scalar: ScalarClass::Object,
        doc: doc(Some("object"), None),
        filter: FilterClass::None,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Localized,
        name: "localized",
        storage: StorageClass::Json,
        scalar: ScalarClass::Object,
        doc: doc(Some("object"), None),
        filter: FilterClass::None,
        string_format: None,
    },
    KindInfo {
        tag: KindTag::Id,
        name: "id",
        storage: StorageClass::Identifier,
        scalar: ScalarClass::String,
        doc: doc(Some("string"), Some("uuid")),
        filter: FilterClass::Equality,
        string_format: Some(StringFormat::Uuid),
    },
    KindInfo {
        tag: KindTag::Custom,
        name: "custom",
        storage: StorageClass::Json,
        scalar: ScalarClass::Unknown,
        doc: doc(None, None),
        filter: FilterClass::None,
        string_format: None,
    },
];

pub fn kind_info(tag: KindTag) -> &'static KindInfo {
    &KINDS[tag as usize]
}

/// Storage class refined by per-field options (integer and decimal numbers,
/// auto-increment identifiers).
pub fn storage_class(field: &FieldDefinition) -> StorageClass {
    match field.kind() {
        FieldKind::Number(options) if options.integer => StorageClass::Integer,
        FieldKind::Number(options) if options.precision.is_some() => StorageClass::Decimal,
        _ => kind_info(field.tag()).storage,
    }
}

/// Scalar class refined by per-field options.
pub fn scalar_class(field: &FieldDefinition) -> ScalarClass {
    match field.kind() {
        FieldKind::Id(options) if options.strategy == IdStrategy::AutoIncrement => {
            ScalarClass::Number
        }
        _ => kind_info(field.tag()).scalar,
    }
}

/// Documentation type refined by per-field options.
pub fn doc_type(field: &FieldDefinition) -> DocType {
    match field.kind() {
        FieldKind::Number(options) if options.integer => doc(Some("integer"), None),
        FieldKind::Id(options) => match options.strategy {
            IdStrategy::Uuid => doc(Some("string"), Some("uuid")),
            IdStrategy::Cuid => doc(Some("string"), Some("cuid")),
            IdStrategy::AutoIncrement => doc(Some("integer"), Some("int64")),
        },
        _ => kind_info(field.tag()).doc,
    }
}

/// Filter class; collection relations cannot be filtered by a single value.
pub fn filter_class(field: &FieldDefinition) -> FilterClass {
    match field.relation() {
        Some(relation) if relation.cardinality.is_many() => FilterClass::None,
        _ => kind_info(field.tag()).filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{has_many, integer, number};

    #[test]
    fn table_rows_are_indexed_by_tag() {
        for tag in KindTag::ALL {
            assert_eq!(kind_info(tag).tag, tag, "row out of order for {tag:?}");
        }
    }

    #[test]
    fn number_storage_follows_options() {
        assert_eq!(storage_class(&integer().build()), StorageClass::Integer);
        assert_eq!(storage_class(&number().precision(2).build()), StorageClass::Decimal);
        assert_eq!(storage_class(&number().build()), StorageClass::Float);
    }

    #[test]
    fn collection_relations_are_not_filterable() {
        assert_eq!(filter_class(&has_many("Post").build()), FilterClass::None);
    }
}
