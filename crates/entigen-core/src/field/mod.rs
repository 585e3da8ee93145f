//! Field definitions: the per-attribute half of the intermediate representation.
//!
//! A [`FieldDefinition`] is an owned snapshot produced by a builder (see
//! [`builder`]) or deserialized from a declaration file. Nothing mutates a
//! definition after it exists; composition always produces new values.

mod builder;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kinds::KindTag;

pub use builder::{
    BooleanSpec, FieldBuilder, IntoFieldDefinition, KindSpec, TextSpec, array, belongs_to,
    boolean, custom, date, email, enumeration, has_many, has_one, id, integer, json, localized,
    many_to_many, number, relation, rich_text, text, url,
};

/// Kind-specific configuration of a field, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text(TextOptions),
    Email(TextOptions),
    Url(TextOptions),
    /// Unbounded text blob.
    RichText(TextOptions),
    Number(NumberOptions),
    Boolean,
    Date(DateOptions),
    Enum(EnumOptions),
    Array(ArrayOptions),
    Relation(RelationOptions),
    Json(JsonOptions),
    Localized(LocalizedOptions),
    Id(IdOptions),
    /// A kind no backend knows about; every projection degrades to "anything".
    Custom(CustomOptions),
}

impl FieldKind {
    pub fn tag(&self) -> KindTag {
        match self {
            FieldKind::Text(_) => KindTag::Text,
            FieldKind::Email(_) => KindTag::Email,
            FieldKind::Url(_) => KindTag::Url,
            FieldKind::RichText(_) => KindTag::RichText,
            FieldKind::Number(_) => KindTag::Number,
            FieldKind::Boolean => KindTag::Boolean,
            FieldKind::Date(_) => KindTag::Date,
            FieldKind::Enum(_) => KindTag::Enum,
            FieldKind::Array(_) => KindTag::Array,
            FieldKind::Relation(_) => KindTag::Relation,
            FieldKind::Json(_) => KindTag::Json,
            FieldKind::Localized(_) => KindTag::Localized,
            FieldKind::Id(_) => KindTag::Id,
            FieldKind::Custom(_) => KindTag::Custom,
        }
    }

    /// Text options shared by the text, email, url and rich text kinds.
    pub fn text_options(&self) -> Option<&TextOptions> {
        match self {
            FieldKind::Text(options)
            | FieldKind::Email(options)
            | FieldKind::Url(options)
            | FieldKind::RichText(options) => Some(options),
            _ => None,
        }
    }
}

/// Post-validation rewrite applied to text values, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TextTransform {
    Trim,
    Lowercase,
    Uppercase,
    Slugify,
}

impl TextTransform {
    pub fn apply(self, value: &str) -> String {
        match self {
            TextTransform::Trim => value.trim().to_string(),
            TextTransform::Lowercase => value.to_lowercase(),
            TextTransform::Uppercase => value.to_uppercase(),
            TextTransform::Slugify => slugify(value),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextTransform::Trim => "trim",
            TextTransform::Lowercase => "lowercase",
            TextTransform::Uppercase => "uppercase",
            TextTransform::Slugify => "slugify",
        }
    }
}

fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TextOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<TextTransform>,
    /// The value is filled by the system (e.g. a slug) when omitted.
    #[serde(skip_serializing_if = "is_false")]
    pub auto_generate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NumberSign {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NumberOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "is_false")]
    pub integer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<NumberSign>,
    /// Maximum number of decimal places.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EnumOptions {
    /// Ordered literal members. Expected to be non-empty and unique; this is
    /// reported by generation, never rejected here.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArrayOptions {
    pub item: Box<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// True when the field holds a collection of related records.
    pub fn is_many(self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::ManyToMany)
    }

    /// True when this side of the relation stores the foreign key column.
    pub fn owns_foreign_key(self) -> bool {
        matches!(self, Cardinality::OneToOne | Cardinality::ManyToOne)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one_to_one",
            Cardinality::OneToMany => "one_to_many",
            Cardinality::ManyToOne => "many_to_one",
            Cardinality::ManyToMany => "many_to_many",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RelationOptions {
    /// Name of the related entity, resolved lazily at generation time.
    pub target: String,
    pub cardinality: Cardinality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

impl RelationOptions {
    /// Foreign key column name for the owning side, defaulting to `<field>Id`.
    pub fn foreign_key_for(&self, field_name: &str) -> String {
        self.foreign_key
            .clone()
            .unwrap_or_else(|| format!("{field_name}Id"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct JsonOptions {
    /// Optional nested shape; `None` means any JSON value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<IndexMap<String, FieldDefinition>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LocalizedOptions {
    pub locales: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_locales: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    #[default]
    Uuid,
    Cuid,
    AutoIncrement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IdOptions {
    pub strategy: IdStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CustomOptions {
    pub type_name: String,
}

/// Role of a field the entity manages on behalf of the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Primary,
    /// Identifier injected by the entity; storage assigns its value.
    GeneratedKey,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

/// Derived requiredness shared by the translator and every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be supplied and is always stored.
    Required,
    /// May be omitted on input; a default or the system fills it.
    Defaulted,
    /// May be omitted and may be absent when stored.
    Optional,
}

impl Presence {
    /// Whether the field may be omitted from an input payload.
    pub fn optional_on_input(self) -> bool {
        !matches!(self, Presence::Required)
    }

    /// Whether a stored record always carries the field.
    pub fn always_stored(self) -> bool {
        !matches!(self, Presence::Optional)
    }
}

/// Immutable description of one entity attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    kind: FieldKind,
    #[serde(default, skip_serializing_if = "is_false")]
    required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    nullable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    unique: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    indexed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<FieldRole>,
}

impl FieldDefinition {
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    /// The `required` flag exactly as declared. Use [`presence`](Self::presence)
    /// for the effective rule.
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn role(&self) -> Option<FieldRole> {
        self.role
    }

    pub fn is_managed(&self) -> bool {
        self.role.is_some()
    }

    pub fn is_primary(&self) -> bool {
        matches!(self.role, Some(FieldRole::Primary | FieldRole::GeneratedKey))
    }

    pub fn is_auto_generated(&self) -> bool {
        self.kind
            .text_options()
            .is_some_and(|options| options.auto_generate)
    }

    pub fn relation(&self) -> Option<&RelationOptions> {
        match &self.kind {
            FieldKind::Relation(options) => Some(options),
            _ => None,
        }
    }

    pub fn enum_values(&self) -> Option<&[String]> {
        match &self.kind {
            FieldKind::Enum(options) => Some(&options.values),
            _ => None,
        }
    }

    /// Whether the declaration asks for both `required` and a default value.
    pub fn has_conflicting_default(&self) -> bool {
        self.required && self.default.is_some() && self.role.is_none()
    }

    /// Effective requiredness. A default value (or an auto-generated value)
    /// always makes a field omittable on input, even when declared required.
    pub fn presence(&self) -> Presence {
        match self.role {
            Some(FieldRole::Primary | FieldRole::CreatedAt | FieldRole::UpdatedAt) => {
                return Presence::Required;
            }
            Some(FieldRole::GeneratedKey) => return Presence::Defaulted,
            Some(FieldRole::DeletedAt) => return Presence::Optional,
            None => {}
        }

        if self.default.is_some() || self.is_auto_generated() {
            Presence::Defaulted
        } else if self.required {
            Presence::Required
        } else {
            Presence::Optional
        }
    }

    pub(crate) fn with_role(mut self, role: FieldRole) -> Self {
        self.role = Some(role);
        self
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(TextTransform::Slugify.apply("  Hello, World!  "), "hello-world");
        assert_eq!(TextTransform::Slugify.apply("a--b__c"), "a-b-c");
    }

    #[test]
    fn default_makes_required_field_defaulted() {
        let field = text().required().default_value("x").build();
        assert!(field.has_conflicting_default());
        assert_eq!(field.presence(), Presence::Defaulted);
        assert!(field.presence().optional_on_input());
        assert!(field.presence().always_stored());
    }

    #[test]
    fn field_definition_serializes_with_kind_tag() {
        let field = number().int().min(1.0).required().build();
        let json = serde_json::to_value(&field).expect("serialize field");
        assert_eq!(json["type"]["kind"], "number");
        assert_eq!(json["type"]["integer"], true);
        assert_eq!(json["required"], true);

        let back: FieldDefinition = serde_json::from_value(json).expect("deserialize field");
        assert_eq!(back, field);
    }
}
