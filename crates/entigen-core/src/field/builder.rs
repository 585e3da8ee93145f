//! Fluent builders producing [`FieldDefinition`] snapshots.
//!
//! Every method consumes and returns the builder. [`FieldBuilder::build`]
//! borrows and copies, so a builder can keep being refined after a snapshot
//! was taken without affecting that snapshot. No method validates its input;
//! contradictory settings surface later in the translator or a generator.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use super::{
    ArrayOptions, Cardinality, CustomOptions, DateOptions, EnumOptions, FieldDefinition,
    FieldKind, FieldRole, IdOptions, IdStrategy, JsonOptions, LocalizedOptions, NumberOptions,
    NumberSign, ReferentialAction, RelationOptions, TextOptions, TextTransform,
};

/// Kind-specific state held by a [`FieldBuilder`].
pub trait KindSpec: Clone {
    fn to_kind(&self) -> FieldKind;
}

/// Anything that can become a field definition: builders and finished definitions.
pub trait IntoFieldDefinition {
    fn into_field_definition(self) -> FieldDefinition;
}

impl IntoFieldDefinition for FieldDefinition {
    fn into_field_definition(self) -> FieldDefinition {
        self
    }
}

impl<S: KindSpec> IntoFieldDefinition for FieldBuilder<S> {
    fn into_field_definition(self) -> FieldDefinition {
        self.build()
    }
}

impl<S: KindSpec> IntoFieldDefinition for &FieldBuilder<S> {
    fn into_field_definition(self) -> FieldDefinition {
        self.build()
    }
}

#[derive(Debug, Clone, Default)]
struct FieldMeta {
    required: bool,
    nullable: bool,
    unique: bool,
    indexed: bool,
    default: Option<Value>,
    description: Option<String>,
    deprecated: bool,
    role: Option<FieldRole>,
}

#[derive(Debug, Clone)]
pub struct FieldBuilder<S> {
    state: S,
    meta: FieldMeta,
}

impl<S: KindSpec> FieldBuilder<S> {
    fn new(state: S) -> Self {
        Self {
            state,
            meta: FieldMeta::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.meta.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.meta.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.meta.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.meta.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.meta.indexed = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.meta.default = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.meta.deprecated = true;
        self
    }

    /// Snapshot the accumulated configuration.
    pub fn build(&self) -> FieldDefinition {
        let meta = self.meta.clone();
        FieldDefinition {
            kind: self.state.to_kind(),
            required: meta.required,
            nullable: meta.nullable,
            unique: meta.unique,
            indexed: meta.indexed,
            default: meta.default,
            description: meta.description,
            deprecated: meta.deprecated,
            role: meta.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextVariant {
    Plain,
    Email,
    Url,
    Rich,
}

#[derive(Debug, Clone)]
pub struct TextSpec {
    variant: TextVariant,
    options: TextOptions,
}

impl KindSpec for TextSpec {
    fn to_kind(&self) -> FieldKind {
        let options = self.options.clone();
        match self.variant {
            TextVariant::Plain => FieldKind::Text(options),
            TextVariant::Email => FieldKind::Email(options),
            TextVariant::Url => FieldKind::Url(options),
            TextVariant::Rich => FieldKind::RichText(options),
        }
    }
}

impl FieldBuilder<TextSpec> {
    pub fn min_length(mut self, length: usize) -> Self {
        self.state.options.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.state.options.max_length = Some(length);
        self
    }

    pub fn length(self, min: usize, max: usize) -> Self {
        self.min_length(min).max_length(max)
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.state.options.pattern = Some(pattern.into());
        self
    }

    pub fn transform(mut self, transform: TextTransform) -> Self {
        self.state.options.transforms.push(transform);
        self
    }

    pub fn trim(self) -> Self {
        self.transform(TextTransform::Trim)
    }

    pub fn lowercase(self) -> Self {
        self.transform(TextTransform::Lowercase)
    }

    pub fn uppercase(self) -> Self {
        self.transform(TextTransform::Uppercase)
    }

    pub fn auto_generate(mut self) -> Self {
        self.state.options.auto_generate = true;
        self
    }
}

impl KindSpec for NumberOptions {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Number(self.clone())
    }
}

impl FieldBuilder<NumberOptions> {
    pub fn min(mut self, min: f64) -> Self {
        self.state.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.state.max = Some(max);
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn int(mut self) -> Self {
        self.state.integer = true;
        self
    }

    pub fn positive(mut self) -> Self {
        self.state.sign = Some(NumberSign::Positive);
        self
    }

    pub fn negative(mut self) -> Self {
        self.state.sign = Some(NumberSign::Negative);
        self
    }

    pub fn precision(mut self, places: u32) -> Self {
        self.state.precision = Some(places);
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanSpec;

impl KindSpec for BooleanSpec {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Boolean
    }
}

impl KindSpec for DateOptions {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Date(self.clone())
    }
}

impl FieldBuilder<DateOptions> {
    pub fn min(mut self, min: DateTime<Utc>) -> Self {
        self.state.min = Some(min);
        self
    }

    pub fn max(mut self, max: DateTime<Utc>) -> Self {
        self.state.max = Some(max);
        self
    }
}

impl KindSpec for EnumOptions {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Enum(self.clone())
    }
}

impl KindSpec for ArrayOptions {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Array(self.clone())
    }
}

impl FieldBuilder<ArrayOptions> {
    pub fn min_items(mut self, count: usize) -> Self {
        self.state.min_items = Some(count);
        self
    }

    pub fn max_items(mut self, count: usize) -> Self {
        self.state.max_items = Some(count);
        self
    }
}

impl KindSpec for RelationOptions {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Relation(self.clone())
    }
}

impl FieldBuilder<RelationOptions> {
    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.state.foreign_key = Some(column.into());
        self
    }

    pub fn join_table(mut self, table: impl Into<String>) -> Self {
        self.state.join_table = Some(table.into());
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.state.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.state.on_update = Some(action);
        self
    }

    pub fn cascade(self) -> Self {
        self.on_delete(ReferentialAction::Cascade)
    }
}

impl KindSpec for JsonOptions {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Json(self.clone())
    }
}

impl FieldBuilder<JsonOptions> {
    pub fn shape(mut self, shape: IndexMap<String, FieldDefinition>) -> Self {
        self.state.shape = Some(shape);
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: impl IntoFieldDefinition) -> Self {
        self.state
            .shape
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), field.into_field_definition());
        self
    }
}

impl KindSpec for LocalizedOptions {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Localized(self.clone())
    }
}

impl FieldBuilder<LocalizedOptions> {
    pub fn require_locale(mut self, locale: impl Into<String>) -> Self {
        let locale = locale.into();
        if !self.state.required_locales.contains(&locale) {
            self.state.required_locales.push(locale);
        }
        self
    }

    pub fn fallback(mut self, locale: impl Into<String>) -> Self {
        self.state.fallback = Some(locale.into());
        self
    }
}

impl KindSpec for IdOptions {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Id(self.clone())
    }
}

impl FieldBuilder<IdOptions> {
    pub fn strategy(mut self, strategy: IdStrategy) -> Self {
        self.state.strategy = strategy;
        self
    }

    pub fn cuid(self) -> Self {
        self.strategy(IdStrategy::Cuid)
    }

    pub fn auto_increment(self) -> Self {
        self.strategy(IdStrategy::AutoIncrement)
    }
}

impl KindSpec for CustomOptions {
    fn to_kind(&self) -> FieldKind {
        FieldKind::Custom(self.clone())
    }
}

fn text_builder(variant: TextVariant) -> FieldBuilder<TextSpec> {
    FieldBuilder::new(TextSpec {
        variant,
        options: TextOptions::default(),
    })
}

pub fn text() -> FieldBuilder<TextSpec> {
    text_builder(TextVariant::Plain)
}

pub fn email() -> FieldBuilder<TextSpec> {
    text_builder(TextVariant::Email)
}

pub fn url() -> FieldBuilder<TextSpec> {
    text_builder(TextVariant::Url)
}

/// Long-form text without an implied length limit.
pub fn rich_text() -> FieldBuilder<TextSpec> {
    text_builder(TextVariant::Rich)
}

pub fn number() -> FieldBuilder<NumberOptions> {
    FieldBuilder::new(NumberOptions::default())
}

pub fn integer() -> FieldBuilder<NumberOptions> {
    number().int()
}

pub fn boolean() -> FieldBuilder<BooleanSpec> {
    FieldBuilder::new(BooleanSpec)
}

pub fn date() -> FieldBuilder<DateOptions> {
    FieldBuilder::new(DateOptions::default())
}

pub fn enumeration<I, V>(values: I) -> FieldBuilder<EnumOptions>
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    FieldBuilder::new(EnumOptions {
        values: values.into_iter().map(Into::into).collect(),
    })
}

pub fn array(item: impl IntoFieldDefinition) -> FieldBuilder<ArrayOptions> {
    FieldBuilder::new(ArrayOptions {
        item: Box::new(item.into_field_definition()),
        min_items: None,
        max_items: None,
    })
}

pub fn relation(target: impl Into<String>, cardinality: Cardinality) -> FieldBuilder<RelationOptions> {
    FieldBuilder::new(RelationOptions {
        target: target.into(),
        cardinality,
        foreign_key: None,
        join_table: None,
        on_delete: None,
        on_update: None,
    })
}

pub fn belongs_to(target: impl Into<String>) -> FieldBuilder<RelationOptions> {
    relation(target, Cardinality::ManyToOne)
}

pub fn has_one(target: impl Into<String>) -> FieldBuilder<RelationOptions> {
    relation(target, Cardinality::OneToOne)
}

pub fn has_many(target: impl Into<String>) -> FieldBuilder<RelationOptions> {
    relation(target, Cardinality::OneToMany)
}

pub fn many_to_many(target: impl Into<String>) -> FieldBuilder<RelationOptions> {
    relation(target, Cardinality::ManyToMany)
}

pub fn json() -> FieldBuilder<JsonOptions> {
    FieldBuilder::new(JsonOptions::default())
}

pub fn localized<I, V>(locales: I) -> FieldBuilder<LocalizedOptions>
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    FieldBuilder::new(LocalizedOptions {
        locales: locales.into_iter().map(Into::into).collect(),
        required_locales: Vec::new(),
        fallback: None,
    })
}

/// Primary identifier; implicitly required.
pub fn id() -> FieldBuilder<IdOptions> {
    let mut builder = FieldBuilder::new(IdOptions::default());
    builder.meta.required = true;
    builder.meta.role = Some(FieldRole::Primary);
    builder
}

pub fn custom(type_name: impl Into<String>) -> FieldBuilder<CustomOptions> {
    FieldBuilder::new(CustomOptions {
        type_name: type_name.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::KindTag;

    #[test]
    fn build_snapshots_are_independent_of_later_changes() {
        let builder = text().min_length(2);
        let first = builder.build();
        let second = builder.clone().max_length(10).required().build();

        assert_eq!(first.kind().text_options().and_then(|o| o.max_length), None);
        assert!(!first.is_required());
        assert_eq!(second.kind().text_options().and_then(|o| o.max_length), Some(10));
        assert!(second.is_required());
    }

    #[test]
    fn contradictory_bounds_are_accepted_by_builders() {
        let field = number().max(1.0).min(5.0).build();
        let FieldKind::Number(options) = field.kind() else {
            panic!("expected number kind");
        };
        assert_eq!(options.min, Some(5.0));
        assert_eq!(options.max, Some(1.0));
    }

    #[test]
    fn id_is_primary_and_required() {
        let field = id().cuid().build();
        assert!(field.is_primary());
        assert!(field.is_required());
        assert_eq!(field.tag(), KindTag::Id);
    }

    #[test]
    fn text_variants_carry_their_own_tags() {
        assert_eq!(email().build().tag(), KindTag::Email);
        assert_eq!(url().build().tag(), KindTag::Url);
        assert_eq!(rich_text().build().tag(), KindTag::RichText);
        assert_eq!(text().build().tag(), KindTag::Text);
    }

    #[test]
    fn json_fields_accumulate_shape() {
        let field = json()
            .field("street", text().required())
            .field("zip", text())
            .build();
        let FieldKind::Json(options) = field.kind() else {
            panic!("expected json kind");
        };
        let shape = options.shape.as_ref().expect("shape set");
        assert_eq!(shape.keys().collect::<Vec<_>>(), vec!["street", "zip"]);
    }
}
