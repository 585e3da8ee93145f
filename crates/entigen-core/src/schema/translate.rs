use std::collections::HashMap;

use crate::entity::Entity;
use crate::field::{FieldDefinition, FieldKind, IdStrategy, NumberSign};
use crate::kinds::kind_info;

use super::{
    Annotation, ArraySchema, DateTimeSchema, LocalizedSchema, NumberSchema, ObjectSchema,
    Pattern, StringFormat, StringSchema, ValidationSchema,
};

/// Schema of the key a relation stores, per target entity.
///
/// Relations validate as a bare reference to the target's key: a uuid or cuid
/// string, or a positive integer for auto-increment keys.
#[derive(Debug, Clone, Default)]
pub struct ReferenceKeys {
    keys: HashMap<String, ValidationSchema>,
}

impl ReferenceKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entities<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let mut keys = Self::new();
        for entity in entities {
            keys.insert_entity(entity);
        }
        keys
    }

    pub fn insert_entity(&mut self, entity: &Entity) {
        match entity.key_field() {
            Some((_, field)) => {
                self.keys.insert(entity.name().to_string(), key_schema(field));
            }
            None => {
                self.keys.remove(entity.name());
            }
        }
    }

    /// Reference schema for `target`. Unknown targets and composite keys fall
    /// back to a uuid string.
    pub fn reference(&self, target: &str) -> ValidationSchema {
        self.keys
            .get(target)
            .cloned()
            .unwrap_or_else(|| ValidationSchema::formatted(StringFormat::Uuid))
    }
}

fn key_schema(field: &FieldDefinition) -> ValidationSchema {
    match field.kind() {
        FieldKind::Relation(_) => ValidationSchema::formatted(StringFormat::Uuid),
        _ => kind_schema(field, &ReferenceKeys::new()),
    }
}

/// Project one field definition into a validation schema, with relations
/// checked as uuid references.
pub fn to_validation_schema(field: &FieldDefinition) -> ValidationSchema {
    to_validation_schema_with(field, &ReferenceKeys::new())
}

/// Project one field definition into a validation schema.
///
/// Wrappers are applied in a fixed order: kind constraints, transforms,
/// nullability, optionality, default value, then annotations.
pub fn to_validation_schema_with(
    field: &FieldDefinition,
    keys: &ReferenceKeys,
) -> ValidationSchema {
    let mut schema = kind_schema(field, keys);

    if let Some(options) = field.kind().text_options()
        && !options.transforms.is_empty()
    {
        schema = ValidationSchema::Transform(Box::new(schema), options.transforms.clone());
    }
    if field.is_nullable() {
        schema = schema.nullable();
    }
    if field.presence().optional_on_input() {
        schema = schema.optional();
    }
    if let Some(default) = field.default_value() {
        schema = schema.with_default(default.clone());
    }
    if field.description().is_some() || field.is_deprecated() {
        schema = ValidationSchema::Annotated(
            Box::new(schema),
            Annotation {
                description: field.description().map(str::to_string),
                deprecated: field.is_deprecated(),
            },
        );
    }
    schema
}

fn kind_schema(field: &FieldDefinition, keys: &ReferenceKeys) -> ValidationSchema {
    match field.kind() {
        FieldKind::Text(options)
        | FieldKind::Email(options)
        | FieldKind::Url(options)
        | FieldKind::RichText(options) => ValidationSchema::String(StringSchema {
            min_length: options.min_length,
            max_length: options.max_length,
            pattern: options.pattern.as_deref().map(Pattern::new),
            format: kind_info(field.tag()).string_format,
        }),
        FieldKind::Number(options) => ValidationSchema::Number(NumberSchema {
            min: options.min,
            max: options.max,
            integer: options.integer,
            sign: options.sign,
            precision: options.precision,
        }),
        FieldKind::Boolean => ValidationSchema::Boolean,
        FieldKind::Date(options) => ValidationSchema::DateTime(DateTimeSchema {
            min: options.min,
            max: options.max,
        }),
        FieldKind::Enum(options) => ValidationSchema::Enum(options.values.clone()),
        FieldKind::Array(options) => ValidationSchema::Array(ArraySchema {
            item: Box::new(to_validation_schema_with(&options.item, keys)),
            min_items: options.min_items,
            max_items: options.max_items,
        }),
        FieldKind::Relation(options) => {
            let reference = keys.reference(&options.target);
            if options.cardinality.is_many() {
                ValidationSchema::array(reference)
            } else {
                reference
            }
        }
        FieldKind::Json(options) => match &options.shape {
            Some(shape) => ValidationSchema::Object(ObjectSchema {
                fields: shape
                    .iter()
                    .map(|(name, nested)| {
                        (name.clone(), to_validation_schema_with(nested, keys))
                    })
                    .collect(),
            }),
            None => ValidationSchema::Any,
        },
        FieldKind::Localized(options) => ValidationSchema::Localized(LocalizedSchema {
            locales: options.locales.clone(),
            required: options.required_locales.clone(),
        }),
        FieldKind::Id(options) => match options.strategy {
            IdStrategy::Uuid => ValidationSchema::formatted(StringFormat::Uuid),
            IdStrategy::Cuid => ValidationSchema::formatted(StringFormat::Cuid),
            IdStrategy::AutoIncrement => ValidationSchema::Number(NumberSchema {
                integer: true,
                sign: Some(NumberSign::Positive),
                ..NumberSchema::default()
            }),
        },
        FieldKind::Custom(_) => ValidationSchema::Any,
    }
}

/// Unconstrained schema for values compared against a field in a query filter.
pub(crate) fn filter_value_schema(
    field: &FieldDefinition,
    keys: &ReferenceKeys,
) -> ValidationSchema {
    match field.kind() {
        FieldKind::Number(options) => ValidationSchema::Number(NumberSchema {
            integer: options.integer,
            ..NumberSchema::default()
        }),
        FieldKind::Date(_) => ValidationSchema::DateTime(DateTimeSchema::default()),
        FieldKind::Text(_) | FieldKind::Email(_) | FieldKind::Url(_) | FieldKind::RichText(_) => {
            ValidationSchema::string()
        }
        FieldKind::Relation(options) => keys.reference(&options.target),
        _ => kind_schema(field, keys),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{
        array, belongs_to, boolean, custom, date, email, enumeration, has_many, id, integer,
        json, localized, number, rich_text, text, url,
    };
    use serde_json::json;

    fn accepts(field: &FieldDefinition, value: serde_json::Value) {
        let schema = to_validation_schema(field);
        if let Err(errors) = schema.parse(&value) {
            panic!("expected {value} to be accepted: {:?}", errors.issues());
        }
    }

    fn rejects(field: &FieldDefinition, value: serde_json::Value) {
        let schema = to_validation_schema(field);
        assert!(schema.parse(&value).is_err(), "expected {value} to be rejected");
    }

    #[test]
    fn every_kind_accepts_valid_and_rejects_invalid() {
        let name = text().length(2, 5).required().build();
        accepts(&name, json!("abc"));
        rejects(&name, json!("a"));

        let mail = email().required().build();
        accepts(&mail, json!("a@b.com"));
        rejects(&mail, json!("nope"));

        let site = url().required().build();
        accepts(&site, json!("https://example.com"));
        rejects(&site, json!("example"));

        let body = rich_text().required().build();
        accepts(&body, json!("long text"));
        rejects(&body, json!(12));

        let age = integer().min(0.0).max(130.0).required().build();
        accepts(&age, json!(42));
        rejects(&age, json!(4.5));
        rejects(&age, json!(-1));

        let price = number().positive().precision(2).required().build();
        accepts(&price, json!(9.99));
        rejects(&price, json!(9.999));
        rejects(&price, json!(0));

        let flag = boolean().required().build();
        accepts(&flag, json!(true));
        rejects(&flag, json!("true"));

        let born = date().required().build();
        accepts(&born, json!("2020-01-01T00:00:00Z"));
        rejects(&born, json!("yesterday"));

        let role = enumeration(["user", "admin"]).required().build();
        accepts(&role, json!("admin"));
        rejects(&role, json!("root"));

        let tags = array(text().min_length(1)).max_items(2).required().build();
        accepts(&tags, json!(["a", "b"]));
        rejects(&tags, json!(["a", "b", "c"]));
        rejects(&tags, json!([""]));

        let author = belongs_to("User").required().build();
        accepts(&author, json!("6f1c2a1e-8a55-4c7b-9a43-1f1b2c3d4e5f"));
        rejects(&author, json!({"id": "x"}));

        let posts = has_many("Post").required().build();
        accepts(&posts, json!(["6f1c2a1e-8a55-4c7b-9a43-1f1b2c3d4e5f"]));
        rejects(&posts, json!("6f1c2a1e-8a55-4c7b-9a43-1f1b2c3d4e5f"));

        let address = json().field("zip", text().required()).required().build();
        accepts(&address, json!({"zip": "12345"}));
        rejects(&address, json!({}));

        let title = localized(["en", "fr"]).require_locale("en").required().build();
        accepts(&title, json!({"en": "Hello"}));
        rejects(&title, json!({"fr": "Bonjour"}));
        rejects(&title, json!({"en": "Hello", "de": "Hallo"}));

        let key = id().build();
        accepts(&key, json!("6f1c2a1e-8a55-4c7b-9a43-1f1b2c3d4e5f"));
        rejects(&key, json!("1"));

        let serial = id().auto_increment().build();
        accepts(&serial, json!(7));
        rejects(&serial, json!(0));
    }

    #[test]
    fn custom_kinds_accept_anything() {
        let field = custom("Money").required().build();
        accepts(&field, json!({"amount": 1}));
        accepts(&field, json!("anything"));
    }

    #[test]
    fn transforms_run_after_validation() {
        let field = text().trim().lowercase().max_length(5).required().build();
        let schema = to_validation_schema(&field);
        assert_eq!(schema.parse(&json!(" ABC ")).expect("valid"), json!("abc"));
    }

    #[test]
    fn required_field_with_default_becomes_optional() {
        let field = text().required().default_value("guest").build();
        let schema = to_validation_schema(&field);
        assert!(schema.is_optional());
        assert_eq!(schema.default_value(), Some(&json!("guest")));
    }

    #[test]
    fn nullable_accepts_null() {
        let field = text().nullable().required().build();
        accepts(&field, json!(null));
    }

    #[test]
    fn annotations_wrap_the_outside() {
        let field = text().description("Display name").deprecated().build();
        let schema = to_validation_schema(&field);
        let annotation = schema.annotation().expect("annotated");
        assert_eq!(annotation.description.as_deref(), Some("Display name"));
        assert!(annotation.deprecated);
        assert!(schema.is_optional());
    }

    #[test]
    fn relations_follow_the_target_key() {
        use crate::compose::field_map;
        use crate::entity::EntityOptions;

        let tagged = Entity::new(
            "Tag",
            field_map([("key", id().cuid().build())]),
            EntityOptions::new(),
        );
        let counter = Entity::new(
            "Counter",
            field_map([("serial", id().auto_increment().build())]),
            EntityOptions::new(),
        );
        let keys = ReferenceKeys::from_entities([&tagged, &counter]);

        let tag = belongs_to("Tag").required().build();
        let schema = to_validation_schema_with(&tag, &keys);
        assert!(schema.is_valid(&json!("c1m8jh8htwdxciknp43poqrau")));
        assert!(!schema.is_valid(&json!("6f1c2a1e-8a55-4c7b-9a43-1f1b2c3d4e5f")));

        let counters = has_many("Counter").required().build();
        let schema = to_validation_schema_with(&counters, &keys);
        assert!(schema.is_valid(&json!([1, 2])));
        assert!(!schema.is_valid(&json!(["1"])));

        let unknown = belongs_to("Ghost").required().build();
        let schema = to_validation_schema_with(&unknown, &keys);
        assert!(schema.is_valid(&json!("6f1c2a1e-8a55-4c7b-9a43-1f1b2c3d4e5f")));
    }
}
