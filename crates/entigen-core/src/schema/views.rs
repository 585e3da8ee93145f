use serde_json::json;

use crate::entity::Entity;
use crate::field::FieldKind;
use crate::kinds::{FilterClass, filter_class};

use super::translate::{ReferenceKeys, filter_value_schema, to_validation_schema_with};
use super::{NumberSchema, ObjectSchema, ValidationSchema};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

/// Query keys taken by pagination and ordering.
pub const RESERVED_QUERY_KEYS: [&str; 4] = ["page", "limit", "orderBy", "order"];

/// Every field, including managed ones, with declared requiredness.
pub(crate) fn full_view(entity: &Entity, keys: &ReferenceKeys) -> ValidationSchema {
    ValidationSchema::Object(ObjectSchema {
        fields: entity
            .fields()
            .iter()
            .map(|(name, field)| (name.clone(), to_validation_schema_with(field, keys)))
            .collect(),
    })
}

/// Fields accepted in an insert payload.
pub(crate) fn create_view(entity: &Entity, keys: &ReferenceKeys) -> ValidationSchema {
    ValidationSchema::Object(ObjectSchema {
        fields: entity
            .input_fields()
            .map(|(name, field)| (name.to_string(), to_validation_schema_with(field, keys)))
            .collect(),
    })
}

/// Create-view fields, all optional and without defaults.
pub(crate) fn update_view(entity: &Entity, keys: &ReferenceKeys) -> ValidationSchema {
    ValidationSchema::Object(ObjectSchema {
        fields: entity
            .input_fields()
            .map(|(name, field)| {
                let schema = to_validation_schema_with(field, keys)
                    .without_default()
                    .optional();
                (name.to_string(), schema)
            })
            .collect(),
    })
}

/// List-endpoint query parameters, with relations resolved through the
/// default registry.
pub fn query_schema(entity: &Entity) -> ValidationSchema {
    entity.query_schema()
}

/// List-endpoint query parameters: pagination, ordering and per-field filters.
///
/// A key is owned by whichever entry claims it first. Pagination comes first,
/// then filters in field order; later claimants are left out and reported by
/// [`query_key_collisions`].
pub fn query_schema_with(entity: &Entity, keys: &ReferenceKeys) -> ValidationSchema {
    ValidationSchema::Object(build_query(entity, keys).object)
}

/// Filter keys dropped from the query schema because an earlier entry owns them.
pub fn query_key_collisions(entity: &Entity) -> Vec<String> {
    build_query(entity, &ReferenceKeys::new()).collisions
}

#[derive(Default)]
struct QueryKeys {
    object: ObjectSchema,
    collisions: Vec<String>,
}

impl QueryKeys {
    fn claim(&mut self, key: String, schema: ValidationSchema) {
        if self.object.get(&key).is_some() {
            self.collisions.push(key);
        } else {
            self.object.fields.insert(key, schema);
        }
    }
}

fn build_query(entity: &Entity, keys: &ReferenceKeys) -> QueryKeys {
    let mut query = QueryKeys::default();
    query.claim(
        "page".to_string(),
        ValidationSchema::Number(NumberSchema::integer().min(1.0))
            .with_default(json!(DEFAULT_PAGE)),
    );
    query.claim(
        "limit".to_string(),
        ValidationSchema::Number(NumberSchema::integer().min(1.0).max(MAX_LIMIT as f64))
            .with_default(json!(DEFAULT_LIMIT)),
    );

    let sortable = entity.sortable_fields();
    let order_by = if sortable.is_empty() {
        ValidationSchema::string()
    } else {
        ValidationSchema::Enum(sortable.into_iter().map(str::to_string).collect())
    };
    query.claim("orderBy".to_string(), order_by.optional());
    query.claim(
        "order".to_string(),
        ValidationSchema::Enum(vec!["asc".into(), "desc".into()]).with_default(json!("asc")),
    );

    for (name, field) in entity.fields() {
        match filter_class(field) {
            FilterClass::Text => {
                query.claim(name.clone(), ValidationSchema::string().optional());
                for suffix in ["Contains", "StartsWith", "EndsWith"] {
                    let schema = ValidationSchema::string().optional();
                    query.claim(format!("{name}{suffix}"), schema);
                }
            }
            FilterClass::Comparable => {
                query.claim(format!("{name}Min"), filter_value_schema(field, keys).optional());
                query.claim(format!("{name}Max"), filter_value_schema(field, keys).optional());
            }
            FilterClass::Membership => {
                query.claim(
                    format!("{name}In"),
                    ValidationSchema::array(filter_value_schema(field, keys)).optional(),
                );
            }
            FilterClass::Equality => {
                query.claim(name.clone(), filter_value_schema(field, keys).optional());
            }
            FilterClass::None => {}
        }
    }
    query
}

/// Wrapper for one page of list results.
pub fn paginated_schema(item: ValidationSchema) -> ValidationSchema {
    let count = || ValidationSchema::Number(NumberSchema::integer().min(0.0));
    let positive = || ValidationSchema::Number(NumberSchema::integer().min(1.0));
    ValidationSchema::Object(
        ObjectSchema::new()
            .field("data", ValidationSchema::array(item))
            .field("total", count())
            .field("page", positive())
            .field("limit", positive())
            .field("totalPages", count()),
    )
}

/// Whether a field can be used as an `orderBy` key.
pub(crate) fn is_sortable(kind: &FieldKind) -> bool {
    matches!(
        kind,
        FieldKind::Text(_)
            | FieldKind::Email(_)
            | FieldKind::Url(_)
            | FieldKind::Number(_)
            | FieldKind::Boolean
            | FieldKind::Date(_)
            | FieldKind::Enum(_)
            | FieldKind::Id(_)
    )
}
