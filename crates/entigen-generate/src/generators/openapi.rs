//! OpenAPI 3.0 component schemas.

use entigen_core::schema::decimal_step;
use entigen_core::{Entity, NumberSign, ValidationSchema, doc_type, paginated_schema};
use serde_json::{Map, Value, json};

use super::naming::pascal_case;
use super::{Generator, GeneratorContext};
use crate::errors::GenerationError;
use crate::model::{Artifact, ArtifactKind, GenerateOptions};

pub const DOCUMENT_PATH: &str = "openapi.json";
const OPENAPI_VERSION: &str = "3.0.3";

#[derive(Debug, Clone)]
pub struct OpenApiGenerator;

impl OpenApiGenerator {
    pub fn new(_options: &GenerateOptions) -> Self {
        Self
    }

    pub fn document(&self, ctx: &GeneratorContext<'_>) -> Value {
        let keys = ctx.reference_keys();
        let mut schemas = Map::new();
        for entity in ctx.entities() {
            let name = pascal_case(entity.name());

            let mut full = entity_node(entity, &entity.full_schema_with(&keys));
            if let Some(description) = &entity.options().description
                && let Some(object) = full.as_object_mut()
            {
                object.insert("description".to_string(), json!(description));
            }
            schemas.insert(name.clone(), full);
            schemas.insert(
                format!("Create{name}Input"),
                entity_node(entity, &entity.create_schema_with(&keys)),
            );
            schemas.insert(
                format!("Update{name}Input"),
                entity_node(entity, &entity.update_schema_with(&keys)),
            );
            schemas.insert(
                format!("{name}Query"),
                node(&entity.query_schema_with(&keys)),
            );

            let mut page = node(&paginated_schema(ValidationSchema::Any));
            if let Some(data) = page.pointer_mut("/properties/data/items") {
                *data = json!({ "$ref": format!("#/components/schemas/{name}") });
            }
            schemas.insert(format!("Paginated{name}"), page);
        }

        json!({
            "openapi": OPENAPI_VERSION,
            "info": {
                "title": "entigen",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "paths": {},
            "components": { "schemas": schemas },
        })
    }
}

impl Generator for OpenApiGenerator {
    fn name(&self) -> &'static str {
        "openapi"
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Docs
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<Artifact>, GenerationError> {
        let mut content = serde_json::to_string_pretty(&self.document(ctx))?;
        content.push('\n');
        Ok(vec![Artifact::new(DOCUMENT_PATH, content, ArtifactKind::Docs)])
    }
}

/// Object node for an entity view with per-field type and format taken from
/// the kind table.
fn entity_node(entity: &Entity, view: &ValidationSchema) -> Value {
    let mut root = node(view);
    if let Some(properties) = root
        .get_mut("properties")
        .and_then(Value::as_object_mut)
    {
        for (name, property) in properties.iter_mut() {
            let Some(field) = entity.field(name) else {
                continue;
            };
            let Some(object) = property.as_object_mut() else {
                continue;
            };
            let structural = matches!(
                object.get("type").and_then(Value::as_str),
                Some("array" | "object")
            ) || object.contains_key("enum");
            if structural {
                continue;
            }
            let doc = doc_type(field);
            if let Some(ty) = doc.ty {
                object.insert("type".to_string(), json!(ty));
            }
            if let Some(format) = doc.format {
                object.insert("format".to_string(), json!(format));
            }
        }
    }
    root
}

fn node(schema: &ValidationSchema) -> Value {
    let mut out = Map::new();
    write_node(schema, &mut out);
    Value::Object(out)
}

fn write_node(schema: &ValidationSchema, out: &mut Map<String, Value>) {
    match schema {
        ValidationSchema::Any => {}
        ValidationSchema::String(string) => {
            out.insert("type".into(), json!("string"));
            if let Some(format) = string.format {
                let format = match format.as_str() {
                    "url" => "uri",
                    other => other,
                };
                out.insert("format".into(), json!(format));
            }
            if let Some(min) = string.min_length {
                out.insert("minLength".into(), json!(min));
            }
            if let Some(max) = string.max_length {
                out.insert("maxLength".into(), json!(max));
            }
            if let Some(pattern) = &string.pattern {
                out.insert("pattern".into(), json!(pattern.as_str()));
            }
        }
        ValidationSchema::Number(number) => {
            let ty = if number.integer { "integer" } else { "number" };
            out.insert("type".into(), json!(ty));
            if let Some(min) = number.min {
                out.insert("minimum".into(), json!(min));
            }
            if let Some(max) = number.max {
                out.insert("maximum".into(), json!(max));
            }
            match number.sign {
                Some(NumberSign::Positive) if number.min.is_none_or(|min| min <= 0.0) => {
                    out.insert("minimum".into(), json!(0));
                    out.insert("exclusiveMinimum".into(), json!(true));
                }
                Some(NumberSign::Negative) if number.max.is_none_or(|max| max >= 0.0) => {
                    out.insert("maximum".into(), json!(0));
                    out.insert("exclusiveMaximum".into(), json!(true));
                }
                _ => {}
            }
            if let Some(places) = number.precision
                && !number.integer
            {
                out.insert("multipleOf".into(), json!(decimal_step(places)));
            }
        }
        ValidationSchema::Boolean => {
            out.insert("type".into(), json!("boolean"));
        }
        ValidationSchema::DateTime(_) => {
            out.insert("type".into(), json!("string"));
            out.insert("format".into(), json!("date-time"));
        }
        ValidationSchema::Enum(values) => {
            out.insert("type".into(), json!("string"));
            out.insert("enum".into(), json!(values));
        }
        ValidationSchema::Array(array) => {
            out.insert("type".into(), json!("array"));
            out.insert("items".into(), node(&array.item));
            if let Some(min) = array.min_items {
                out.insert("minItems".into(), json!(min));
            }
            if let Some(max) = array.max_items {
                out.insert("maxItems".into(), json!(max));
            }
        }
        ValidationSchema::Object(object) => {
            out.insert("type".into(), json!("object"));
            let properties: Map<String, Value> = object
                .fields
                .iter()
                .map(|(name, schema)| (name.clone(), node(schema)))
                .collect();
            out.insert("properties".into(), Value::Object(properties));
            let required = object.required_fields();
            if !required.is_empty() {
                out.insert("required".into(), json!(required));
            }
        }
        ValidationSchema::Localized(localized) => {
            out.insert("type".into(), json!("object"));
            let properties: Map<String, Value> = localized
                .locales
                .iter()
                .map(|locale| (locale.clone(), json!({ "type": "string" })))
                .collect();
            out.insert("properties".into(), Value::Object(properties));
            if !localized.required.is_empty() {
                out.insert("required".into(), json!(localized.required));
            }
            out.insert("additionalProperties".into(), json!(false));
        }
        ValidationSchema::Transform(inner, _) | ValidationSchema::Optional(inner) => {
            write_node(inner, out)
        }
        ValidationSchema::Nullable(inner) => {
            write_node(inner, out);
            out.insert("nullable".into(), json!(true));
        }
        ValidationSchema::Default(inner, value) => {
            write_node(inner, out);
            out.insert("default".into(), value.clone());
        }
        ValidationSchema::Annotated(inner, annotation) => {
            write_node(inner, out);
            if let Some(description) = &annotation.description {
                out.insert("description".into(), json!(description));
            }
            if annotation.deprecated {
                out.insert("deprecated".into(), json!(true));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entigen_core::{EntityOptions, email, field_map, id, number, text};
    use std::sync::Arc;

    fn document(entities: Vec<Entity>) -> Value {
        let entities: Vec<Arc<Entity>> = entities.into_iter().map(Arc::new).collect();
        let options = GenerateOptions::default();
        let ctx = GeneratorContext::new(&entities, &options);
        OpenApiGenerator::new(&options).document(&ctx)
    }

    #[test]
    fn projects_views_into_components() {
        let doc = document(vec![Entity::new(
            "User",
            field_map([
                ("name", text().max_length(80).required().description("Display name").build()),
                ("email", email().required().build()),
                ("age", number().int().positive().build()),
            ]),
            EntityOptions::new().timestamps(true),
        )]);

        assert_eq!(doc["openapi"], "3.0.3");
        let user = &doc["components"]["schemas"]["User"];
        assert_eq!(user["type"], "object");
        assert_eq!(
            user["required"],
            json!(["name", "email", "createdAt", "updatedAt"])
        );
        assert_eq!(user["properties"]["id"]["format"], "uuid");
        assert_eq!(user["properties"]["email"]["format"], "email");
        assert_eq!(user["properties"]["name"]["maxLength"], 80);
        assert_eq!(user["properties"]["name"]["description"], "Display name");
        assert_eq!(user["properties"]["age"]["type"], "integer");
        assert_eq!(user["properties"]["age"]["exclusiveMinimum"], true);
        assert_eq!(user["properties"]["createdAt"]["format"], "date-time");

        let create = &doc["components"]["schemas"]["CreateUserInput"];
        assert_eq!(create["required"], json!(["name", "email"]));
        assert!(create["properties"].get("createdAt").is_none());

        let update = &doc["components"]["schemas"]["UpdateUserInput"];
        assert!(update.get("required").is_none());

        let page = &doc["components"]["schemas"]["PaginatedUser"];
        assert_eq!(
            page["properties"]["data"]["items"]["$ref"],
            "#/components/schemas/User"
        );
    }

    #[test]
    fn auto_increment_ids_document_as_int64() {
        let doc = document(vec![Entity::new(
            "Counter",
            field_map([("id", id().auto_increment().build())]),
            EntityOptions::new(),
        )]);
        let property = &doc["components"]["schemas"]["Counter"]["properties"]["id"];
        assert_eq!(property["type"], "integer");
        assert_eq!(property["format"], "int64");
    }
}
