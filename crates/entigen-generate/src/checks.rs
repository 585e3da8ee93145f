//! Per-entity checks run before any backend.
//!
//! Unresolved relations are errors; contradictory configuration is reported
//! as warnings and generation continues with the documented interpretation.

use std::collections::BTreeSet;

use entigen_core::{Entity, FieldDefinition, FieldKind, query_key_collisions};

use crate::generators::GeneratorContext;
use crate::model::GenerationIssue;

pub fn check_entity(entity: &Entity, ctx: &GeneratorContext<'_>) -> Vec<GenerationIssue> {
    let mut issues = Vec::new();

    for (name, _field, relation) in entity.relations() {
        if ctx.entity(&relation.target).is_none() {
            issues.push(
                GenerationIssue::error(
                    "unresolved_relation",
                    format!(
                        "{}.{} references unknown entity '{}'",
                        entity.name(),
                        name,
                        relation.target
                    ),
                )
                .with_entity(entity.name())
                .with_field(name),
            );
        }
    }

    for (name, field) in entity.fields() {
        check_field(entity.name(), name, field, &mut issues);
    }

    let mut indexed: Vec<&String> = entity
        .options()
        .indexes
        .iter()
        .flat_map(|index| index.fields.iter())
        .collect();
    if let Some(key) = &entity.options().composite_key {
        indexed.extend(key.iter());
    }
    for column in indexed {
        if entity.field(column).is_none() && !is_foreign_key_column(entity, column) {
            issues.push(
                GenerationIssue::warning(
                    "unknown_index_field",
                    format!("{} indexes unknown field '{column}'", entity.name()),
                )
                .with_entity(entity.name())
                .with_field(column.as_str()),
            );
        }
    }

    for key in query_key_collisions(entity) {
        issues.push(
            GenerationIssue::warning(
                "query_key_collision",
                format!(
                    "{} query parameter '{key}' is already taken; the later filter is dropped",
                    entity.name()
                ),
            )
            .with_entity(entity.name()),
        );
    }

    issues
}

fn is_foreign_key_column(entity: &Entity, column: &str) -> bool {
    entity.relations().any(|(name, _, relation)| {
        relation.cardinality.owns_foreign_key() && relation.foreign_key_for(name) == column
    })
}

fn check_field(entity: &str, path: &str, field: &FieldDefinition, issues: &mut Vec<GenerationIssue>) {
    let warn = |issues: &mut Vec<GenerationIssue>, code: &str, message: String| {
        issues.push(
            GenerationIssue::warning(code, message)
                .with_entity(entity)
                .with_field(path),
        );
    };

    if field.has_conflicting_default() {
        warn(
            issues,
            "required_with_default",
            format!("{entity}.{path} is required and has a default; treated as optional on input"),
        );
    }

    match field.kind() {
        FieldKind::Text(options)
        | FieldKind::Email(options)
        | FieldKind::Url(options)
        | FieldKind::RichText(options) => {
            if let (Some(min), Some(max)) = (options.min_length, options.max_length)
                && min > max
            {
                warn(
                    issues,
                    "inverted_bounds",
                    format!("{entity}.{path} min length {min} exceeds max length {max}"),
                );
            }
        }
        FieldKind::Number(options) => {
            if let (Some(min), Some(max)) = (options.min, options.max)
                && min > max
            {
                warn(
                    issues,
                    "inverted_bounds",
                    format!("{entity}.{path} minimum {min} exceeds maximum {max}"),
                );
            }
        }
        FieldKind::Date(options) => {
            if let (Some(min), Some(max)) = (options.min, options.max)
                && min > max
            {
                warn(
                    issues,
                    "inverted_bounds",
                    format!("{entity}.{path} earliest date is after latest date"),
                );
            }
        }
        FieldKind::Enum(options) => {
            if options.values.is_empty() {
                warn(
                    issues,
                    "empty_enum",
                    format!("{entity}.{path} declares no enum values"),
                );
            }
            let mut seen = BTreeSet::new();
            for value in &options.values {
                if !seen.insert(value) {
                    warn(
                        issues,
                        "duplicate_enum_value",
                        format!("{entity}.{path} repeats enum value '{value}'"),
                    );
                }
            }
        }
        FieldKind::Array(options) => {
            if let (Some(min), Some(max)) = (options.min_items, options.max_items)
                && min > max
            {
                warn(
                    issues,
                    "inverted_bounds",
                    format!("{entity}.{path} min items {min} exceeds max items {max}"),
                );
            }
            check_field(entity, &format!("{path}[]"), &options.item, issues);
        }
        FieldKind::Json(options) => {
            for (name, nested) in options.shape.iter().flatten() {
                check_field(entity, &format!("{path}.{name}"), nested, issues);
            }
        }
        FieldKind::Localized(options) => {
            let referenced = options
                .required_locales
                .iter()
                .chain(options.fallback.iter());
            for locale in referenced {
                if !options.locales.contains(locale) {
                    warn(
                        issues,
                        "unknown_locale_reference",
                        format!("{entity}.{path} references undeclared locale '{locale}'"),
                    );
                }
            }
        }
        FieldKind::Custom(options) => {
            warn(
                issues,
                "unsupported_kind",
                format!(
                    "{entity}.{path} uses custom kind '{}'; backends fall back to untyped output",
                    options.type_name
                ),
            );
        }
        FieldKind::Boolean | FieldKind::Relation(_) | FieldKind::Id(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entigen_core::{
        EntityOptions, IndexDefinition, belongs_to, custom, enumeration, field_map, localized,
        number, text,
    };
    use std::sync::Arc;

    use crate::model::GenerateOptions;

    fn codes(issues: &[GenerationIssue]) -> Vec<&str> {
        issues.iter().map(|issue| issue.code.as_str()).collect()
    }

    #[test]
    fn reports_configuration_warnings() {
        let entity = Entity::new(
            "Widget",
            field_map([
                ("name", text().required().default_value("x").build()),
                ("size", number().min(10.0).max(1.0).build()),
                ("kind", enumeration(["a", "a"]).build()),
                ("empty", enumeration(Vec::<String>::new()).build()),
                ("title", localized(["en"]).require_locale("fr").build()),
                ("blob", custom("Money").build()),
                ("limit", text().build()),
            ]),
            EntityOptions::new().index(IndexDefinition::new(["missing"])),
        );
        let entities = vec![Arc::new(entity)];
        let options = GenerateOptions::default();
        let ctx = GeneratorContext::new(&entities, &options);

        let issues = check_entity(&entities[0], &ctx);
        let codes = codes(&issues);
        for expected in [
            "required_with_default",
            "inverted_bounds",
            "duplicate_enum_value",
            "empty_enum",
            "unknown_locale_reference",
            "unsupported_kind",
            "unknown_index_field",
            "query_key_collision",
        ] {
            assert!(codes.contains(&expected), "missing {expected} in {codes:?}");
        }
        assert!(issues.iter().all(|issue| !issue.is_error()));
    }

    #[test]
    fn unresolved_relation_is_an_error_naming_the_field() {
        let post = Entity::new(
            "Post",
            field_map([("author", belongs_to("User").required().build())]),
            EntityOptions::new(),
        );
        let entities = vec![Arc::new(post)];
        let options = GenerateOptions::default();
        let ctx = GeneratorContext::new(&entities, &options);

        let issues = check_entity(&entities[0], &ctx);
        let error = issues.iter().find(|issue| issue.is_error()).expect("error");
        assert_eq!(error.code, "unresolved_relation");
        assert_eq!(error.entity.as_deref(), Some("Post"));
        assert_eq!(error.field.as_deref(), Some("author"));
        assert!(error.message.contains("Post.author"));
    }
}
