//! TypeScript interface backend.
//!
//! Per entity: the read interface, create and update inputs, and a filter
//! interface built from the shared filter shapes in `types/filters.ts`.

use std::collections::BTreeSet;

use entigen_core::{
    Entity, FieldDefinition, FieldKind, FilterClass, IdStrategy, ScalarClass, filter_class,
    scalar_class,
};

use super::naming::{kebab_case, pascal_case};
use super::{Generator, GeneratorContext, quote, with_banner};
use crate::errors::GenerationError;
use crate::model::{Artifact, ArtifactKind, GenerateOptions};

const FILTERS: &str = r#"export interface StringFilter {
  equals?: string;
  contains?: string;
  startsWith?: string;
  endsWith?: string;
}

export interface ComparableFilter<T> {
  equals?: T;
  gt?: T;
  gte?: T;
  lt?: T;
  lte?: T;
}

export type NumberFilter = ComparableFilter<number>;

export type DateFilter = ComparableFilter<Date | string>;

export interface EnumFilter<T extends string> {
  equals?: T;
  in?: T[];
  notIn?: T[];
}

export interface EqualityFilter<T> {
  equals?: T;
  not?: T;
}
"#;

#[derive(Debug, Clone)]
pub struct TypeScriptGenerator {
    banner: bool,
}

impl TypeScriptGenerator {
    pub fn new(options: &GenerateOptions) -> Self {
        Self {
            banner: options.banner,
        }
    }
}

impl Generator for TypeScriptGenerator {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Types
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<Artifact>, GenerationError> {
        let mut artifacts: Vec<Artifact> = ctx
            .entities()
            .map(|entity| {
                Artifact::new(
                    format!("types/{}.ts", kebab_case(entity.name())),
                    render_entity(entity, ctx),
                    ArtifactKind::Types,
                )
            })
            .collect();
        artifacts.push(Artifact::new(
            "types/filters.ts",
            FILTERS,
            ArtifactKind::Types,
        ));
        Ok(artifacts)
    }

    fn after_file(&self, artifact: Artifact) -> Artifact {
        if self.banner {
            with_banner(artifact, "//")
        } else {
            artifact
        }
    }

    fn after(&self, artifacts: &[Artifact]) -> Vec<Artifact> {
        vec![Artifact::new(
            "types/index.ts",
            barrel(artifacts, "types/"),
            ArtifactKind::Types,
        )]
    }
}

/// `export * from "./x";` for every module under `prefix`.
pub(crate) fn barrel(artifacts: &[Artifact], prefix: &str) -> String {
    let mut out = String::new();
    for artifact in artifacts {
        let Some(module) = artifact
            .path
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(".ts"))
        else {
            continue;
        };
        if module != "index" {
            out.push_str(&format!("export * from {};\n", quote(&format!("./{module}"))));
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Read,
    Input,
}

struct Renderer<'a, 'c> {
    entity: &'a Entity,
    ctx: &'a GeneratorContext<'c>,
    imports: BTreeSet<String>,
}

fn render_entity(entity: &Entity, ctx: &GeneratorContext<'_>) -> String {
    let name = pascal_case(entity.name());
    let mut renderer = Renderer {
        entity,
        ctx,
        imports: BTreeSet::new(),
    };

    let mut body = String::new();

    if let Some(description) = &entity.options().description {
        body.push_str(&format!("/** {description} */\n"));
    }
    body.push_str(&format!("export interface {name} {{\n"));
    for (field_name, field) in entity.fields() {
        let ty = renderer.type_of(field, Context::Read);
        let optional = !field.presence().always_stored();
        body.push_str(&member(field_name, field, &ty, optional));
    }
    body.push_str("}\n\n");

    body.push_str(&format!("export interface Create{name}Input {{\n"));
    for (field_name, field) in entity.input_fields() {
        let ty = renderer.type_of(field, Context::Input);
        let optional = field.presence().optional_on_input();
        body.push_str(&member(field_name, field, &ty, optional));
    }
    body.push_str("}\n\n");

    body.push_str(&format!("export interface Update{name}Input {{\n"));
    for (field_name, field) in entity.input_fields() {
        let ty = renderer.type_of(field, Context::Input);
        body.push_str(&member(field_name, field, &ty, true));
    }
    body.push_str("}\n\n");

    let mut filters = BTreeSet::new();
    body.push_str(&format!("export interface {name}Filter {{\n"));
    for (field_name, field) in entity.fields() {
        if let Some(filter) = renderer.filter_of(field) {
            if let Some(shared) = filter.split('<').next() {
                filters.insert(shared.to_string());
            }
            body.push_str(&format!("  {}?: {filter};\n", property_key(field_name)));
        }
    }
    body.push_str("}\n");

    let mut out = String::new();
    if !filters.is_empty() {
        let names: Vec<String> = filters.into_iter().collect();
        out.push_str(&format!(
            "import type {{ {} }} from \"./filters\";\n",
            names.join(", ")
        ));
    }
    for target in &renderer.imports {
        out.push_str(&format!(
            "import type {{ {} }} from {};\n",
            pascal_case(target),
            quote(&format!("./{}", kebab_case(target)))
        ));
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&body);
    out
}

fn member(name: &str, field: &FieldDefinition, ty: &str, optional: bool) -> String {
    let mut out = String::new();
    match (field.description(), field.is_deprecated()) {
        (Some(description), true) => {
            out.push_str(&format!("  /**\n   * {description}\n   * @deprecated\n   */\n"))
        }
        (Some(description), false) => out.push_str(&format!("  /** {description} */\n")),
        (None, true) => out.push_str("  /** @deprecated */\n"),
        (None, false) => {}
    }
    let marker = if optional { "?" } else { "" };
    let null = if field.is_nullable() { " | null" } else { "" };
    out.push_str(&format!("  {}{marker}: {ty}{null};\n", property_key(name)));
    out
}

fn property_key(name: &str) -> String {
    let valid = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_' || first == '$')
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$');
    if valid { name.to_string() } else { quote(name) }
}

fn literal_union(values: &[String]) -> String {
    if values.is_empty() {
        "never".to_string()
    } else {
        values.iter().map(|value| quote(value)).collect::<Vec<_>>().join(" | ")
    }
}

impl Renderer<'_, '_> {
    fn type_of(&mut self, field: &FieldDefinition, context: Context) -> String {
        match field.kind() {
            FieldKind::Enum(options) => literal_union(&options.values),
            FieldKind::Array(options) => {
                let item = self.type_of(&options.item, context);
                if item.contains(' ') {
                    format!("Array<{item}>")
                } else {
                    format!("{item}[]")
                }
            }
            FieldKind::Relation(relation) => {
                let single = match context {
                    Context::Read => {
                        if relation.target != self.entity.name() {
                            self.imports.insert(relation.target.clone());
                        }
                        pascal_case(&relation.target)
                    }
                    Context::Input => self.reference_type(&relation.target).to_string(),
                };
                if relation.cardinality.is_many() {
                    format!("{single}[]")
                } else {
                    single
                }
            }
            FieldKind::Json(options) => match &options.shape {
                Some(shape) => {
                    let members: Vec<String> = shape
                        .iter()
                        .map(|(name, nested)| {
                            let ty = self.type_of(nested, context);
                            let marker = if nested.presence().optional_on_input() {
                                "?"
                            } else {
                                ""
                            };
                            let null = if nested.is_nullable() { " | null" } else { "" };
                            format!("{}{marker}: {ty}{null}", property_key(name))
                        })
                        .collect();
                    if members.is_empty() {
                        "Record<string, never>".to_string()
                    } else {
                        format!("{{ {} }}", members.join("; "))
                    }
                }
                None => "Record<string, unknown>".to_string(),
            },
            FieldKind::Localized(options) => {
                let members: Vec<String> = options
                    .locales
                    .iter()
                    .map(|locale| {
                        let marker = if options.required_locales.contains(locale) {
                            ""
                        } else {
                            "?"
                        };
                        format!("{}{marker}: string", property_key(locale))
                    })
                    .collect();
                format!("{{ {} }}", members.join("; "))
            }
            _ => match scalar_class(field) {
                ScalarClass::String => "string".to_string(),
                ScalarClass::Number => "number".to_string(),
                ScalarClass::Boolean => "boolean".to_string(),
                ScalarClass::Date => match context {
                    Context::Read => "Date".to_string(),
                    Context::Input => "string".to_string(),
                },
                _ => "unknown".to_string(),
            },
        }
    }

    /// Identifier type used to reference a record of `target` from input payloads.
    fn reference_type(&self, target: &str) -> &'static str {
        let key_kind = self
            .ctx
            .entity(target)
            .and_then(Entity::key_field)
            .map(|(_, field)| field.kind());
        match key_kind {
            Some(FieldKind::Id(options)) if options.strategy == IdStrategy::AutoIncrement => {
                "number"
            }
            Some(FieldKind::Number(_)) => "number",
            _ => "string",
        }
    }

    fn filter_of(&mut self, field: &FieldDefinition) -> Option<String> {
        let filter = match filter_class(field) {
            FilterClass::Text => "StringFilter".to_string(),
            FilterClass::Comparable => match scalar_class(field) {
                ScalarClass::Date => "DateFilter".to_string(),
                _ => "NumberFilter".to_string(),
            },
            FilterClass::Membership => {
                let values = field.enum_values().unwrap_or(&[]);
                format!("EnumFilter<{}>", literal_union(values))
            }
            FilterClass::Equality => {
                format!("EqualityFilter<{}>", self.type_of(field, Context::Input))
            }
            FilterClass::None => return None,
        };
        Some(filter)
    }
}
