//! Prisma schema backend.

use entigen_core::{
    Cardinality, Entity, FieldDefinition, FieldKind, FieldRole, IdStrategy, ReferentialAction,
    RelationOptions, StorageClass, storage_class,
};
use serde_json::Value;

use super::naming::{identifier, pascal_case};
use super::{Generator, GeneratorContext, quote, with_banner};
use crate::errors::GenerationError;
use crate::model::{Artifact, ArtifactKind, GenerateOptions};

pub const SCHEMA_PATH: &str = "schema.prisma";

#[derive(Debug, Clone)]
pub struct PrismaGenerator {
    provider: String,
    banner: bool,
}

impl PrismaGenerator {
    pub fn new(options: &GenerateOptions) -> Self {
        Self {
            provider: options.database_provider.clone(),
            banner: options.banner,
        }
    }

    pub fn render(&self, ctx: &GeneratorContext<'_>) -> String {
        let mut enums = EnumBlocks::default();
        let models: Vec<String> = ctx
            .entities()
            .map(|entity| render_model(entity, ctx, &mut enums))
            .collect();

        let mut out = String::new();
        out.push_str("generator client {\n  provider = \"prisma-client-js\"\n}\n\n");
        out.push_str(&format!(
            "datasource db {{\n  provider = {}\n  url      = env(\"DATABASE_URL\")\n}}\n",
            quote(&self.provider)
        ));
        for block in enums.render() {
            out.push('\n');
            out.push_str(&block);
        }
        for model in models {
            out.push('\n');
            out.push_str(&model);
        }
        out
    }
}

impl Generator for PrismaGenerator {
    fn name(&self) -> &'static str {
        "prisma"
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Schema
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<Artifact>, GenerationError> {
        Ok(vec![Artifact::new(
            SCHEMA_PATH,
            self.render(ctx),
            ArtifactKind::Schema,
        )])
    }

    fn after_file(&self, artifact: Artifact) -> Artifact {
        if self.banner {
            with_banner(artifact, "//")
        } else {
            artifact
        }
    }
}

/// Enum blocks emitted once per distinct value set, first declaration names it.
#[derive(Debug, Default)]
struct EnumBlocks {
    blocks: Vec<(Vec<String>, String)>,
}

impl EnumBlocks {
    fn name_for(&mut self, entity: &str, field: &str, values: &[String]) -> String {
        if let Some((_, name)) = self.blocks.iter().find(|(known, _)| known == values) {
            return name.clone();
        }
        let base = format!("{}{}", pascal_case(entity), pascal_case(field));
        let mut name = base.clone();
        let mut suffix = 2;
        while self.blocks.iter().any(|(_, taken)| *taken == name) {
            name = format!("{base}{suffix}");
            suffix += 1;
        }
        self.blocks.push((values.to_vec(), name.clone()));
        name
    }

    fn render(&self) -> Vec<String> {
        self.blocks
            .iter()
            .map(|(values, name)| {
                let mut out = format!("enum {name} {{\n");
                for value in values {
                    let member = identifier(value);
                    if member == *value {
                        out.push_str(&format!("  {member}\n"));
                    } else {
                        out.push_str(&format!("  {member} @map({})\n", quote(value)));
                    }
                }
                out.push_str("}\n");
                out
            })
            .collect()
    }
}

#[derive(Debug)]
struct Column {
    name: String,
    ty: String,
    attributes: Vec<String>,
    docs: Vec<String>,
}

fn render_model(entity: &Entity, ctx: &GeneratorContext<'_>, enums: &mut EnumBlocks) -> String {
    let mut columns = Vec::new();
    let mut block = Vec::new();

    if let Some(key) = &entity.options().composite_key {
        block.push(format!("@@id([{}])", key.join(", ")));
    }

    for (name, field) in entity.fields() {
        match field.relation() {
            Some(relation) => {
                relation_columns(entity, name, field, relation, ctx, &mut columns);
                if field.is_indexed() && relation.cardinality.owns_foreign_key() {
                    push_unique(&mut block, format!("@@index([{}])", relation.foreign_key_for(name)));
                }
            }
            None => {
                columns.push(scalar_column(entity, name, field, enums));
                if field.is_indexed() && !field.is_unique() && !field.is_primary() {
                    push_unique(&mut block, format!("@@index([{name}])"));
                }
            }
        }
    }

    for index in &entity.options().indexes {
        if index.unique && is_field_level_unique(&columns, &index.fields) {
            continue;
        }
        let directive = if index.unique { "@@unique" } else { "@@index" };
        let mut line = format!("{directive}([{}]", index.fields.join(", "));
        if let Some(name) = &index.name {
            line.push_str(&format!(", map: {}", quote(name)));
        }
        line.push(')');
        push_unique(&mut block, line);
    }
    block.push(format!("@@map({})", quote(&entity.storage_name())));

    let name_width = columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
    let type_width = columns.iter().map(|c| c.ty.len()).max().unwrap_or(0);

    let mut out = String::new();
    if let Some(description) = &entity.options().description {
        out.push_str(&format!("/// {description}\n"));
    }
    out.push_str(&format!("model {} {{\n", entity.name()));
    for column in &columns {
        for doc in &column.docs {
            out.push_str(&format!("  /// {doc}\n"));
        }
        let line = format!(
            "  {:<name_width$} {:<type_width$} {}",
            column.name,
            column.ty,
            column.attributes.join(" ")
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.push('\n');
    for line in &block {
        out.push_str(&format!("  {line}\n"));
    }
    out.push_str("}\n");
    out
}

fn push_unique(block: &mut Vec<String>, line: String) {
    if !block.contains(&line) {
        block.push(line);
    }
}

/// A single-column unique index that the column's own `@unique` or `@id`
/// already covers. Generated foreign key columns count too.
fn is_field_level_unique(columns: &[Column], fields: &[String]) -> bool {
    let [only] = fields else {
        return false;
    };
    columns.iter().any(|column| {
        column.name == *only
            && column
                .attributes
                .iter()
                .any(|attribute| attribute == "@unique" || attribute == "@id")
    })
}

fn is_optional(field: &FieldDefinition) -> bool {
    field.is_nullable() || !field.presence().always_stored()
}

fn docs(field: &FieldDefinition) -> Vec<String> {
    let mut docs = Vec::new();
    if let Some(description) = field.description() {
        docs.push(description.to_string());
    }
    if field.is_deprecated() {
        docs.push("@deprecated".to_string());
    }
    docs
}

/// Prisma scalar type for a non-relation field. `None` for storage classes
/// with no scalar type (lists and references).
fn scalar_type(
    entity: &str,
    name: &str,
    field: &FieldDefinition,
    enums: &mut EnumBlocks,
) -> Option<String> {
    let ty = match storage_class(field) {
        StorageClass::String | StorageClass::LongText => "String".to_string(),
        StorageClass::Integer => "Int".to_string(),
        StorageClass::Float => "Float".to_string(),
        StorageClass::Decimal => "Decimal".to_string(),
        StorageClass::Boolean => "Boolean".to_string(),
        StorageClass::DateTime => "DateTime".to_string(),
        StorageClass::Json => "Json".to_string(),
        StorageClass::Enum => enums.name_for(entity, name, field.enum_values().unwrap_or(&[])),
        StorageClass::Identifier => match field.kind() {
            FieldKind::Id(options) if options.strategy == IdStrategy::AutoIncrement => {
                "Int".to_string()
            }
            _ => "String".to_string(),
        },
        StorageClass::List | StorageClass::Reference => return None,
    };
    Some(ty)
}

fn scalar_column(
    entity: &Entity,
    name: &str,
    field: &FieldDefinition,
    enums: &mut EnumBlocks,
) -> Column {
    let mut attributes = Vec::new();

    let ty = match field.kind() {
        FieldKind::Array(options) => match scalar_type(entity.name(), name, &options.item, enums)
        {
            Some(item) if item != "Json" => format!("{item}[]"),
            _ => "Json".to_string(),
        },
        _ => {
            let base = scalar_type(entity.name(), name, field, enums)
                .unwrap_or_else(|| "Json".to_string());
            if is_optional(field) {
                format!("{base}?")
            } else {
                base
            }
        }
    };

    if field.is_primary() && entity.options().composite_key.is_none() {
        attributes.push("@id".to_string());
    }
    if let FieldKind::Id(options) = field.kind() {
        attributes.push(
            match options.strategy {
                IdStrategy::Uuid => "@default(uuid())",
                IdStrategy::Cuid => "@default(cuid())",
                IdStrategy::AutoIncrement => "@default(autoincrement())",
            }
            .to_string(),
        );
    }
    if field.is_unique() && !field.is_primary() {
        attributes.push("@unique".to_string());
    }
    match field.role() {
        Some(FieldRole::CreatedAt) => attributes.push("@default(now())".to_string()),
        Some(FieldRole::UpdatedAt) => attributes.push("@updatedAt".to_string()),
        _ => {}
    }
    if let Some(literal) = field
        .default_value()
        .and_then(|value| default_literal(field, value))
    {
        attributes.push(format!("@default({literal})"));
    }
    if storage_class(field) == StorageClass::LongText {
        attributes.push("@db.Text".to_string());
    }

    Column {
        name: name.to_string(),
        ty,
        attributes,
        docs: docs(field),
    }
}

fn default_literal(field: &FieldDefinition, value: &Value) -> Option<String> {
    match (field.kind(), value) {
        (FieldKind::Enum(_), Value::String(member)) => Some(identifier(member)),
        (FieldKind::Array(_), _) => None,
        (FieldKind::Json(_) | FieldKind::Localized(_) | FieldKind::Custom(_), value) => {
            Some(quote(&value.to_string()))
        }
        (_, Value::String(text)) => Some(quote(text)),
        (_, Value::Number(number)) => Some(number.to_string()),
        (_, Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    }
}

fn action_name(action: ReferentialAction) -> &'static str {
    match action {
        ReferentialAction::Cascade => "Cascade",
        ReferentialAction::Restrict => "Restrict",
        ReferentialAction::SetNull => "SetNull",
        ReferentialAction::SetDefault => "SetDefault",
        ReferentialAction::NoAction => "NoAction",
    }
}

/// Referenced key column and its Prisma type on the target entity.
fn target_key(target: Option<&Entity>) -> (String, &'static str) {
    let Some(target) = target else {
        return ("id".to_string(), "String");
    };
    let Some((key, field)) = target.key_field() else {
        return ("id".to_string(), "String");
    };
    let ty = match field.kind() {
        FieldKind::Id(options) if options.strategy == IdStrategy::AutoIncrement => "Int",
        FieldKind::Number(options) if options.integer => "Int",
        _ => "String",
    };
    (key.to_string(), ty)
}

fn relation_columns(
    entity: &Entity,
    name: &str,
    field: &FieldDefinition,
    relation: &RelationOptions,
    ctx: &GeneratorContext<'_>,
    columns: &mut Vec<Column>,
) {
    if relation.cardinality.is_many() {
        let mut attributes = Vec::new();
        if let Some(table) = &relation.join_table {
            attributes.push(format!("@relation({})", quote(table)));
        }
        columns.push(Column {
            name: name.to_string(),
            ty: format!("{}[]", relation.target),
            attributes,
            docs: docs(field),
        });
        return;
    }

    let optional = if is_optional(field) { "?" } else { "" };
    let foreign_key = relation.foreign_key_for(name);
    let (references, key_type) = target_key(ctx.entity(&relation.target));

    let mut arguments = vec![
        format!("fields: [{foreign_key}]"),
        format!("references: [{references}]"),
    ];
    if let Some(action) = relation.on_delete {
        arguments.push(format!("onDelete: {}", action_name(action)));
    }
    if let Some(action) = relation.on_update {
        arguments.push(format!("onUpdate: {}", action_name(action)));
    }

    columns.push(Column {
        name: name.to_string(),
        ty: format!("{}{optional}", relation.target),
        attributes: vec![format!("@relation({})", arguments.join(", "))],
        docs: docs(field),
    });

    if entity.field(&foreign_key).is_none() {
        let mut attributes = Vec::new();
        if relation.cardinality == Cardinality::OneToOne || field.is_unique() {
            attributes.push("@unique".to_string());
        }
        columns.push(Column {
            name: foreign_key,
            ty: format!("{key_type}{optional}"),
            attributes,
            docs: Vec::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entigen_core::{EntityOptions, enumeration, field_map, rich_text, text};
    use std::sync::Arc;

    fn render(entities: Vec<Entity>) -> String {
        let entities: Vec<Arc<Entity>> = entities.into_iter().map(Arc::new).collect();
        let options = GenerateOptions::default();
        let ctx = GeneratorContext::new(&entities, &options);
        PrismaGenerator::new(&options).render(&ctx)
    }

    /// Whitespace-separated tokens of the column line starting with `name`.
    fn column<'a>(schema: &'a str, model: &str, name: &str) -> Vec<&'a str> {
        let header = format!("model {model} {{");
        schema
            .lines()
            .skip_while(|line| *line != header)
            .take_while(|line| *line != "}")
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .find(|tokens| tokens.first() == Some(&name))
            .unwrap_or_default()
    }

    #[test]
    fn enum_blocks_are_shared_by_value_set() {
        let schema = render(vec![
            Entity::new(
                "Order",
                field_map([("state", enumeration(["open", "closed"]).required().build())]),
                EntityOptions::new(),
            ),
            Entity::new(
                "Ticket",
                field_map([("state", enumeration(["open", "closed"]).required().build())]),
                EntityOptions::new(),
            ),
        ]);
        assert_eq!(schema.matches("enum OrderState {").count(), 1);
        assert!(!schema.contains("enum TicketState"));
        assert_eq!(column(&schema, "Ticket", "state")[1], "OrderState");
    }

    #[test]
    fn enum_members_are_mapped_to_identifiers() {
        let schema = render(vec![Entity::new(
            "Task",
            field_map([(
                "status",
                enumeration(["in-progress", "done"])
                    .default_value("in-progress")
                    .build(),
            )]),
            EntityOptions::new(),
        )]);
        assert!(schema.contains("in_progress @map(\"in-progress\")"));
        assert!(schema.contains("@default(in_progress)"));
    }

    #[test]
    fn long_text_and_storage_name() {
        let schema = render(vec![Entity::new(
            "Note",
            field_map([
                ("body", rich_text().required().build()),
                ("title", text().build()),
            ]),
            EntityOptions::new().storage_name("notes"),
        )]);
        assert!(schema.contains("@db.Text"));
        assert_eq!(column(&schema, "Note", "title")[1], "String?");
        assert!(schema.contains("@@map(\"notes\")"));
    }
}
