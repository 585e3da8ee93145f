//! Zod validator backend, rendered from the core validation views.

use entigen_core::schema::{
    ArraySchema, DateTimeSchema, decimal_step, LocalizedSchema, NumberSchema, ObjectSchema, StringSchema,
};
use entigen_core::{
    Entity, NumberSign, ReferenceKeys, StringFormat, TextTransform, ValidationSchema,
    paginated_schema,
};

use super::naming::{kebab_case, pascal_case};
use super::typescript::barrel;
use super::{Generator, GeneratorContext, format_number, quote, with_banner};
use crate::errors::GenerationError;
use crate::model::{Artifact, ArtifactKind, GenerateOptions};

const SLUGIFY: &str = r#"const slugify = (value: string): string =>
  value
    .toLowerCase()
    .replace(/[^a-z0-9]+/g, "-")
    .replace(/^-+|-+$/g, "");
"#;

#[derive(Debug, Clone)]
pub struct ZodGenerator {
    banner: bool,
}

impl ZodGenerator {
    pub fn new(options: &GenerateOptions) -> Self {
        Self {
            banner: options.banner,
        }
    }
}

impl Generator for ZodGenerator {
    fn name(&self) -> &'static str {
        "zod"
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Validators
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<Artifact>, GenerationError> {
        let keys = ctx.reference_keys();
        Ok(ctx
            .entities()
            .map(|entity| {
                Artifact::new(
                    format!("validators/{}.ts", kebab_case(entity.name())),
                    render_entity(entity, &keys),
                    ArtifactKind::Validators,
                )
            })
            .collect())
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
            "validators/index.ts",
            barrel(artifacts, "validators/"),
            ArtifactKind::Validators,
        )]
    }
}

#[derive(Debug, Default)]
struct Renderer {
    coerce: bool,
    needs_slugify: bool,
}

fn render_entity(entity: &Entity, keys: &ReferenceKeys) -> String {
    let name = pascal_case(entity.name());
    let mut renderer = Renderer::default();
    let mut body = String::new();

    let views = [
        (format!("{name}Schema"), name.clone(), entity.full_schema_with(keys)),
        (
            format!("Create{name}Schema"),
            format!("Create{name}Input"),
            entity.create_schema_with(keys),
        ),
        (
            format!("Update{name}Schema"),
            format!("Update{name}Input"),
            entity.update_schema_with(keys),
        ),
    ];
    for (schema_name, type_name, schema) in &views {
        body.push_str(&format!(
            "export const {schema_name} = {};\n",
            renderer.render(schema, 0)
        ));
        body.push_str(&format!(
            "export type {type_name} = z.infer<typeof {schema_name}>;\n\n"
        ));
    }

    renderer.coerce = true;
    body.push_str(&format!(
        "export const {name}QuerySchema = {};\n",
        renderer.render(&entity.query_schema_with(keys), 0)
    ));
    body.push_str(&format!(
        "export type {name}Query = z.infer<typeof {name}QuerySchema>;\n\n"
    ));
    renderer.coerce = false;

    let page = paginated_schema(ValidationSchema::Any);
    let mut lines = Vec::new();
    if let Some(object) = page.as_object() {
        for (field, schema) in &object.fields {
            let rendered = if field == "data" {
                format!("z.array({name}Schema)")
            } else {
                renderer.render(schema, 1)
            };
            lines.push(format!("  {field}: {rendered},"));
        }
    }
    body.push_str(&format!(
        "export const Paginated{name}Schema = z.object({{\n{}\n}});\n",
        lines.join("\n")
    ));
    body.push_str(&format!(
        "export type Paginated{name} = z.infer<typeof Paginated{name}Schema>;\n"
    ));

    let mut out = String::from("import { z } from \"zod\";\n\n");
    if renderer.needs_slugify {
        out.push_str(SLUGIFY);
        out.push('\n');
    }
    out.push_str(&body);
    out
}

impl Renderer {
    fn render(&mut self, schema: &ValidationSchema, depth: usize) -> String {
        match schema {
            ValidationSchema::Any => "z.unknown()".to_string(),
            ValidationSchema::String(string) => render_string(string),
            ValidationSchema::Number(number) => self.render_number(number),
            ValidationSchema::Boolean => {
                if self.coerce {
                    "z.coerce.boolean()".to_string()
                } else {
                    "z.boolean()".to_string()
                }
            }
            ValidationSchema::DateTime(date) => render_date(date),
            ValidationSchema::Enum(values) => render_enum(values),
            ValidationSchema::Array(array) => self.render_array(array, depth),
            ValidationSchema::Object(object) => self.render_object(object, depth),
            ValidationSchema::Localized(localized) => render_localized(localized),
            ValidationSchema::Transform(inner, transforms) => {
                let base = self.render(inner, depth);
                let expression = self.transform_expression(transforms);
                format!("{base}.transform((value) => {expression})")
            }
            ValidationSchema::Nullable(inner) => format!("{}.nullable()", self.render(inner, depth)),
            ValidationSchema::Optional(inner) => format!("{}.optional()", self.render(inner, depth)),
            ValidationSchema::Default(inner, value) => {
                format!("{}.default({value})", self.render(inner, depth))
            }
            ValidationSchema::Annotated(inner, annotation) => {
                let base = self.render(inner, depth);
                match &annotation.description {
                    Some(description) => format!("{base}.describe({})", quote(description)),
                    None => base,
                }
            }
        }
    }

    fn render_number(&self, number: &NumberSchema) -> String {
        let mut out = if self.coerce {
            "z.coerce.number()".to_string()
        } else {
            "z.number()".to_string()
        };
        if number.integer {
            out.push_str(".int()");
        }
        if let Some(min) = number.min {
            out.push_str(&format!(".min({})", format_number(min)));
        }
        if let Some(max) = number.max {
            out.push_str(&format!(".max({})", format_number(max)));
        }
        match number.sign {
            Some(NumberSign::Positive) => out.push_str(".positive()"),
            Some(NumberSign::Negative) => out.push_str(".negative()"),
            None => {}
        }
        if let Some(places) = number.precision
            && !number.integer
        {
            out.push_str(&format!(".multipleOf({})", format_number(decimal_step(places))));
        }
        out
    }

    fn render_array(&mut self, array: &ArraySchema, depth: usize) -> String {
        let mut out = format!("z.array({})", self.render(&array.item, depth));
        if let Some(min) = array.min_items {
            out.push_str(&format!(".min({min})"));
        }
        if let Some(max) = array.max_items {
            out.push_str(&format!(".max({max})"));
        }
        out
    }

    fn render_object(&mut self, object: &ObjectSchema, depth: usize) -> String {
        if object.fields.is_empty() {
            return "z.object({})".to_string();
        }
        let indent = "  ".repeat(depth + 1);
        let mut out = String::from("z.object({\n");
        for (name, schema) in &object.fields {
            out.push_str(&format!(
                "{indent}{}: {},\n",
                property_key(name),
                self.render(schema, depth + 1)
            ));
        }
        out.push_str(&"  ".repeat(depth));
        out.push_str("})");
        out
    }

    fn transform_expression(&mut self, transforms: &[TextTransform]) -> String {
        transforms
            .iter()
            .fold("value".to_string(), |expression, transform| match transform {
                TextTransform::Trim => format!("{expression}.trim()"),
                TextTransform::Lowercase => format!("{expression}.toLowerCase()"),
                TextTransform::Uppercase => format!("{expression}.toUpperCase()"),
                TextTransform::Slugify => {
                    self.needs_slugify = true;
                    format!("slugify({expression})")
                }
            })
    }
}

fn render_string(string: &StringSchema) -> String {
    let mut out = "z.string()".to_string();
    match string.format {
        Some(StringFormat::Email) => out.push_str(".email()"),
        Some(StringFormat::Url) => out.push_str(".url()"),
        Some(StringFormat::Uuid) => out.push_str(".uuid()"),
        Some(StringFormat::Cuid) => out.push_str(".cuid()"),
        None => {}
    }
    if let Some(min) = string.min_length {
        out.push_str(&format!(".min({min})"));
    }
    if let Some(max) = string.max_length {
        out.push_str(&format!(".max({max})"));
    }
    if let Some(pattern) = &string.pattern {
        out.push_str(&format!(".regex(/{}/)", escape_regex(pattern.as_str())));
    }
    out
}

fn render_date(date: &DateTimeSchema) -> String {
    let mut out = "z.coerce.date()".to_string();
    if let Some(min) = date.min {
        out.push_str(&format!(".min(new Date({}))", quote(&min.to_rfc3339())));
    }
    if let Some(max) = date.max {
        out.push_str(&format!(".max(new Date({}))", quote(&max.to_rfc3339())));
    }
    out
}

fn render_enum(values: &[String]) -> String {
    if values.is_empty() {
        return "z.never()".to_string();
    }
    let members: Vec<String> = values.iter().map(|value| quote(value)).collect();
    format!("z.enum([{}])", members.join(", "))
}

fn render_localized(localized: &LocalizedSchema) -> String {
    let members: Vec<String> = localized
        .locales
        .iter()
        .map(|locale| {
            if localized.required.contains(locale) {
                format!("{}: z.string()", property_key(locale))
            } else {
                format!("{}: z.string().optional()", property_key(locale))
            }
        })
        .collect();
    format!("z.object({{ {} }}).strict()", members.join(", "))
}

fn property_key(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if plain { name.to_string() } else { quote(name) }
}

/// Escape unescaped `/` so the source can sit inside a regex literal.
fn escape_regex(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut escaped = false;
    for ch in source.chars() {
        if ch == '/' && !escaped {
            out.push('\\');
        }
        escaped = ch == '\\' && !escaped;
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use entigen_core::{EntityOptions, email, field_map, number, text};

    fn user() -> Entity {
        Entity::new(
            "User",
            field_map([
                ("name", text().length(1, 80).trim().required().build()),
                ("email", email().required().unique().build()),
                ("age", number().int().min(0.0).build()),
                ("slug", text().transform(TextTransform::Slugify).build()),
            ]),
            EntityOptions::new(),
        )
    }

    #[test]
    fn renders_every_view() {
        let content = render_entity(&user(), &ReferenceKeys::new());
        assert!(content.starts_with("import { z } from \"zod\";"));
        assert!(content.contains("export const UserSchema = z.object({"));
        assert!(content.contains("  id: z.string().uuid().optional(),"));
        assert!(content.contains("  email: z.string().email(),"));
        assert!(content.contains(
            "  name: z.string().min(1).max(80).transform((value) => value.trim()),"
        ));
        assert!(content.contains("  age: z.number().int().min(0).optional(),"));
        assert!(content.contains("export type CreateUserInput = z.infer<typeof CreateUserSchema>;"));
        assert!(content.contains("export const UserQuerySchema"));
        assert!(content.contains("page: z.coerce.number().int().min(1).default(1),"));
        assert!(content.contains("nameStartsWith: z.string().optional(),"));
        assert!(content.contains("nameEndsWith: z.string().optional(),"));
        assert!(content.contains("  data: z.array(UserSchema),"));
        assert!(content.contains("const slugify = "));
    }

    #[test]
    fn update_schema_has_no_defaults() {
        let entity = Entity::new(
            "Flag",
            field_map([("level", number().default_value(3).build())]),
            EntityOptions::new(),
        );
        let content = render_entity(&entity, &ReferenceKeys::new());
        let update = content
            .split("export const UpdateFlagSchema")
            .nth(1)
            .and_then(|rest| rest.split(";\n").next())
            .expect("update schema");
        assert!(update.contains("level: z.number().optional()"));
        assert!(!update.contains(".default("));
    }

    #[test]
    fn oversized_precision_renders_a_bounded_step() {
        let entity = Entity::new(
            "Rate",
            field_map([("value", number().precision(u32::MAX).required().build())]),
            EntityOptions::new(),
        );
        let content = render_entity(&entity, &ReferenceKeys::new());
        assert!(content.contains("value: z.number().multipleOf(0.000000000000001),"));
    }

    #[test]
    fn regex_literals_escape_slashes() {
        assert_eq!(escape_regex("^a/b$"), "^a\\/b$");
        assert_eq!(escape_regex("^a\\/b$"), "^a\\/b$");
    }
}
