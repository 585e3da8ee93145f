//! Generator backends and the name-keyed registry that constructs them.

pub mod mocks;
pub mod naming;
pub mod openapi;
pub mod prisma;
pub mod typescript;
pub mod zod;

use std::collections::BTreeMap;
use std::sync::Arc;

use entigen_core::{Entity, ReferenceKeys};

use crate::errors::GenerationError;
use crate::model::{Artifact, ArtifactKind, GenerateOptions, GenerationIssue};

pub const BANNER: &str = "Generated by entigen. Do not edit by hand.";

/// Read-only view of the entity set handed to every backend.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    entities: &'a [Arc<Entity>],
    options: &'a GenerateOptions,
}

impl<'a> GeneratorContext<'a> {
    pub fn new(entities: &'a [Arc<Entity>], options: &'a GenerateOptions) -> Self {
        Self { entities, options }
    }

    pub fn entities(&self) -> impl Iterator<Item = &'a Entity> + use<'a> {
        self.entities.iter().map(Arc::as_ref)
    }

    pub fn entity(&self, name: &str) -> Option<&'a Entity> {
        self.entities().find(|entity| entity.name() == name)
    }

    /// Key schemas of the entity set, for relation fields.
    pub fn reference_keys(&self) -> ReferenceKeys {
        ReferenceKeys::from_entities(self.entities())
    }

    pub fn options(&self) -> &'a GenerateOptions {
        self.options
    }
}

/// Contract shared by every backend.
///
/// `generate` must be a pure function of the context: the same entity set
/// always yields byte-identical artifacts.
pub trait Generator {
    fn name(&self) -> &'static str;

    fn kind(&self) -> ArtifactKind;

    /// Per-entity inspection before generation; returned issues land in the
    /// run report.
    fn before(&self, _entity: &Entity, _ctx: &GeneratorContext<'_>) -> Vec<GenerationIssue> {
        Vec::new()
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<Artifact>, GenerationError>;

    /// Post-process one artifact.
    fn after_file(&self, artifact: Artifact) -> Artifact {
        artifact
    }

    /// Extra artifacts derived from everything this backend produced.
    fn after(&self, _artifacts: &[Artifact]) -> Vec<Artifact> {
        Vec::new()
    }
}

pub type GeneratorFactory = fn(&GenerateOptions) -> Box<dyn Generator>;

/// Name to constructor map. Adding a backend is one `register` call.
#[derive(Debug, Clone, Default)]
pub struct GeneratorRegistry {
    factories: BTreeMap<&'static str, GeneratorFactory>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("prisma", |options| {
            Box::new(prisma::PrismaGenerator::new(options))
        });
        registry.register("typescript", |options| {
            Box::new(typescript::TypeScriptGenerator::new(options))
        });
        registry.register("zod", |options| Box::new(zod::ZodGenerator::new(options)));
        registry.register("mocks", |options| Box::new(mocks::MockGenerator::new(options)));
        registry.register("openapi", |options| {
            Box::new(openapi::OpenApiGenerator::new(options))
        });
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: GeneratorFactory) {
        self.factories.insert(name, factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn create(&self, name: &str, options: &GenerateOptions) -> Option<Box<dyn Generator>> {
        self.factories.get(name).map(|factory| factory(options))
    }
}

/// Prefix `content` with a line comment banner.
pub(crate) fn with_banner(artifact: Artifact, comment: &str) -> Artifact {
    Artifact {
        content: format!("{comment} {BANNER}\n\n{}", artifact.content),
        ..artifact
    }
}

/// Quote a string as a double-quoted literal valid in TypeScript and Prisma.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Render a number without a trailing `.0` for integral values.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_every_backend() {
        let registry = GeneratorRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec!["mocks", "openapi", "prisma", "typescript", "zod"]
        );
        let options = GenerateOptions::default();
        for name in registry.names() {
            let generator = registry.create(name, &options).expect("factory");
            assert_eq!(generator.name(), name);
        }
        assert!(registry.create("graphql", &options).is_none());
    }

    #[test]
    fn quote_escapes_control_characters() {
        assert_eq!(quote("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
    }

    #[test]
    fn format_number_drops_integral_fraction() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.5), "-0.5");
    }
}
