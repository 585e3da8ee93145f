use std::sync::Arc;
use std::time::Instant;

use entigen_core::{Entity, EntityRegistry};
use tracing::{debug, info, warn};

use crate::checks::check_entity;
use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::model::{Artifact, GenerateOptions, GenerationReport};

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub artifacts: Vec<Artifact>,
    pub report: GenerationReport,
}

/// Runs the selected backends over an entity set.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    options: GenerateOptions,
    registry: GeneratorRegistry,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self::with_registry(options, GeneratorRegistry::with_defaults())
    }

    pub fn with_registry(options: GenerateOptions, registry: GeneratorRegistry) -> Self {
        Self { options, registry }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Generate from every entity registered in `registry`.
    pub fn run_registry(
        &self,
        registry: &EntityRegistry,
    ) -> Result<GenerationOutput, GenerationError> {
        self.run(&registry.all())
    }

    pub fn run(&self, entities: &[Arc<Entity>]) -> Result<GenerationOutput, GenerationError> {
        let start = Instant::now();
        let generators = self.resolve_generators()?;
        let ctx = GeneratorContext::new(entities, &self.options);
        let mut report = GenerationReport::new();

        info!(
            entities = entities.len(),
            generators = %self.options.generators.join(","),
            "generation started"
        );

        for entity in entities {
            report.entities.push(entity.name().to_string());
            for issue in check_entity(entity, &ctx) {
                report.record(issue);
            }
            for generator in &generators {
                for issue in generator.before(entity, &ctx) {
                    report.record(issue.with_generator(generator.name()));
                }
            }
        }

        let mut artifacts = Vec::new();
        for generator in &generators {
            let generator_start = Instant::now();
            let mut produced: Vec<Artifact> = generator
                .generate(&ctx)?
                .into_iter()
                .map(|artifact| generator.after_file(artifact))
                .collect();
            let extra: Vec<Artifact> = generator
                .after(&produced)
                .into_iter()
                .map(|artifact| generator.after_file(artifact))
                .collect();
            produced.extend(extra);

            report.record_generator_usage(generator.name(), produced.len() as u64);
            debug!(
                generator = generator.name(),
                artifacts = produced.len(),
                duration_ms = generator_start.elapsed().as_millis() as u64,
                "generator finished"
            );
            artifacts.extend(produced);
        }

        for artifact in &artifacts {
            report.record_artifact(artifact);
        }

        for issue in &report.warnings {
            warn!(
                code = %issue.code,
                entity = issue.entity.as_deref().unwrap_or(""),
                field = issue.field.as_deref().unwrap_or(""),
                "{}",
                issue.message
            );
        }

        if report.has_errors() {
            warn!(
                errors = report.errors.len(),
                warnings = report.warnings.len(),
                "generation failed"
            );
            return Err(GenerationError::Failed(report));
        }

        info!(
            artifacts = artifacts.len(),
            warnings = report.warnings.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "generation completed"
        );
        Ok(GenerationOutput { artifacts, report })
    }

    fn resolve_generators(&self) -> Result<Vec<Box<dyn Generator>>, GenerationError> {
        if self.options.generators.is_empty() {
            return Err(GenerationError::InvalidOptions(
                "at least one generator must be selected".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.options.skip_optional_probability) {
            return Err(GenerationError::InvalidOptions(format!(
                "skip_optional_probability must be within 0..=1, got {}",
                self.options.skip_optional_probability
            )));
        }
        self.options
            .generators
            .iter()
            .map(|name| {
                self.registry
                    .create(name, &self.options)
                    .ok_or_else(|| GenerationError::UnknownGenerator(name.clone()))
            })
            .collect()
    }
}
