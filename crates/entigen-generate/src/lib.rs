//! Artifact generation for entigen.
//!
//! Backends project registered entities into Prisma schemas, TypeScript
//! interfaces, zod validators, seeded mock data and OpenAPI components. The
//! [`GenerationEngine`] runs them and reports issues fail-at-end.

pub mod checks;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;

pub use engine::{GenerationEngine, GenerationOutput};
pub use errors::GenerationError;
pub use generators::{Generator, GeneratorContext, GeneratorFactory, GeneratorRegistry};
pub use generators::mocks::MockGenerator;
pub use model::{
    Artifact, ArtifactKind, ArtifactSummary, GenerateOptions, GenerationIssue, GenerationReport,
};
