use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Category of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Schema,
    Types,
    Validators,
    Mocks,
    Docs,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Schema => "schema",
            ArtifactKind::Types => "types",
            ArtifactKind::Validators => "validators",
            ArtifactKind::Mocks => "mocks",
            ArtifactKind::Docs => "docs",
        }
    }
}

/// One generated file. `path` is relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub content: String,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn new(path: impl Into<String>, content: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            kind,
        }
    }

    /// Hex-encoded SHA-256 of the content.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.content.as_bytes()))
    }
}

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Backend names to run, in order.
    pub generators: Vec<String>,
    /// Records per entity produced by the mock backend.
    pub mock_count: usize,
    /// Base seed for mock data; each entity derives its own stream from it.
    pub seed: u64,
    /// Chance of leaving out an optional, nullable or defaulted field in mocks.
    pub skip_optional_probability: f64,
    /// Prisma datasource provider.
    pub database_provider: String,
    /// Prepend a "generated, do not edit" banner to text artifacts.
    pub banner: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            generators: ["prisma", "typescript", "zod", "mocks", "openapi"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            mock_count: 10,
            seed: 42,
            skip_optional_probability: 0.3,
            database_provider: "postgresql".to_string(),
            banner: true,
        }
    }
}

/// Structured generation issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl GenerationIssue {
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("warning", code, message)
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("error", code, message)
    }

    fn new(level: &str, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: level.to_string(),
            code: code.into(),
            message: message.into(),
            entity: None,
            field: None,
            generator: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = Some(generator.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == "error"
    }
}

/// Summary of an emitted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub path: String,
    pub kind: ArtifactKind,
    pub bytes: u64,
    pub sha256: String,
}

/// Report for a generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub entities: Vec<String>,
    pub artifacts: Vec<ArtifactSummary>,
    pub generator_usage: BTreeMap<String, u64>,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<GenerationIssue>,
    pub errors: Vec<GenerationIssue>,
}

impl GenerationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_generator_usage(&mut self, name: &str, artifacts: u64) {
        *self.generator_usage.entry(name.to_string()).or_insert(0) += artifacts;
    }

    pub fn record_artifact(&mut self, artifact: &Artifact) {
        self.artifacts.push(ArtifactSummary {
            path: artifact.path.clone(),
            kind: artifact.kind,
            bytes: artifact.content.len() as u64,
            sha256: artifact.digest(),
        });
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }

    pub fn record_error(&mut self, issue: GenerationIssue) {
        self.errors.push(issue);
    }

    /// Route an issue by its level.
    pub fn record(&mut self, issue: GenerationIssue) {
        if issue.is_error() {
            self.record_error(issue);
        } else {
            self.record_warning(issue);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings_by_code.contains_key(code)
    }
}
