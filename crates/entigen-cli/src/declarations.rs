//! Entity declaration files (JSON or TOML).
//!
//! Every file is checked against the declaration JSON Schema before it is
//! deserialized, so structural mistakes are reported with a JSON pointer
//! instead of a serde message.

use std::path::{Path, PathBuf};

use entigen_core::{DECLARATION_VERSION, Entity, EntityDeclaration, EntityRegistry};
use jsonschema::JSONSchema;
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::CliError;

/// On-disk container for one or more entity declarations.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeclarationFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub entities: Vec<EntityDeclaration>,
}

pub fn declaration_json_schema() -> RootSchema {
    schema_for!(DeclarationFile)
}

/// Expand directories into the declaration files they contain, sorted by path.
pub fn collect_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            collect_dir(input, &mut files)?;
        } else if input.exists() {
            files.push(input.clone());
        } else {
            return Err(CliError::InvalidConfig(format!(
                "declaration input '{}' does not exist",
                input.display()
            )));
        }
    }
    Ok(files)
}

fn collect_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), CliError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_dir(&path, files)?;
        } else if is_declaration(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_declaration(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("json" | "toml")
    )
}

/// Compiled declaration validator.
pub struct DeclarationLoader {
    schema: JSONSchema,
}

impl DeclarationLoader {
    pub fn new() -> Result<Self, CliError> {
        let schema_json = serde_json::to_value(declaration_json_schema())?;
        let schema = JSONSchema::compile(&schema_json).map_err(|err| CliError::Declaration {
            path: "<schema>".to_string(),
            message: err.to_string(),
        })?;
        Ok(Self { schema })
    }

    pub fn load_file(&self, path: &Path) -> Result<DeclarationFile, CliError> {
        let content = std::fs::read_to_string(path)?;
        let document = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => serde_json::to_value(toml::from_str::<toml::Value>(&content)?)?,
            _ => serde_json::from_str(&content)?,
        };
        self.parse(&document)
            .map_err(|message| CliError::Declaration {
                path: path.display().to_string(),
                message,
            })
    }

    /// Validate and deserialize one declaration document.
    pub fn parse(&self, document: &Value) -> Result<DeclarationFile, String> {
        if let Err(errors) = self.schema.validate(document) {
            let messages: Vec<String> = errors
                .map(|error| {
                    let pointer = error.instance_path.to_string();
                    let pointer = if pointer.is_empty() { "/".to_string() } else { pointer };
                    format!("{pointer}: {error}")
                })
                .collect();
            return Err(messages.join("; "));
        }

        let file: DeclarationFile =
            serde_json::from_value(document.clone()).map_err(|err| err.to_string())?;
        if let Some(version) = &file.version
            && version != DECLARATION_VERSION
        {
            return Err(format!(
                "unsupported declaration version '{version}' (expected '{DECLARATION_VERSION}')"
            ));
        }
        Ok(file)
    }
}

/// Load every declaration under `inputs` into a fresh registry. A repeated
/// entity name replaces the earlier declaration and is logged as a warning.
pub fn load_registry(inputs: &[PathBuf]) -> Result<EntityRegistry, CliError> {
    let loader = DeclarationLoader::new()?;
    let registry = EntityRegistry::new();
    for path in collect_files(inputs)? {
        let file = loader.load_file(&path)?;
        debug!(path = %path.display(), entities = file.entities.len(), "declaration file loaded");
        for declaration in file.entities {
            if registry.contains(&declaration.name) {
                warn!(
                    entity = %declaration.name,
                    path = %path.display(),
                    "duplicate entity declaration; the later one replaces the earlier"
                );
            }
            registry.register(Entity::from_declaration(declaration));
        }
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("entigen-decl-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    #[test]
    fn rejects_unknown_field_kind_with_pointer() {
        let loader = DeclarationLoader::new().expect("compile schema");
        let document = json!({
            "entities": [
                {"name": "User", "fields": {"name": {"type": {"kind": "bogus"}}}}
            ]
        });
        let message = loader.parse(&document).expect_err("invalid kind");
        assert!(message.contains("/entities/0/fields/name/type"), "{message}");
    }

    #[test]
    fn rejects_unsupported_version() {
        let loader = DeclarationLoader::new().expect("compile schema");
        let document = json!({"version": "9", "entities": []});
        let message = loader.parse(&document).expect_err("bad version");
        assert!(message.contains("unsupported declaration version"));
    }

    #[test]
    fn loads_json_and_toml_and_keeps_last_duplicate() {
        let dir = scratch("load");
        std::fs::write(
            dir.join("a.json"),
            json!({
                "version": DECLARATION_VERSION,
                "entities": [{
                    "name": "User",
                    "fields": {
                        "name": {"type": {"kind": "text"}, "required": true},
                        "email": {"type": {"kind": "email"}, "required": true, "unique": true}
                    },
                    "options": {"timestamps": true}
                }]
            })
            .to_string(),
        )
        .expect("write json");
        std::fs::write(
            dir.join("b.toml"),
            r#"
[[entities]]
name = "Post"

[entities.fields.title]
required = true
type = { kind = "text", max_length = 120 }

[entities.fields.author]
required = true
type = { kind = "relation", target = "User", cardinality = "many_to_one" }

[[entities]]
name = "User"

[entities.fields.handle]
type = { kind = "text" }
"#,
        )
        .expect("write toml");

        let registry = load_registry(&[dir.clone()]).expect("load registry");
        assert_eq!(registry.names(), vec!["User", "Post"]);

        let user = registry.get("User").expect("user");
        assert!(user.field("handle").is_some());
        assert!(user.field("email").is_none());

        let post = registry.get("Post").expect("post");
        assert!(post.field("author").and_then(|field| field.relation()).is_some());

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn missing_input_is_reported() {
        let missing = PathBuf::from("no-such-declarations-dir");
        assert!(matches!(
            collect_files(&[missing]),
            Err(CliError::InvalidConfig(_))
        ));
    }
}
