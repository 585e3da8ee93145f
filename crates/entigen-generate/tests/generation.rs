use std::sync::Arc;

use serde_json::Value;

use entigen_core::{
    Entity, EntityOptions, EntityRegistry, IndexDefinition, ReferenceKeys, StringFormat,
    belongs_to, email, field_map, has_one, id, number, text,
};
use entigen_generate::{
    GenerateOptions, GenerationEngine, GenerationError, GenerationOutput, MockGenerator,
};

fn user() -> Entity {
    Entity::new(
        "User",
        field_map([
            ("name", text().required().build()),
            ("email", email().required().unique().build()),
            ("age", number().build()),
        ]),
        EntityOptions::new().index(IndexDefinition::unique(["email"])),
    )
}

fn post() -> Entity {
    Entity::new(
        "Post",
        field_map([
            ("title", text().required().build()),
            ("author", belongs_to("User").required().build()),
        ]),
        EntityOptions::new(),
    )
}

fn options(generators: &[&str]) -> GenerateOptions {
    GenerateOptions {
        generators: generators.iter().map(|name| name.to_string()).collect(),
        ..GenerateOptions::default()
    }
}

fn run(entities: Vec<Entity>, generators: &[&str]) -> Result<GenerationOutput, GenerationError> {
    let entities: Vec<Arc<Entity>> = entities.into_iter().map(Arc::new).collect();
    GenerationEngine::new(options(generators)).run(&entities)
}

fn content<'a>(output: &'a GenerationOutput, path: &str) -> &'a str {
    output
        .artifacts
        .iter()
        .find(|artifact| artifact.path == path)
        .map(|artifact| artifact.content.as_str())
        .unwrap_or_else(|| panic!("missing artifact {path}"))
}

#[test]
fn generation_is_idempotent() {
    let all = GenerateOptions::default().generators;
    let names: Vec<&str> = all.iter().map(String::as_str).collect();
    let first = run(vec![user(), post()], &names).expect("first run");
    let second = run(vec![user(), post()], &names).expect("second run");

    let digests = |output: &GenerationOutput| -> Vec<(String, String)> {
        output
            .artifacts
            .iter()
            .map(|artifact| (artifact.path.clone(), artifact.digest()))
            .collect()
    };
    assert_eq!(digests(&first), digests(&second));
    assert_eq!(first.report.artifacts, second.report.artifacts);
    for name in names {
        assert!(first.report.generator_usage.contains_key(name), "no usage for {name}");
    }
}

#[test]
fn unique_field_is_not_indexed_twice() {
    let output = run(vec![user()], &["prisma"]).expect("generate prisma");
    let schema = content(&output, "schema.prisma");

    let email_line = schema
        .lines()
        .find(|line| line.trim_start().starts_with("email "))
        .expect("email column");
    assert!(email_line.contains("@unique"));
    assert!(!schema.contains("@@unique([email])"));
    assert!(schema.starts_with("// Generated by entigen."));
}

#[test]
fn create_input_marks_optional_fields() {
    let output = run(vec![user()], &["typescript"]).expect("generate types");
    let types = content(&output, "types/user.ts");

    let create = types
        .split("export interface CreateUserInput {")
        .nth(1)
        .and_then(|rest| rest.split('}').next())
        .expect("create input");
    assert!(create.contains("  name: string;"));
    assert!(create.contains("  email: string;"));
    assert!(create.contains("  age?: number;"));

    let read = types
        .split("export interface User {")
        .nth(1)
        .and_then(|rest| rest.split('}').next())
        .expect("read interface");
    assert!(read.contains("  name: string;"));
    assert!(read.contains("  age?: number;"));
}

#[test]
fn unresolved_relation_fails_at_end_naming_the_field() {
    let err = run(vec![post()], &["prisma", "typescript"]).expect_err("missing User");
    let GenerationError::Failed(report) = err else {
        panic!("expected a failed report, got {err:?}");
    };
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, "unresolved_relation");
    assert!(report.errors[0].message.contains("Post.author"));
    assert_eq!(report.generator_usage.get("prisma"), Some(&1));

    let registry = EntityRegistry::new();
    registry.register(user());
    registry.register(post());
    let output = GenerationEngine::new(options(&["prisma"]))
        .run_registry(&registry)
        .expect("generate with User registered");
    let schema = content(&output, "schema.prisma");
    assert!(schema.contains("@relation(fields: [authorId], references: [id])"));
    assert!(
        schema
            .lines()
            .any(|line| line.split_whitespace().collect::<Vec<_>>() == ["authorId", "String"])
    );
}

#[test]
fn mock_records_match_count_and_email_format() {
    let generator = MockGenerator::new(&GenerateOptions::default());
    let records = generator.records(&user(), 3);
    assert_eq!(records.len(), 3);
    for record in &records {
        let email = record["email"].as_str().expect("email string");
        assert!(StringFormat::Email.matches(email), "bad email {email}");
    }

    let output = run(vec![user()], &["mocks"]).expect("generate mocks");
    let parsed: Value = serde_json::from_str(content(&output, "mocks/user.json")).expect("json");
    assert_eq!(
        parsed.as_array().map(Vec::len),
        Some(GenerateOptions::default().mock_count)
    );
}

#[test]
fn mock_relations_point_at_generated_parents() {
    let output = run(vec![user(), post()], &["mocks"]).expect("generate mocks");
    let users: Value = serde_json::from_str(content(&output, "mocks/user.json")).expect("users");
    let posts: Value = serde_json::from_str(content(&output, "mocks/post.json")).expect("posts");

    let ids: Vec<&Value> = users
        .as_array()
        .expect("user array")
        .iter()
        .map(|user| &user["id"])
        .collect();
    for post in posts.as_array().expect("post array") {
        assert!(ids.contains(&&post["author"]), "dangling author {}", post["author"]);
    }
}

#[test]
fn relation_keys_agree_across_backends() {
    let author = Entity::new(
        "Author",
        field_map([
            ("id", id().cuid().build()),
            ("name", text().required().build()),
        ]),
        EntityOptions::new(),
    );
    let ledger = Entity::new(
        "Ledger",
        field_map([("id", id().auto_increment().build())]),
        EntityOptions::new(),
    );
    let entry = Entity::new(
        "Entry",
        field_map([
            ("author", belongs_to("Author").required().build()),
            ("ledger", belongs_to("Ledger").required().build()),
        ]),
        EntityOptions::new(),
    );
    let keys = ReferenceKeys::from_entities([&author, &ledger, &entry]);
    let full = entry.full_schema_with(&keys);

    let output = run(
        vec![author, ledger, entry],
        &["mocks", "zod", "typescript", "openapi"],
    )
    .expect("generate");

    let entries: Value = serde_json::from_str(content(&output, "mocks/entry.json")).expect("json");
    for record in entries.as_array().expect("entry array") {
        if let Err(errors) = full.parse(record) {
            panic!("mock {record} rejected: {:?}", errors.issues());
        }
        assert!(record["ledger"].is_u64());
    }

    let validators = content(&output, "validators/entry.ts");
    assert!(validators.contains("  author: z.string().cuid(),"));
    assert!(validators.contains("  ledger: z.number().int().positive(),"));
    assert!(content(&output, "types/entry.ts").contains("  ledger: number;"));

    let doc: Value = serde_json::from_str(content(&output, "openapi.json")).expect("openapi");
    let create = &doc["components"]["schemas"]["CreateEntryInput"]["properties"];
    assert_eq!(create["author"]["format"], "cuid");
    assert_eq!(create["ledger"]["type"], "integer");
}

#[test]
fn one_to_one_unique_index_is_not_repeated() {
    let profile = Entity::new(
        "Profile",
        field_map([("owner", has_one("User").required().build())]),
        EntityOptions::new().index(IndexDefinition::unique(["ownerId"])),
    );
    let output = run(vec![user(), profile], &["prisma"]).expect("generate prisma");
    let schema = content(&output, "schema.prisma");
    let owner_id = schema
        .lines()
        .find(|line| line.trim_start().starts_with("ownerId "))
        .expect("foreign key column");
    assert!(owner_id.contains("@unique"));
    assert!(!schema.contains("@@unique([ownerId])"));
}

#[test]
fn unknown_generator_fails_fast() {
    let err = run(vec![user()], &["prisma", "graphql"]).expect_err("unknown generator");
    assert!(matches!(err, GenerationError::UnknownGenerator(name) if name == "graphql"));

    let err = run(vec![user()], &[]).expect_err("empty generator list");
    assert!(matches!(err, GenerationError::InvalidOptions(_)));
}

#[test]
fn indexes_and_barrels_are_emitted() {
    let output = run(vec![user(), post()], &["typescript", "zod", "openapi"]).expect("generate");
    let paths: Vec<&str> = output
        .artifacts
        .iter()
        .map(|artifact| artifact.path.as_str())
        .collect();
    assert_eq!(
        paths,
        vec![
            "types/user.ts",
            "types/post.ts",
            "types/filters.ts",
            "types/index.ts",
            "validators/user.ts",
            "validators/post.ts",
            "validators/index.ts",
            "openapi.json",
        ]
    );
    assert!(content(&output, "validators/index.ts").contains("export * from \"./post\";"));
    let doc: Value = serde_json::from_str(content(&output, "openapi.json")).expect("openapi json");
    assert!(doc["components"]["schemas"]["CreatePostInput"].is_object());
}
