//! Constraint-aware synthetic records.
//!
//! Every entity draws from its own ChaCha stream seeded from the run seed and
//! the entity name, so output is stable across runs and independent of
//! entity order. Relation values are re-pointed at generated parent ids when
//! the parent is part of the same run.

use std::collections::HashMap;

use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use fake::Fake;
use fake::faker::address::en::{CityName, CountryName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{DomainSuffix, SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word, Words};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_regex::Regex as RandRegex;
use serde_json::{Map, Number, Value};
use tracing::debug;

use entigen_core::schema::{decimal_scale, decimal_step};
use entigen_core::{
    DateOptions, Entity, FieldDefinition, FieldKind, IdStrategy, LocalizedOptions, NumberOptions,
    NumberSign, Presence, TextOptions,
};

use super::naming::kebab_case;
use super::{Generator, GeneratorContext};
use crate::errors::GenerationError;
use crate::model::{Artifact, ArtifactKind, GenerateOptions, GenerationIssue};

const MAX_REPEAT: u32 = 16;
const DEFAULT_NUMBER_SPAN: f64 = 1000.0;
const DEFAULT_PRECISION: u32 = 2;
const DATE_SPAN_DAYS: i64 = 365;
const MAX_ARRAY_ITEMS: usize = 3;
const CUID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const PAD_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone)]
pub struct MockGenerator {
    count: usize,
    seed: u64,
    skip_probability: f64,
}

impl MockGenerator {
    pub fn new(options: &GenerateOptions) -> Self {
        Self {
            count: options.mock_count,
            seed: options.seed,
            skip_probability: options.skip_optional_probability,
        }
    }

    /// `count` synthetic records for `entity`.
    pub fn records(&self, entity: &Entity, count: usize) -> Vec<Value> {
        let mut rng = ChaCha8Rng::seed_from_u64(hash_seed(self.seed, entity.name()));
        (0..count)
            .map(|ordinal| self.record(entity, ordinal, &mut rng))
            .collect()
    }

    fn record(&self, entity: &Entity, ordinal: usize, rng: &mut ChaCha8Rng) -> Value {
        let mut object = Map::new();
        for (name, field) in entity.fields() {
            if self.should_skip(field, rng) {
                if field.is_nullable() {
                    object.insert(name.clone(), Value::Null);
                }
                continue;
            }
            object.insert(name.clone(), field_value(name, field, ordinal, rng));
        }
        Value::Object(object)
    }

    fn should_skip(&self, field: &FieldDefinition, rng: &mut ChaCha8Rng) -> bool {
        let skippable = field.is_nullable() || field.presence() != Presence::Required;
        if !skippable || field.is_primary() || !(self.skip_probability > 0.0) {
            return false;
        }
        rng.random_bool(self.skip_probability.min(1.0))
    }
}

impl Generator for MockGenerator {
    fn name(&self) -> &'static str {
        "mocks"
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Mocks
    }

    fn before(&self, entity: &Entity, _ctx: &GeneratorContext<'_>) -> Vec<GenerationIssue> {
        let mut issues = Vec::new();
        for (name, field) in entity.fields() {
            collect_unsamplable(entity.name(), name, field, &mut issues);
        }
        issues
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> Result<Vec<Artifact>, GenerationError> {
        let mut generated: Vec<(&Entity, Vec<Value>)> = ctx
            .entities()
            .map(|entity| (entity, self.records(entity, self.count)))
            .collect();

        let ids: HashMap<String, Vec<Value>> = generated
            .iter()
            .filter_map(|(entity, records)| {
                let (key, _) = entity.key_field()?;
                let values: Vec<Value> = records
                    .iter()
                    .filter_map(|record| record.get(key).cloned())
                    .filter(|value| !value.is_null())
                    .collect();
                Some((entity.name().to_string(), values))
            })
            .collect();

        let mut artifacts = Vec::with_capacity(generated.len());
        for (entity, records) in &mut generated {
            link_relations(entity, records, &ids, self.seed);
            let mut content = serde_json::to_string_pretty(&Value::Array(records.clone()))?;
            content.push('\n');
            debug!(entity = entity.name(), records = records.len(), "mock records generated");
            artifacts.push(Artifact::new(
                format!("mocks/{}.json", kebab_case(entity.name())),
                content,
                ArtifactKind::Mocks,
            ));
        }
        Ok(artifacts)
    }
}

/// FNV-1a over `key`, folded into `seed`.
pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Replace random relation ids with ids of records generated for the target.
fn link_relations(
    entity: &Entity,
    records: &mut [Value],
    ids: &HashMap<String, Vec<Value>>,
    seed: u64,
) {
    let mut rng = ChaCha8Rng::seed_from_u64(hash_seed(seed, &format!("{}#links", entity.name())));
    for (name, _field, relation) in entity.relations() {
        let Some(parents) = ids.get(&relation.target).filter(|ids| !ids.is_empty()) else {
            continue;
        };
        for record in records.iter_mut() {
            match record.get_mut(name) {
                Some(Value::Array(items)) => {
                    for item in items.iter_mut() {
                        *item = parents[rng.random_range(0..parents.len())].clone();
                    }
                    items.dedup();
                }
                Some(value) if !value.is_null() => {
                    *value = parents[rng.random_range(0..parents.len())].clone();
                }
                _ => {}
            }
        }
    }
}

fn collect_unsamplable(
    entity: &str,
    path: &str,
    field: &FieldDefinition,
    issues: &mut Vec<GenerationIssue>,
) {
    match field.kind() {
        FieldKind::Array(options) => {
            collect_unsamplable(entity, &format!("{path}[]"), &options.item, issues)
        }
        FieldKind::Json(options) => {
            for (name, nested) in options.shape.iter().flatten() {
                collect_unsamplable(entity, &format!("{path}.{name}"), nested, issues);
            }
        }
        kind => {
            if let Some(pattern) = kind.text_options().and_then(|o| o.pattern.as_deref())
                && let Err(err) = compile_pattern(pattern)
            {
                issues.push(
                    GenerationIssue::warning(
                        "unsamplable_pattern",
                        format!(
                            "{entity}.{path} pattern cannot be sampled ({err}); mock values ignore it"
                        ),
                    )
                    .with_entity(entity)
                    .with_field(path),
                );
            }
        }
    }
}

fn field_value(name: &str, field: &FieldDefinition, ordinal: usize, rng: &mut ChaCha8Rng) -> Value {
    match field.kind() {
        FieldKind::Text(options) => Value::String(text_value(name, options, rng)),
        FieldKind::Email(options) => {
            let value: String = SafeEmail().fake_with_rng(rng);
            Value::String(apply_transforms(options, value))
        }
        FieldKind::Url(options) => {
            let word: String = Word().fake_with_rng(rng);
            let suffix: String = DomainSuffix().fake_with_rng(rng);
            Value::String(apply_transforms(
                options,
                format!("https://{}.{suffix}", word.to_lowercase()),
            ))
        }
        FieldKind::RichText(options) => {
            let value: String = Paragraph(2..5).fake_with_rng(rng);
            Value::String(apply_transforms(options, fit_length(value, options, rng)))
        }
        FieldKind::Number(options) => number_value(options, rng),
        FieldKind::Boolean => Value::Bool(rng.random_bool(0.5)),
        FieldKind::Date(options) => Value::String(date_value(options, rng)),
        FieldKind::Enum(options) => {
            if options.values.is_empty() {
                Value::Null
            } else {
                let index = rng.random_range(0..options.values.len());
                Value::String(options.values[index].clone())
            }
        }
        FieldKind::Array(options) => {
            let min = options.min_items.unwrap_or(1);
            let max = options.max_items.unwrap_or(min.max(MAX_ARRAY_ITEMS)).max(min);
            let len = rng.random_range(min..=max);
            Value::Array(
                (0..len)
                    .map(|_| field_value(name, &options.item, ordinal, rng))
                    .collect(),
            )
        }
        FieldKind::Relation(relation) => {
            if relation.cardinality.is_many() {
                let len = rng.random_range(1..=MAX_ARRAY_ITEMS);
                Value::Array((0..len).map(|_| Value::String(uuid_value(rng))).collect())
            } else {
                Value::String(uuid_value(rng))
            }
        }
        FieldKind::Json(options) => {
            let mut object = Map::new();
            for (key, nested) in options.shape.iter().flatten() {
                if nested.presence().optional_on_input() && !rng.random_bool(0.5) {
                    continue;
                }
                object.insert(key.clone(), field_value(key, nested, ordinal, rng));
            }
            Value::Object(object)
        }
        FieldKind::Localized(options) => localized_value(options, rng),
        FieldKind::Id(options) => match options.strategy {
            IdStrategy::Uuid => Value::String(uuid_value(rng)),
            IdStrategy::Cuid => Value::String(cuid_value(rng)),
            IdStrategy::AutoIncrement => Value::from(ordinal as u64 + 1),
        },
        FieldKind::Custom(_) => Value::Null,
    }
}

fn text_value(name: &str, options: &TextOptions, rng: &mut ChaCha8Rng) -> String {
    if let Some(pattern) = &options.pattern
        && let Ok(regex) = compile_pattern(pattern)
    {
        let value: String = rng.sample(regex);
        return apply_transforms(options, value);
    }
    let value = hinted_text(name, rng);
    apply_transforms(options, fit_length(value, options, rng))
}

/// Sampler for a validation pattern. Outer anchors are implied by sampling a
/// whole value, so they are dropped first.
fn compile_pattern(pattern: &str) -> Result<RandRegex, rand_regex::Error> {
    let body = pattern.strip_prefix('^').unwrap_or(pattern);
    let body = match body.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => body,
    };
    RandRegex::compile(body, MAX_REPEAT)
}

/// Realistic text chosen by the field name.
fn hinted_text(name: &str, rng: &mut ChaCha8Rng) -> String {
    let name = name.to_ascii_lowercase();
    let has = |needle: &str| name.contains(needle);
    if has("first") && has("name") {
        FirstName().fake_with_rng(rng)
    } else if has("last") && has("name") {
        LastName().fake_with_rng(rng)
    } else if has("username") || has("login") || has("handle") {
        Username().fake_with_rng(rng)
    } else if has("company") || has("organization") {
        CompanyName().fake_with_rng(rng)
    } else if has("name") {
        Name().fake_with_rng(rng)
    } else if has("city") {
        CityName().fake_with_rng(rng)
    } else if has("country") {
        CountryName().fake_with_rng(rng)
    } else if has("street") || has("address") {
        StreetName().fake_with_rng(rng)
    } else if has("zip") || has("postal") {
        ZipCode().fake_with_rng(rng)
    } else if has("phone") {
        PhoneNumber().fake_with_rng(rng)
    } else if has("slug") {
        let words: Vec<String> = Words(2..4).fake_with_rng(rng);
        words.join("-").to_lowercase()
    } else if has("title") || has("headline") {
        let sentence: String = Sentence(2..5).fake_with_rng(rng);
        sentence.trim_end_matches('.').to_string()
    } else if has("description") || has("summary") || has("bio") || has("content") {
        Sentence(6..12).fake_with_rng(rng)
    } else {
        let words: Vec<String> = Words(1..3).fake_with_rng(rng);
        words.join(" ")
    }
}

fn fit_length(value: String, options: &TextOptions, rng: &mut ChaCha8Rng) -> String {
    let mut value = value;
    if let Some(max) = options.max_length
        && value.chars().count() > max
    {
        value = value.chars().take(max).collect::<String>();
        let trimmed = value.trim_end().to_string();
        if trimmed.chars().count() >= options.min_length.unwrap_or(0) {
            value = trimmed;
        }
    }
    if let Some(min) = options.min_length {
        while value.chars().count() < min {
            value.push(PAD_ALPHABET[rng.random_range(0..PAD_ALPHABET.len())] as char);
        }
    }
    value
}

fn apply_transforms(options: &TextOptions, value: String) -> String {
    options
        .transforms
        .iter()
        .fold(value, |value, transform| transform.apply(&value))
}

fn number_value(options: &NumberOptions, rng: &mut ChaCha8Rng) -> Value {
    let (mut low, mut high) = match (options.min, options.max) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, min + DEFAULT_NUMBER_SPAN),
        (None, Some(max)) if max < 0.0 => (max - DEFAULT_NUMBER_SPAN, max),
        (None, Some(max)) => (0.0, max),
        (None, None) => (0.0, DEFAULT_NUMBER_SPAN),
    };

    let places = if options.integer {
        0
    } else {
        options.precision.unwrap_or(DEFAULT_PRECISION)
    };
    let step = decimal_step(places);
    match options.sign {
        Some(NumberSign::Positive) => {
            low = low.max(step);
            high = high.max(low);
        }
        Some(NumberSign::Negative) => {
            high = high.min(-step);
            low = low.min(high);
        }
        None => {}
    }
    if low > high {
        high = low;
    }

    if options.integer {
        let low = low.ceil() as i64;
        let high = (high.floor() as i64).max(low);
        return Value::from(rng.random_range(low..=high));
    }

    let raw = rng.random_range(low..=high);
    let scale = decimal_scale(places);
    let mut value = (raw * scale).round() / scale;
    if value < low {
        value = ((low * scale).ceil()) / scale;
    }
    if value > high {
        value = ((high * scale).floor()) / scale;
    }
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn date_value(options: &DateOptions, rng: &mut ChaCha8Rng) -> String {
    let span = Duration::days(DATE_SPAN_DAYS);
    let (start, end) = match (options.min, options.max) {
        (Some(min), Some(max)) => (min, max.max(min)),
        (Some(min), None) => (min, min + span * 2),
        (None, Some(max)) => (max - span * 2, max),
        (None, None) => (base_date() - span, base_date() + span),
    };
    let seconds = (end - start).num_seconds().max(0);
    let offset = rng.random_range(0..=seconds);
    (start + Duration::seconds(offset)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn localized_value(options: &LocalizedOptions, rng: &mut ChaCha8Rng) -> Value {
    let mut object = Map::new();
    for locale in &options.locales {
        if options.required_locales.contains(locale) || rng.random_bool(0.5) {
            let sentence: String = Sentence(3..6).fake_with_rng(rng);
            object.insert(locale.clone(), Value::String(sentence));
        }
    }
    if object.is_empty()
        && let Some(first) = options.locales.first()
    {
        let sentence: String = Sentence(3..6).fake_with_rng(rng);
        object.insert(first.clone(), Value::String(sentence));
    }
    Value::Object(object)
}

fn uuid_value(rng: &mut ChaCha8Rng) -> String {
    uuid::Builder::from_random_bytes(rng.random())
        .into_uuid()
        .to_string()
}

fn cuid_value(rng: &mut ChaCha8Rng) -> String {
    let mut value = String::from("c");
    for _ in 0..24 {
        value.push(CUID_ALPHABET[rng.random_range(0..CUID_ALPHABET.len())] as char);
    }
    value
}
