//! Runtime validation schemas.
//!
//! A [`ValidationSchema`] is an inspectable tree: generators walk it to
//! re-materialize validators and documentation, and [`ValidationSchema::parse`]
//! runs it directly against JSON values.

mod error;
mod translate;
mod views;

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

use crate::field::{NumberSign, TextTransform};

pub use error::{ValidationErrors, ValidationIssue};
pub use translate::{ReferenceKeys, to_validation_schema, to_validation_schema_with};
pub use views::{
    DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT, RESERVED_QUERY_KEYS, paginated_schema,
    query_key_collisions, query_schema, query_schema_with,
};
pub(crate) use views::{create_view, full_view, is_sortable, update_view};

/// Named string formats checked in addition to length and pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Url,
    Uuid,
    Cuid,
}

impl StringFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Url => "url",
            StringFormat::Uuid => "uuid",
            StringFormat::Cuid => "cuid",
        }
    }

    pub fn matches(self, value: &str) -> bool {
        match self {
            StringFormat::Email => is_email(value),
            StringFormat::Url => is_url(value),
            StringFormat::Uuid => uuid::Uuid::parse_str(value).is_ok(),
            StringFormat::Cuid => is_cuid(value),
        }
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

/// Absolute URL with any scheme, the rule generated validators apply too.
fn is_url(value: &str) -> bool {
    !value.chars().any(char::is_whitespace) && url::Url::parse(value).is_ok()
}

fn is_cuid(value: &str) -> bool {
    value.len() >= 9
        && value.starts_with('c')
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit())
}

/// Decimal places beyond this are not representable in an `f64`; larger
/// precisions are treated as this many.
pub const MAX_DECIMAL_PLACES: u32 = 15;

/// `10^places`, with `places` capped at [`MAX_DECIMAL_PLACES`].
pub fn decimal_scale(places: u32) -> f64 {
    10f64.powi(places.min(MAX_DECIMAL_PLACES) as i32)
}

/// Smallest step representable with `places` decimal places.
pub fn decimal_step(places: u32) -> f64 {
    decimal_scale(places).recip()
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|value| value.and_utc())
}

/// A regular expression kept together with its source text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
}

impl Pattern {
    /// Compile `source`. An invalid expression is kept and rejects every value.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let regex = Regex::new(&source).ok();
        Self { source, regex }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
    pub format: Option<StringFormat>,
}

#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub integer: bool,
    pub sign: Option<NumberSign>,
    pub precision: Option<u32>,
}

impl NumberSchema {
    pub fn integer() -> Self {
        Self {
            integer: true,
            ..Self::default()
        }
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DateTimeSchema {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ArraySchema {
    pub item: Box<ValidationSchema>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    pub fields: IndexMap<String, ValidationSchema>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, schema: ValidationSchema) -> Self {
        self.fields.insert(name.into(), schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ValidationSchema> {
        self.fields.get(name)
    }

    /// Names of fields that must be present in a parsed value.
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, schema)| !schema.is_optional())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalizedSchema {
    pub locales: Vec<String>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub description: Option<String>,
    pub deprecated: bool,
}

#[derive(Debug, Clone)]
pub enum ValidationSchema {
    /// Accepts any value, including a missing one.
    Any,
    String(StringSchema),
    Number(NumberSchema),
    Boolean,
    DateTime(DateTimeSchema),
    Enum(Vec<String>),
    Array(ArraySchema),
    Object(ObjectSchema),
    Localized(LocalizedSchema),
    Transform(Box<ValidationSchema>, Vec<TextTransform>),
    Nullable(Box<ValidationSchema>),
    Optional(Box<ValidationSchema>),
    Default(Box<ValidationSchema>, Value),
    Annotated(Box<ValidationSchema>, Annotation),
}

impl ValidationSchema {
    pub fn string() -> Self {
        ValidationSchema::String(StringSchema::default())
    }

    pub fn formatted(format: StringFormat) -> Self {
        ValidationSchema::String(StringSchema {
            format: Some(format),
            ..StringSchema::default()
        })
    }

    pub fn array(item: ValidationSchema) -> Self {
        ValidationSchema::Array(ArraySchema {
            item: Box::new(item),
            min_items: None,
            max_items: None,
        })
    }

    pub fn optional(self) -> Self {
        if self.is_optional() {
            self
        } else {
            ValidationSchema::Optional(Box::new(self))
        }
    }

    pub fn nullable(self) -> Self {
        ValidationSchema::Nullable(Box::new(self))
    }

    pub fn with_default(self, value: Value) -> Self {
        ValidationSchema::Default(Box::new(self), value)
    }

    /// Drop default wrappers from the outer chain, keeping optionality.
    pub fn without_default(self) -> Self {
        match self {
            ValidationSchema::Default(inner, _) => inner.without_default(),
            ValidationSchema::Annotated(inner, annotation) => {
                ValidationSchema::Annotated(Box::new(inner.without_default()), annotation)
            }
            other => other,
        }
    }

    /// Whether a missing value is accepted.
    pub fn is_optional(&self) -> bool {
        match self {
            ValidationSchema::Optional(_) | ValidationSchema::Default(..) => true,
            ValidationSchema::Annotated(inner, _) => inner.is_optional(),
            _ => false,
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            ValidationSchema::Nullable(_) => true,
            ValidationSchema::Optional(inner)
            | ValidationSchema::Default(inner, _)
            | ValidationSchema::Annotated(inner, _) => inner.is_nullable(),
            _ => false,
        }
    }

    pub fn default_value(&self) -> Option<&Value> {
        match self {
            ValidationSchema::Default(_, value) => Some(value),
            ValidationSchema::Annotated(inner, _) | ValidationSchema::Optional(inner) => {
                inner.default_value()
            }
            _ => None,
        }
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        match self {
            ValidationSchema::Annotated(_, annotation) => Some(annotation),
            _ => None,
        }
    }

    /// The innermost schema with every wrapper peeled off.
    pub fn base(&self) -> &ValidationSchema {
        match self {
            ValidationSchema::Transform(inner, _)
            | ValidationSchema::Nullable(inner)
            | ValidationSchema::Optional(inner)
            | ValidationSchema::Default(inner, _)
            | ValidationSchema::Annotated(inner, _) => inner.base(),
            other => other,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self.base() {
            ValidationSchema::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Validate `value`, returning it normalized: transforms applied, defaults
    /// filled in and unknown object keys dropped.
    pub fn parse(&self, value: &Value) -> Result<Value, ValidationErrors> {
        let mut issues = Vec::new();
        let parsed = self.check(Some(value), "", &mut issues);
        if issues.is_empty() {
            Ok(parsed.unwrap_or(Value::Null))
        } else {
            Err(ValidationErrors::new(issues))
        }
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.parse(value).is_ok()
    }

    fn check(
        &self,
        value: Option<&Value>,
        path: &str,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Value> {
        match self {
            ValidationSchema::Any => value.cloned(),
            ValidationSchema::Optional(inner) => {
                value.and_then(|value| inner.check(Some(value), path, issues))
            }
            ValidationSchema::Default(inner, default) => {
                inner.check(Some(value.unwrap_or(default)), path, issues)
            }
            ValidationSchema::Nullable(inner) => match value {
                Some(Value::Null) => Some(Value::Null),
                other => inner.check(other, path, issues),
            },
            ValidationSchema::Annotated(inner, _) => inner.check(value, path, issues),
            ValidationSchema::Transform(inner, transforms) => {
                match inner.check(value, path, issues)? {
                    Value::String(text) => Some(Value::String(
                        transforms
                            .iter()
                            .fold(text, |acc, transform| transform.apply(&acc)),
                    )),
                    other => Some(other),
                }
            }
            base => {
                let Some(value) = value else {
                    issues.push(ValidationIssue::new(path, "required", "value is required"));
                    return None;
                };
                base.check_present(value, path, issues)
            }
        }
    }

    fn check_present(
        &self,
        value: &Value,
        path: &str,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Value> {
        let before = issues.len();
        let parsed = match self {
            ValidationSchema::String(schema) => {
                check_string(schema, value, path, issues);
                Some(value.clone())
            }
            ValidationSchema::Number(schema) => {
                check_number(schema, value, path, issues);
                Some(value.clone())
            }
            ValidationSchema::Boolean => {
                if !value.is_boolean() {
                    issues.push(invalid_type(path, "boolean", value));
                }
                Some(value.clone())
            }
            ValidationSchema::DateTime(schema) => {
                check_datetime(schema, value, path, issues);
                Some(value.clone())
            }
            ValidationSchema::Enum(values) => {
                match value.as_str() {
                    Some(member) if values.iter().any(|candidate| candidate == member) => {}
                    _ => issues.push(ValidationIssue::new(
                        path,
                        "invalid_enum_value",
                        format!("expected one of [{}]", values.join(", ")),
                    )),
                }
                Some(value.clone())
            }
            ValidationSchema::Array(schema) => check_array(schema, value, path, issues),
            ValidationSchema::Object(schema) => check_object(schema, value, path, issues),
            ValidationSchema::Localized(schema) => check_localized(schema, value, path, issues),
            wrapper => wrapper.check(Some(value), path, issues),
        };

        if issues.len() > before { None } else { parsed }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid_type(path: &str, expected: &str, value: &Value) -> ValidationIssue {
    ValidationIssue::new(
        path,
        "invalid_type",
        format!("expected {expected}, received {}", type_name(value)),
    )
}

fn check_string(
    schema: &StringSchema,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(text) = value.as_str() else {
        issues.push(invalid_type(path, "string", value));
        return;
    };

    let length = text.chars().count();
    if let Some(min) = schema.min_length
        && length < min
    {
        issues.push(ValidationIssue::new(
            path,
            "too_short",
            format!("must contain at least {min} character(s)"),
        ));
    }
    if let Some(max) = schema.max_length
        && length > max
    {
        issues.push(ValidationIssue::new(
            path,
            "too_long",
            format!("must contain at most {max} character(s)"),
        ));
    }

    if let Some(pattern) = &schema.pattern {
        match &pattern.regex {
            Some(regex) if regex.is_match(text) => {}
            Some(_) => issues.push(ValidationIssue::new(
                path,
                "invalid_string",
                format!("must match pattern {}", pattern.source),
            )),
            None => issues.push(ValidationIssue::new(
                path,
                "invalid_pattern",
                format!("pattern {} does not compile", pattern.source),
            )),
        }
    }

    if let Some(format) = schema.format
        && !format.matches(text)
    {
        issues.push(ValidationIssue::new(
            path,
            "invalid_format",
            format!("must be a valid {}", format.as_str()),
        ));
    }
}

fn check_number(
    schema: &NumberSchema,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(number) = value.as_f64() else {
        issues.push(invalid_type(path, "number", value));
        return;
    };

    if schema.integer && number.fract() != 0.0 {
        issues.push(ValidationIssue::new(path, "not_integer", "must be an integer"));
    }
    if let Some(min) = schema.min
        && number < min
    {
        issues.push(ValidationIssue::new(
            path,
            "too_small",
            format!("must be greater than or equal to {min}"),
        ));
    }
    if let Some(max) = schema.max
        && number > max
    {
        issues.push(ValidationIssue::new(
            path,
            "too_big",
            format!("must be less than or equal to {max}"),
        ));
    }
    match schema.sign {
        Some(NumberSign::Positive) if number <= 0.0 => {
            issues.push(ValidationIssue::new(path, "not_positive", "must be positive"));
        }
        Some(NumberSign::Negative) if number >= 0.0 => {
            issues.push(ValidationIssue::new(path, "not_negative", "must be negative"));
        }
        _ => {}
    }
    if let Some(places) = schema.precision {
        let scaled = number * decimal_scale(places);
        if (scaled - scaled.round()).abs() > 1e-9 * scaled.abs().max(1.0) {
            issues.push(ValidationIssue::new(
                path,
                "invalid_precision",
                format!("must have at most {places} decimal place(s)"),
            ));
        }
    }
}

fn check_datetime(
    schema: &DateTimeSchema,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(raw) = value.as_str() else {
        issues.push(invalid_type(path, "date string", value));
        return;
    };
    let Some(parsed) = parse_datetime(raw) else {
        issues.push(ValidationIssue::new(
            path,
            "invalid_date",
            "must be an RFC 3339 timestamp or YYYY-MM-DD date",
        ));
        return;
    };

    if let Some(min) = schema.min
        && parsed < min
    {
        issues.push(ValidationIssue::new(
            path,
            "too_small",
            format!("must not be before {}", min.to_rfc3339()),
        ));
    }
    if let Some(max) = schema.max
        && parsed > max
    {
        issues.push(ValidationIssue::new(
            path,
            "too_big",
            format!("must not be after {}", max.to_rfc3339()),
        ));
    }
}

fn check_array(
    schema: &ArraySchema,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    let Some(items) = value.as_array() else {
        issues.push(invalid_type(path, "array", value));
        return None;
    };

    if let Some(min) = schema.min_items
        && items.len() < min
    {
        issues.push(ValidationIssue::new(
            path,
            "too_small",
            format!("must contain at least {min} item(s)"),
        ));
    }
    if let Some(max) = schema.max_items
        && items.len() > max
    {
        issues.push(ValidationIssue::new(
            path,
            "too_big",
            format!("must contain at most {max} item(s)"),
        ));
    }

    let mut parsed = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item_path = format!("{path}/{index}");
        if let Some(value) = schema.item.check(Some(item), &item_path, issues) {
            parsed.push(value);
        }
    }
    Some(Value::Array(parsed))
}

fn check_object(
    schema: &ObjectSchema,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    let Some(map) = value.as_object() else {
        issues.push(invalid_type(path, "object", value));
        return None;
    };

    let mut parsed = Map::new();
    for (name, field) in &schema.fields {
        let field_path = format!("{path}/{name}");
        if let Some(value) = field.check(map.get(name), &field_path, issues) {
            parsed.insert(name.clone(), value);
        }
    }
    Some(Value::Object(parsed))
}

fn check_localized(
    schema: &LocalizedSchema,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    let Some(map) = value.as_object() else {
        issues.push(invalid_type(path, "object", value));
        return None;
    };

    let mut parsed = Map::new();
    for (locale, text) in map {
        let locale_path = format!("{path}/{locale}");
        if !schema.locales.iter().any(|known| known == locale) {
            issues.push(ValidationIssue::new(
                locale_path,
                "unknown_locale",
                format!("locale '{locale}' is not declared"),
            ));
            continue;
        }
        if !text.is_string() {
            issues.push(invalid_type(&locale_path, "string", text));
            continue;
        }
        parsed.insert(locale.clone(), text.clone());
    }

    for locale in &schema.required {
        let present = map
            .get(locale)
            .and_then(Value::as_str)
            .is_some_and(|text| !text.is_empty());
        if !present {
            issues.push(ValidationIssue::new(
                format!("{path}/{locale}"),
                "missing_locale",
                format!("a translation for '{locale}' is required"),
            ));
        }
    }
    Some(Value::Object(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_collects_every_issue() {
        let schema = ValidationSchema::Object(
            ObjectSchema::new()
                .field("name", ValidationSchema::string())
                .field("age", ValidationSchema::Number(NumberSchema::integer())),
        );

        let errors = schema
            .parse(&json!({"age": 1.5}))
            .expect_err("two issues expected");
        assert!(errors.has_path("/name"));
        assert!(errors.has_code("not_integer"));
        assert_eq!(errors.issues().len(), 2);
    }

    #[test]
    fn unknown_keys_are_stripped() {
        let schema = ValidationSchema::Object(
            ObjectSchema::new().field("name", ValidationSchema::string()),
        );
        let parsed = schema
            .parse(&json!({"name": "a", "extra": true}))
            .expect("valid object");
        assert_eq!(parsed, json!({"name": "a"}));
    }

    #[test]
    fn default_fills_missing_values_only() {
        let schema = ValidationSchema::Object(ObjectSchema::new().field(
            "role",
            ValidationSchema::Enum(vec!["user".into(), "admin".into()])
                .optional()
                .with_default(json!("user")),
        ));
        assert_eq!(schema.parse(&json!({})).expect("default"), json!({"role": "user"}));
        assert_eq!(
            schema.parse(&json!({"role": "admin"})).expect("explicit"),
            json!({"role": "admin"})
        );
    }

    #[test]
    fn invalid_pattern_rejects_everything() {
        let schema = ValidationSchema::String(StringSchema {
            pattern: Some(Pattern::new("([a-z")),
            ..StringSchema::default()
        });
        let errors = schema.parse(&json!("abc")).expect_err("invalid pattern");
        assert!(errors.has_code("invalid_pattern"));
    }

    #[test]
    fn formats_accept_and_reject() {
        assert!(StringFormat::Email.matches("a@b.com"));
        assert!(!StringFormat::Email.matches("a@b"));
        assert!(!StringFormat::Email.matches("a b@c.com"));
        assert!(StringFormat::Url.matches("https://example.com/x"));
        assert!(StringFormat::Url.matches("ftp://example.com"));
        assert!(!StringFormat::Url.matches("example.com/x"));
        assert!(!StringFormat::Url.matches("https://exa mple.com"));
        assert!(StringFormat::Uuid.matches("6f1c2a1e-8a55-4c7b-9a43-1f1b2c3d4e5f"));
        assert!(StringFormat::Cuid.matches("ckq8z1x2y0000abcd1234efgh"));
    }

    #[test]
    fn oversized_precision_is_capped() {
        assert_eq!(decimal_step(2), 0.01);
        assert_eq!(decimal_scale(u32::MAX), decimal_scale(MAX_DECIMAL_PLACES));
        let schema = ValidationSchema::Number(NumberSchema {
            precision: Some(2_147_483_648),
            ..NumberSchema::default()
        });
        assert!(schema.is_valid(&serde_json::json!(1.25)));
    }

    #[test]
    fn dates_accept_plain_dates_and_timestamps() {
        assert!(parse_datetime("2024-03-01").is_some());
        assert!(parse_datetime("2024-03-01T10:00:00Z").is_some());
        assert!(parse_datetime("03/01/2024").is_none());
    }
}
