//! Import payload validation
//!
//! Template payloads arrive through copy-pasted share links, so nothing in them
//! is trusted. [`validate_payload`] decodes an arbitrary JSON value into typed
//! templates against a strict allow-list and size limits, stopping at the first
//! problem.

use super::tokens::placeholders;
use super::{text_len, FieldType, Template, TemplateField};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;

const PAYLOAD_KEYS: &[&str] = &["templates"];
const TEMPLATE_KEYS: &[&str] = &["id", "name", "description", "template", "fields"];
const FIELD_KEYS: &[&str] = &["key", "label", "type", "default", "options"];

/// Size and count bounds applied to imported templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportLimits {
    pub max_templates: usize,
    pub max_id_length: usize,
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub max_template_length: usize,
    pub max_fields: usize,
    pub max_field_key_length: usize,
    pub max_field_label_length: usize,
    pub max_field_default_length: usize,
    pub max_options: usize,
    pub max_option_length: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_templates: 20,
            max_id_length: 64,
            max_name_length: 120,
            max_description_length: 1000,
            max_template_length: 20000,
            max_fields: 50,
            max_field_key_length: 64,
            max_field_label_length: 120,
            max_field_default_length: 2000,
            max_options: 100,
            max_option_length: 120,
        }
    }
}

/// First problem found in an import payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Import payload must be an object.")]
    PayloadNotObject,
    #[error("Import payload has unknown keys.")]
    PayloadUnknownKeys,
    #[error("Import payload templates must be an array.")]
    TemplatesNotArray,
    #[error("No templates found in import payload.")]
    NoTemplates,
    #[error("Too many templates in import payload.")]
    TooManyTemplates,

    #[error("Template must be an object.")]
    TemplateNotObject,
    #[error("Template contains unknown keys.")]
    TemplateUnknownKeys,
    #[error("Template has invalid types.")]
    TemplateInvalidTypes,
    #[error("Template id is missing or too long.")]
    TemplateId,
    #[error("Template name is missing or too long.")]
    TemplateName,
    #[error("Template description is too long.")]
    TemplateDescription,
    #[error("Template body is missing or too long.")]
    TemplateBody,
    #[error("Template has too many fields.")]
    TooManyFields,

    #[error("Each field must be an object.")]
    FieldNotObject,
    #[error("Field contains unknown keys.")]
    FieldUnknownKeys,
    #[error("Field has invalid types.")]
    FieldInvalidTypes,
    #[error("Field type is not allowed.")]
    FieldTypeNotAllowed,
    #[error("Field key is too long.")]
    FieldKey,
    #[error("Field label is too long.")]
    FieldLabel,
    #[error("Field default value is too long.")]
    FieldDefault,
    #[error("Field has too many options.")]
    TooManyOptions,
    #[error("Field options must be strings.")]
    OptionsNotStrings,
    #[error("Field option is too long.")]
    OptionTooLong,
    #[error("Select fields require options.")]
    SelectWithoutOptions,
}

/// A payload that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPayload {
    pub templates: Vec<Template>,
}

/// `{valid, error}` view of a validation run; `error` is empty when valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub error: String,
}

/// Check a payload and report the first error as a message
pub fn validate(payload: &Value, limits: &ImportLimits) -> ValidationOutcome {
    match validate_payload(payload, limits) {
        Ok(_) => ValidationOutcome {
            valid: true,
            error: String::new(),
        },
        Err(e) => ValidationOutcome {
            valid: false,
            error: e.to_string(),
        },
    }
}

/// Decode a payload into typed templates, failing on the first violation
pub fn validate_payload(payload: &Value, limits: &ImportLimits) -> Result<ImportPayload, ValidationError> {
    let object = payload.as_object().ok_or(ValidationError::PayloadNotObject)?;
    if !has_only_keys(object, PAYLOAD_KEYS) {
        return Err(ValidationError::PayloadUnknownKeys);
    }
    let templates = object
        .get("templates")
        .and_then(Value::as_array)
        .ok_or(ValidationError::TemplatesNotArray)?;
    if templates.is_empty() {
        return Err(ValidationError::NoTemplates);
    }
    if templates.len() > limits.max_templates {
        return Err(ValidationError::TooManyTemplates);
    }

    let templates = templates
        .iter()
        .map(|template| decode_template(template, limits))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ImportPayload { templates })
}

fn has_only_keys(object: &Map<String, Value>, allowed: &[&str]) -> bool {
    object.keys().all(|key| allowed.contains(&key.as_str()))
}

fn string<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn decode_template(value: &Value, limits: &ImportLimits) -> Result<Template, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::TemplateNotObject)?;
    if !has_only_keys(object, TEMPLATE_KEYS) {
        return Err(ValidationError::TemplateUnknownKeys);
    }
    let (Some(id), Some(name), Some(description), Some(body), Some(fields)) = (
        string(object, "id"),
        string(object, "name"),
        string(object, "description"),
        string(object, "template"),
        object.get("fields").and_then(Value::as_array),
    ) else {
        return Err(ValidationError::TemplateInvalidTypes);
    };

    if id.is_empty() || text_len(id) > limits.max_id_length {
        return Err(ValidationError::TemplateId);
    }
    if name.is_empty() || text_len(name) > limits.max_name_length {
        return Err(ValidationError::TemplateName);
    }
    if text_len(description) > limits.max_description_length {
        return Err(ValidationError::TemplateDescription);
    }
    if body.is_empty() || text_len(body) > limits.max_template_length {
        return Err(ValidationError::TemplateBody);
    }
    if fields.len() > limits.max_fields {
        return Err(ValidationError::TooManyFields);
    }

    let fields = fields
        .iter()
        .map(|field| decode_field(field, limits))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Template {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        body: body.to_string(),
        fields,
    })
}

fn decode_field(value: &Value, limits: &ImportLimits) -> Result<TemplateField, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::FieldNotObject)?;
    if !has_only_keys(object, FIELD_KEYS) {
        return Err(ValidationError::FieldUnknownKeys);
    }
    let (Some(key), Some(label), Some(kind), Some(default_value), Some(options)) = (
        string(object, "key"),
        string(object, "label"),
        string(object, "type"),
        string(object, "default"),
        object.get("options").and_then(Value::as_array),
    ) else {
        return Err(ValidationError::FieldInvalidTypes);
    };

    let kind: FieldType = kind.parse().map_err(|_| ValidationError::FieldTypeNotAllowed)?;
    if text_len(key) > limits.max_field_key_length {
        return Err(ValidationError::FieldKey);
    }
    if text_len(label) > limits.max_field_label_length {
        return Err(ValidationError::FieldLabel);
    }
    if text_len(default_value) > limits.max_field_default_length {
        return Err(ValidationError::FieldDefault);
    }
    if options.len() > limits.max_options {
        return Err(ValidationError::TooManyOptions);
    }
    let options = options
        .iter()
        .map(|option| option.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(ValidationError::OptionsNotStrings)?;
    if options.iter().any(|option| text_len(option) > limits.max_option_length) {
        return Err(ValidationError::OptionTooLong);
    }
    if kind == FieldType::Select && options.is_empty() {
        return Err(ValidationError::SelectWithoutOptions);
    }

    Ok(TemplateField {
        key: key.to_string(),
        label: label.to_string(),
        kind,
        default_value: default_value.to_string(),
        options,
    })
}

/// Mismatch between a body's variables and its declared fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLint {
    /// Variables with no declared field
    pub unknown_placeholders: Vec<String>,
    /// Declared fields never used as a variable
    pub unused_fields: Vec<String>,
}

impl FieldLint {
    pub fn is_clean(&self) -> bool {
        self.unknown_placeholders.is_empty() && self.unused_fields.is_empty()
    }
}

/// Cross-check `{{variable}}` keys against declared field keys, both sorted
pub fn lint_fields(body: &str, fields: &[TemplateField]) -> FieldLint {
    let used: BTreeSet<String> = placeholders(body).into_iter().collect();
    let declared: BTreeSet<&str> = fields.iter().map(|f| f.key.as_str()).collect();

    FieldLint {
        unknown_placeholders: used
            .iter()
            .filter(|key| !declared.contains(key.as_str()))
            .cloned()
            .collect(),
        unused_fields: declared
            .iter()
            .filter(|key| !used.contains(**key))
            .map(|key| key.to_string())
            .collect(),
    }
}
