//! Schema definition and registry
//!
//! The definition is the deserialized YAML document. The registry wraps a
//! definition that passed structural validation and answers the lookups the
//! loader needs. Rules are iterated generically; no field has its own code path.

use crate::error::{SchemaError, SchemaResult};
use crate::field::FieldSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

const BUILTIN_SCHEMA: &str = include_str!("../config/arkemy_schema.yaml");

const REQUIRED_SECTIONS: [&str; 4] = ["schema_version", "settings", "record_types", "fields"];

/// `settings` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSettings {
    /// Column whose value selects the record type of a row
    #[serde(default = "default_record_type_column")]
    pub record_type_column: String,
    /// Discriminator value of the tag-label sentinel row
    #[serde(default = "default_label_mapping_value")]
    pub label_mapping_value: String,
}

fn default_record_type_column() -> String {
    "record_kind".to_string()
}

fn default_label_mapping_value() -> String {
    "label-mapping".to_string()
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            record_type_column: default_record_type_column(),
            label_mapping_value: default_label_mapping_value(),
        }
    }
}

/// `validation` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Keep columns the schema does not declare, as text
    #[serde(default = "default_true")]
    pub allow_unknown_fields: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            allow_unknown_fields: true,
        }
    }
}

/// One record variant
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordTypeSpec {
    /// Name shown to users
    #[serde(default)]
    pub display_name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Columns every non-empty partition must carry
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Columns loaded as nulls when absent
    #[serde(default)]
    pub optional_fields: Vec<String>,
}

impl RecordTypeSpec {
    /// Required fields followed by optional fields
    pub fn all_fields(&self) -> impl Iterator<Item = &str> {
        self.required_fields
            .iter()
            .chain(&self.optional_fields)
            .map(String::as_str)
    }
}

/// The schema document as written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Schema revision, numeric or text in the source file
    #[serde(deserialize_with = "version_string")]
    pub schema_version: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Discriminator settings
    pub settings: SchemaSettings,
    /// Record variants in declaration order
    pub record_types: IndexMap<String, RecordTypeSpec>,
    /// Field metadata in declaration order
    pub fields: IndexMap<String, FieldSpec>,
    /// Validation policy
    #[serde(default)]
    pub validation: ValidationSettings,
}

fn version_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "schema_version must be a string or number, got {other:?}"
        ))),
    }
}

/// Summary of a loaded schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaInfo {
    /// Schema revision
    pub version: String,
    /// Free-form description
    pub description: String,
    /// Declared record types
    pub record_types: Vec<String>,
    /// Number of declared fields
    pub field_count: usize,
}

/// Validated, immutable schema
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    definition: SchemaDefinition,
}

impl SchemaRegistry {
    /// Parse and validate a schema document
    ///
    /// # Errors
    /// Fails on YAML syntax errors, missing top-level sections, record types
    /// referencing undeclared fields, or malformed bounds.
    pub fn from_yaml_str(source: &str) -> SchemaResult<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(source)?;
        let serde_yaml::Value::Mapping(map) = &document else {
            return Err(SchemaError::Syntax("schema root must be a mapping".to_string()));
        };
        for section in REQUIRED_SECTIONS {
            if !map.contains_key(section) {
                return Err(SchemaError::MissingSection(section));
            }
        }

        let definition: SchemaDefinition = serde_yaml::from_value(document)?;
        Self::from_definition(definition)
    }

    /// Read, parse and validate a schema file
    ///
    /// # Errors
    /// Fails when the file cannot be read or does not validate.
    pub fn from_path(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|e| SchemaError::io_error(path, e))?;
        let registry = Self::from_yaml_str(&source)?;
        tracing::info!(
            path = %path.display(),
            version = %registry.definition.schema_version,
            "loaded schema"
        );
        Ok(registry)
    }

    /// Schema shipped with the crate
    ///
    /// # Errors
    /// Only fails if the embedded document has been edited into an invalid state.
    pub fn builtin() -> SchemaResult<Self> {
        Self::from_yaml_str(BUILTIN_SCHEMA)
    }

    /// Validate an already deserialized definition
    ///
    /// # Errors
    /// See [`SchemaRegistry::from_yaml_str`].
    pub fn from_definition(definition: SchemaDefinition) -> SchemaResult<Self> {
        for (kind, spec) in &definition.record_types {
            for field in spec.all_fields() {
                if !definition.fields.contains_key(field) {
                    return Err(SchemaError::undeclared(kind, field));
                }
            }
        }
        for (name, spec) in &definition.fields {
            if spec.has_bounds() && !spec.field_type.is_numeric() {
                return Err(SchemaError::BoundsOnNonNumeric {
                    field: name.clone(),
                    field_type: spec.field_type.to_string(),
                });
            }
            if let (Some(min), Some(max)) = (spec.min_value, spec.max_value) {
                if min > max {
                    return Err(SchemaError::InvertedBounds {
                        field: name.clone(),
                        min,
                        max,
                    });
                }
            }
        }
        Ok(Self { definition })
    }

    /// Underlying definition
    #[inline]
    #[must_use]
    pub fn definition(&self) -> &SchemaDefinition {
        &self.definition
    }

    /// Declared record type names in declaration order
    pub fn record_types(&self) -> impl Iterator<Item = &str> {
        self.definition.record_types.keys().map(String::as_str)
    }

    /// Look up a record type
    #[inline]
    #[must_use]
    pub fn record_type(&self, kind: &str) -> Option<&RecordTypeSpec> {
        self.definition.record_types.get(kind)
    }

    fn record_type_or_err(&self, kind: &str) -> SchemaResult<&RecordTypeSpec> {
        self.record_type(kind)
            .ok_or_else(|| SchemaError::UnknownRecordType(kind.to_string()))
    }

    /// Look up field metadata
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.definition.fields.get(name)
    }

    /// Required fields of a record type
    ///
    /// # Errors
    /// Returns [`SchemaError::UnknownRecordType`] for undeclared kinds.
    pub fn required_fields(&self, kind: &str) -> SchemaResult<&[String]> {
        Ok(&self.record_type_or_err(kind)?.required_fields)
    }

    /// Optional fields of a record type
    ///
    /// # Errors
    /// Returns [`SchemaError::UnknownRecordType`] for undeclared kinds.
    pub fn optional_fields(&self, kind: &str) -> SchemaResult<&[String]> {
        Ok(&self.record_type_or_err(kind)?.optional_fields)
    }

    /// Required followed by optional fields of a record type
    ///
    /// # Errors
    /// Returns [`SchemaError::UnknownRecordType`] for undeclared kinds.
    pub fn all_fields(&self, kind: &str) -> SchemaResult<Vec<&str>> {
        Ok(self.record_type_or_err(kind)?.all_fields().collect())
    }

    /// Discriminator column name
    #[inline]
    #[must_use]
    pub fn discriminator(&self) -> &str {
        &self.definition.settings.record_type_column
    }

    /// Discriminator value of the tag-label sentinel row
    #[inline]
    #[must_use]
    pub fn label_mapping_value(&self) -> &str {
        &self.definition.settings.label_mapping_value
    }

    /// Whether undeclared columns are kept
    #[inline]
    #[must_use]
    pub fn allow_unknown_fields(&self) -> bool {
        self.definition.validation.allow_unknown_fields
    }

    /// Required fields of `kind` missing from `columns`
    ///
    /// # Errors
    /// Returns the missing names in declaration order, or
    /// [`SchemaError::UnknownRecordType`] for undeclared kinds.
    pub fn check_required<S: AsRef<str>>(
        &self,
        kind: &str,
        columns: &[S],
    ) -> SchemaResult<Result<(), Vec<String>>> {
        let missing: Vec<String> = self
            .required_fields(kind)?
            .iter()
            .filter(|f| !columns.iter().any(|c| c.as_ref() == f.as_str()))
            .cloned()
            .collect();
        Ok(if missing.is_empty() { Ok(()) } else { Err(missing) })
    }

    /// Summary of the schema
    #[must_use]
    pub fn info(&self) -> SchemaInfo {
        SchemaInfo {
            version: self.definition.schema_version.clone(),
            description: self.definition.description.clone(),
            record_types: self.record_types().map(str::to_string).collect(),
            field_count: self.definition.fields.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    const MINIMAL: &str = r"
schema_version: 1.0
settings: {}
record_types:
  actual:
    required_fields: [hours]
fields:
  hours:
    type: float
    min_value: 0
";

    #[test]
    fn builtin_schema_loads() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert_eq!(registry.discriminator(), "record_kind");
        assert_eq!(registry.label_mapping_value(), "label-mapping");
        let kinds: Vec<_> = registry.record_types().collect();
        assert_eq!(kinds, vec!["actual", "planned"]);
        assert!(registry.allow_unknown_fields());
    }

    #[test]
    fn numeric_version_is_accepted() {
        let registry = SchemaRegistry::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(registry.info().version, "1.0");
        assert_eq!(
            registry.field("hours").map(|f| f.field_type),
            Some(FieldType::Float)
        );
    }

    #[test]
    fn missing_section_is_named() {
        let err = SchemaRegistry::from_yaml_str("schema_version: 1\nsettings: {}\nfields: {}\n")
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingSection("record_types")));
    }

    #[test]
    fn undeclared_optional_field_rejected() {
        let src = MINIMAL.replace(
            "required_fields: [hours]",
            "required_fields: [hours]\n    optional_fields: [fee]",
        );
        let err = SchemaRegistry::from_yaml_str(&src).unwrap_err();
        assert_eq!(
            err.to_string(),
            "record type 'actual' references undeclared field 'fee'"
        );
    }

    #[test]
    fn inverted_bounds_rejected() {
        let src = MINIMAL.replace("min_value: 0", "min_value: 10\n    max_value: 1");
        let err = SchemaRegistry::from_yaml_str(&src).unwrap_err();
        assert!(matches!(err, SchemaError::InvertedBounds { .. }));
    }

    #[test]
    fn check_required_lists_missing() {
        let registry = SchemaRegistry::builtin().unwrap();
        let columns = ["record_date", "person_name", "project_number", "hours_used"];
        let missing = registry.check_required("actual", &columns).unwrap().unwrap_err();
        assert_eq!(missing, vec!["fee_record", "cost_record"]);
        assert!(registry.check_required("nope", &columns).is_err());
    }

    #[test]
    fn all_fields_required_first() {
        let registry = SchemaRegistry::builtin().unwrap();
        let fields = registry.all_fields("planned").unwrap();
        assert_eq!(fields[0], "record_date");
        assert!(fields.contains(&"planned_fee"));
    }
}
