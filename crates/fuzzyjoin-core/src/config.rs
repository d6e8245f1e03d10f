//! Operator configuration

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Side};

/// A lookup-row field copied into the output when a match is found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupField {
    /// Field name in the lookup stream
    pub name: String,
    /// Output field name, defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

impl LookupField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rename: None,
        }
    }

    pub fn renamed(mut self, rename: impl Into<String>) -> Self {
        self.rename = Some(rename.into());
        self
    }

    pub fn output_name(&self) -> &str {
        match self.rename.as_deref() {
            Some(r) if !r.is_empty() => r,
            _ => &self.name,
        }
    }
}

/// Configuration for the fuzzy match operator
///
/// Distance bounds are inclusive. For edit-distance algorithms they bound
/// the raw edit count, for similarity-ratio algorithms the ratio, and
/// phonetic algorithms ignore them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Algorithm name in the catalog
    pub algorithm: String,
    pub min_distance: f64,
    pub max_distance: f64,
    pub case_sensitive: bool,
    /// Key field of the main stream
    pub main_key_field: String,
    /// Key field of the lookup stream
    pub lookup_key_field: String,
    /// Output field holding the boolean match flag
    pub match_flag_field: String,
    /// Output field holding the matched lookup key
    pub value_field: Option<String>,
    /// Output field holding the score
    pub distance_field: Option<String>,
    /// Lookup fields copied into the output, in order
    pub lookup_fields: Vec<LookupField>,
    /// When false, the value field lists every lookup key within bounds
    pub closer_value: bool,
    /// Separator used when listing several lookup keys
    pub value_separator: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            algorithm: "levenshtein".to_string(),
            min_distance: 0.0,
            max_distance: 1.0,
            case_sensitive: false,
            main_key_field: String::new(),
            lookup_key_field: String::new(),
            match_flag_field: "match".to_string(),
            value_field: None,
            distance_field: None,
            lookup_fields: Vec::new(),
            closer_value: true,
            value_separator: ",".to_string(),
        }
    }
}

impl MatchConfig {
    /// Check the parts of the configuration that do not depend on schemas
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_distance, self.max_distance);
        if !min.is_finite() || !max.is_finite() {
            return Err(ConfigError::NonFiniteBounds { min, max });
        }
        if min > max {
            return Err(ConfigError::InvalidBounds { min, max });
        }
        if self.main_key_field.is_empty() {
            return Err(ConfigError::EmptyKeyField(Side::Main));
        }
        if self.lookup_key_field.is_empty() {
            return Err(ConfigError::EmptyKeyField(Side::Lookup));
        }

        let mut seen: Vec<&str> = Vec::new();
        for name in self.output_field_names() {
            if seen.contains(&name) {
                return Err(ConfigError::DuplicateOutputField(name.to_string()));
            }
            seen.push(name);
        }
        Ok(())
    }

    /// Configured value field, ignoring an empty name
    pub fn value_field(&self) -> Option<&str> {
        self.value_field.as_deref().filter(|s| !s.is_empty())
    }

    /// Configured distance field, ignoring an empty name
    pub fn distance_field(&self) -> Option<&str> {
        self.distance_field.as_deref().filter(|s| !s.is_empty())
    }

    /// Names of the fields appended to every main row, in output order
    pub fn output_field_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.match_flag_field.as_str())
            .chain(self.value_field())
            .chain(self.distance_field())
            .chain(self.lookup_fields.iter().map(LookupField::output_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> MatchConfig {
        MatchConfig {
            main_key_field: "name".into(),
            lookup_key_field: "name".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert_eq!(config().validate(), Ok(()));
    }

    #[test]
    fn test_min_above_max_is_fatal() {
        let cfg = MatchConfig {
            min_distance: 3.0,
            max_distance: 2.0,
            ..config()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidBounds { min: 3.0, max: 2.0 })
        );
    }

    #[test]
    fn test_equal_bounds_are_allowed() {
        let cfg = MatchConfig {
            min_distance: 1.0,
            max_distance: 1.0,
            ..config()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_nan_bounds_are_fatal() {
        let cfg = MatchConfig {
            max_distance: f64::NAN,
            ..config()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NonFiniteBounds { .. })));
    }

    #[test]
    fn test_missing_key_names() {
        let cfg = MatchConfig {
            lookup_key_field: String::new(),
            ..config()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyKeyField(Side::Lookup)));
    }

    #[test]
    fn test_duplicate_output_names() {
        let cfg = MatchConfig {
            value_field: Some("match".into()),
            ..config()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DuplicateOutputField("match".into()))
        );
    }

    #[test]
    fn test_output_field_order() {
        let cfg = MatchConfig {
            value_field: Some("closer".into()),
            distance_field: Some(String::new()),
            lookup_fields: vec![LookupField::new("id"), LookupField::new("city").renamed("town")],
            ..config()
        };
        let names: Vec<&str> = cfg.output_field_names().collect();
        assert_eq!(names, vec!["match", "closer", "id", "town"]);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let cfg: MatchConfig = serde_json::from_str(
            r#"{
                "algorithm": "jaro-winkler",
                "min_distance": 0.8,
                "main_key_field": "customer",
                "lookup_key_field": "name",
                "lookup_fields": [{"name": "id"}, {"name": "city", "rename": "lookup_city"}]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.algorithm, "jaro-winkler");
        assert_eq!(cfg.max_distance, 1.0);
        assert_eq!(cfg.match_flag_field, "match");
        assert!(cfg.closer_value);
        assert_eq!(cfg.lookup_fields[1].output_name(), "lookup_city");
    }
}
