//! Parameter definitions, feasible spaces and concrete grid points.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::GwResult;

/// Kind of a tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Integer,
    Real,
    Categorical,
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Real => write!(f, "real"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// Feasible space as delivered by the study configuration store.
///
/// Bounds travel as strings; `list` is only meaningful for categorical
/// parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feasible {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<String>,
}

/// Typed feasible domain of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterDomain {
    /// Inclusive integer range.
    Integer { min: i64, max: i64 },
    /// Inclusive real range.
    Real { min: f64, max: f64 },
    /// Ordered category labels.
    Categorical { categories: Vec<String> },
}

impl ParameterDomain {
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::Integer { .. } => ParameterType::Integer,
            Self::Real { .. } => ParameterType::Real,
            Self::Categorical { .. } => ParameterType::Categorical,
        }
    }
}

/// One parameter of a study's search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub name: String,
    pub parameter_type: ParameterType,
    pub feasible: Feasible,
}

impl ParameterConfig {
    pub fn integer(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            parameter_type: ParameterType::Integer,
            feasible: Feasible {
                min: Some(min.to_string()),
                max: Some(max.to_string()),
                list: Vec::new(),
            },
        }
    }

    pub fn real(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            parameter_type: ParameterType::Real,
            feasible: Feasible {
                min: Some(min.to_string()),
                max: Some(max.to_string()),
                list: Vec::new(),
            },
        }
    }

    pub fn categorical<I, S>(name: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parameter_type: ParameterType::Categorical,
            feasible: Feasible {
                min: None,
                max: None,
                list: categories.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Parse and validate the feasible space into a typed domain.
    pub fn domain(&self) -> GwResult<ParameterDomain> {
        match self.parameter_type {
            ParameterType::Integer => {
                let min: i64 = self.parse_bound("min", self.feasible.min.as_deref())?;
                let max: i64 = self.parse_bound("max", self.feasible.max.as_deref())?;
                if min > max {
                    return Err(config_error!(
                        "parameter {}: min {} is greater than max {}",
                        self.name,
                        min,
                        max
                    ));
                }
                Ok(ParameterDomain::Integer { min, max })
            }
            ParameterType::Real => {
                let min: f64 = self.parse_bound("min", self.feasible.min.as_deref())?;
                let max: f64 = self.parse_bound("max", self.feasible.max.as_deref())?;
                if !min.is_finite() || !max.is_finite() {
                    return Err(config_error!(
                        "parameter {}: bounds must be finite, got [{}, {}]",
                        self.name,
                        min,
                        max
                    ));
                }
                if min > max {
                    return Err(config_error!(
                        "parameter {}: min {} is greater than max {}",
                        self.name,
                        min,
                        max
                    ));
                }
                Ok(ParameterDomain::Real { min, max })
            }
            ParameterType::Categorical => {
                if self.feasible.list.is_empty() {
                    return Err(config_error!(
                        "parameter {}: categorical list is empty",
                        self.name
                    ));
                }
                Ok(ParameterDomain::Categorical {
                    categories: self.feasible.list.clone(),
                })
            }
        }
    }

    fn parse_bound<T>(&self, which: &str, raw: Option<&str>) -> GwResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = raw.ok_or_else(|| {
            config_error!("parameter {}: missing {} bound", self.name, which)
        })?;
        raw.trim().parse::<T>().map_err(|e| {
            config_error!(
                "parameter {}: invalid {} bound {:?}: {}",
                self.name,
                which,
                raw,
                e
            )
        })
    }
}

/// Study configuration as returned by the parameter-space provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    pub name: String,
    pub parameter_configs: Vec<ParameterConfig>,
}

impl StudyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_configs: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, config: ParameterConfig) -> Self {
        self.parameter_configs.push(config);
        self
    }

    /// Check the study is non-empty and parameter names are unique.
    pub fn validate(&self) -> GwResult<()> {
        if self.parameter_configs.is_empty() {
            return Err(config_error!("study {} has no parameters", self.name));
        }
        let mut seen = HashSet::new();
        for pc in &self.parameter_configs {
            if !seen.insert(pc.name.as_str()) {
                return Err(config_error!(
                    "study {}: duplicate parameter name {}",
                    self.name,
                    pc.name
                ));
            }
        }
        Ok(())
    }
}

/// One concrete assignment inside a grid point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub parameter_type: ParameterType,
    pub value: String,
}

/// A fully specified combination of parameter values, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Flat position of this point in its grid.
    pub index: usize,
    pub parameters: Vec<Parameter>,
}

impl GridPoint {
    /// Value assigned to `name`, if the point has such a parameter.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GwError;

    #[test]
    fn test_integer_domain_parses() {
        let pc = ParameterConfig::integer("layers", 1, 8);
        assert_eq!(pc.domain().unwrap(), ParameterDomain::Integer { min: 1, max: 8 });
    }

    #[test]
    fn test_real_domain_parses_wire_strings() {
        let pc = ParameterConfig {
            name: "lr".into(),
            parameter_type: ParameterType::Real,
            feasible: Feasible {
                min: Some(" 0.001".into()),
                max: Some("0.1".into()),
                list: Vec::new(),
            },
        };
        assert_eq!(
            pc.domain().unwrap(),
            ParameterDomain::Real { min: 0.001, max: 0.1 }
        );
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = ParameterConfig::integer("x", 5, 1).domain().unwrap_err();
        assert!(matches!(err, GwError::Config(_)));
        assert!(err.to_string().contains("greater than max"));
    }

    #[test]
    fn test_unparsable_bound_rejected() {
        let pc = ParameterConfig {
            name: "x".into(),
            parameter_type: ParameterType::Integer,
            feasible: Feasible {
                min: Some("one".into()),
                max: Some("10".into()),
                list: Vec::new(),
            },
        };
        assert!(matches!(pc.domain(), Err(GwError::Config(_))));
    }

    #[test]
    fn test_missing_bound_rejected() {
        let pc = ParameterConfig {
            name: "x".into(),
            parameter_type: ParameterType::Real,
            feasible: Feasible::default(),
        };
        let err = pc.domain().unwrap_err();
        assert!(err.to_string().contains("missing min bound"));
    }

    #[test]
    fn test_non_finite_real_rejected() {
        let pc = ParameterConfig::real("x", 0.0, f64::INFINITY);
        assert!(matches!(pc.domain(), Err(GwError::Config(_))));
    }

    #[test]
    fn test_empty_categorical_rejected() {
        let pc = ParameterConfig::categorical("opt", Vec::<String>::new());
        assert!(matches!(pc.domain(), Err(GwError::Config(_))));
    }

    #[test]
    fn test_study_validation() {
        assert!(StudyConfig::new("empty").validate().is_err());

        let dup = StudyConfig::new("dup")
            .with_parameter(ParameterConfig::integer("a", 0, 1))
            .with_parameter(ParameterConfig::real("a", 0.0, 1.0));
        assert!(dup.validate().unwrap_err().to_string().contains("duplicate"));

        let ok = StudyConfig::new("ok")
            .with_parameter(ParameterConfig::integer("a", 0, 1))
            .with_parameter(ParameterConfig::categorical("b", ["x", "y"]));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_study_config_serde() {
        let json = r#"{
            "name": "mnist",
            "parameter_configs": [
                {"name": "lr", "parameter_type": "real", "feasible": {"min": "0.01", "max": "0.05"}},
                {"name": "optimizer", "parameter_type": "categorical", "feasible": {"list": ["sgd", "adam"]}}
            ]
        }"#;
        let study: StudyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(study.parameter_configs.len(), 2);
        assert_eq!(study.parameter_configs[1].feasible.list, vec!["sgd", "adam"]);
        assert_eq!(study.parameter_configs[0].feasible.min.as_deref(), Some("0.01"));
    }

    #[test]
    fn test_grid_point_value_lookup() {
        let point = GridPoint {
            index: 0,
            parameters: vec![Parameter {
                name: "a".into(),
                parameter_type: ParameterType::Integer,
                value: "3".into(),
            }],
        };
        assert_eq!(point.value("a"), Some("3"));
        assert_eq!(point.value("b"), None);
    }
}
