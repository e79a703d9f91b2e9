// Argument Mapping - expands a declared parameter space into invocation arguments

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::{ConfigError, Result};

/// Separator between parameter values in one invocation argument string
pub const ARGUMENT_SEPARATOR: &str = " ";

/// A single configured value. Keeps the JSON type; stringified only when an
/// invocation argument is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgValue(serde_json::Value);

impl ArgValue {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Flatten a JSON value into an ordered value sequence.
    /// A scalar becomes a one-element sequence, nested arrays are flattened in order.
    pub fn sequence(value: &serde_json::Value) -> Vec<ArgValue> {
        match value {
            serde_json::Value::Array(entries) => entries.iter().flat_map(Self::sequence).collect(),
            other => vec![ArgValue(other.clone())],
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => f.write_str(s),
            serde_json::Value::Null => Ok(()),
            other => write!(f, "{}", other),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        Self(serde_json::Value::String(s.to_string()))
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        Self(serde_json::Value::from(n))
    }
}

/// How parameter sequences are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapperMode {
    /// i-th value of every parameter forms the i-th invocation
    Linear,
    /// every combination, first-declared parameter varies slowest
    CartesianProduct,
}

impl fmt::Display for MapperMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperMode::Linear => write!(f, "linear"),
            MapperMode::CartesianProduct => write!(f, "cartesian-product"),
        }
    }
}

impl FromStr for MapperMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(MapperMode::Linear),
            "cartesian-product" | "cartesian" => Ok(MapperMode::CartesianProduct),
            _ => Err(ConfigError::UnknownMapper(s.to_string())),
        }
    }
}

/// One named parameter and its ordered values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub values: Vec<ArgValue>,
}

/// Parameter table plus combination mode.
///
/// `file_names` is set when the parameters came from a file-backed
/// (`pira-file`) block; the names then fix the parameter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArgumentMapping")]
pub struct ArgumentMapping {
    mode: MapperMode,
    params: Vec<Parameter>,
    file_names: Option<Vec<String>>,
}

/// Unvalidated wire form; deserialization goes through `ArgumentMapping::new`
#[derive(Deserialize)]
struct RawArgumentMapping {
    mode: MapperMode,
    params: Vec<Parameter>,
    #[serde(default)]
    file_names: Option<Vec<String>>,
}

impl TryFrom<RawArgumentMapping> for ArgumentMapping {
    type Error = ConfigError;

    fn try_from(raw: RawArgumentMapping) -> Result<Self> {
        let mapping = Self::new(raw.mode, raw.params)?;
        Ok(match raw.file_names {
            Some(names) => mapping.with_file_names(names),
            None => mapping,
        })
    }
}

impl ArgumentMapping {
    /// Build a mapping, rejecting unequal sequence lengths in linear mode.
    pub fn new(mode: MapperMode, params: Vec<Parameter>) -> Result<Self> {
        if mode == MapperMode::Linear {
            if let Some(first) = params.first() {
                let expected = first.values.len();
                if let Some(bad) = params.iter().find(|p| p.values.len() != expected) {
                    return Err(ConfigError::LengthMismatch {
                        param: bad.name.clone(),
                        expected,
                        found: bad.values.len(),
                    });
                }
            }
        }

        Ok(Self {
            mode,
            params,
            file_names: None,
        })
    }

    /// Mapping with no parameters (yields the single empty invocation)
    pub fn empty(mode: MapperMode) -> Self {
        Self {
            mode,
            params: Vec::new(),
            file_names: None,
        }
    }

    pub fn with_file_names(mut self, names: Vec<String>) -> Self {
        self.file_names = Some(names);
        self
    }

    pub fn mode(&self) -> MapperMode {
        self.mode
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn is_file_backed(&self) -> bool {
        self.file_names.is_some()
    }

    pub fn file_names(&self) -> Option<&[String]> {
        self.file_names.as_deref()
    }

    /// Number of run configurations this mapping expands to
    pub fn len(&self) -> usize {
        if self.params.is_empty() {
            return 1;
        }
        match self.mode {
            MapperMode::Linear => self.params.iter().map(|p| p.values.len()).min().unwrap_or(0),
            MapperMode::CartesianProduct => self.params.iter().map(|p| p.values.len()).product(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concrete value combinations in run order
    pub fn combinations(&self) -> Vec<Vec<&ArgValue>> {
        if self.params.is_empty() {
            return vec![Vec::new()];
        }

        match self.mode {
            MapperMode::Linear => (0..self.len())
                .map(|i| self.params.iter().filter_map(|p| p.values.get(i)).collect())
                .collect(),
            MapperMode::CartesianProduct => self.cartesian(),
        }
    }

    fn cartesian(&self) -> Vec<Vec<&ArgValue>> {
        let total = self.len();
        let mut out = Vec::with_capacity(total);
        if total == 0 {
            return out;
        }

        // Odometer over value indices; last parameter is the fastest digit
        let mut cursor = vec![0usize; self.params.len()];
        loop {
            out.push(
                self.params
                    .iter()
                    .zip(&cursor)
                    .map(|(p, &i)| &p.values[i])
                    .collect(),
            );

            let mut digit = self.params.len();
            loop {
                if digit == 0 {
                    return out;
                }
                digit -= 1;
                cursor[digit] += 1;
                if cursor[digit] < self.params[digit].values.len() {
                    break;
                }
                cursor[digit] = 0;
            }
        }
    }

    /// Rendered invocation argument strings, one per run configuration
    pub fn as_list(&self) -> Vec<String> {
        self.combinations()
            .into_iter()
            .map(|combo| {
                combo
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(ARGUMENT_SEPARATOR)
            })
            .collect()
    }
}
