//! Loosely-typed configuration values and runtime-parameter resolution
//!
//! Stage options arrive as `{name, value}` pairs whose values may reference
//! runtime parameters as `${NAME}`. Resolution happens once, before `init`:
//! - a string that is exactly `${NAME}` takes the parameter value, type preserved
//! - `${NAME}` embedded in a longer string is substituted textually
//! - lists and maps resolve recursively

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Runtime parameters keyed by name
pub type RuntimeParameters = BTreeMap<String, ConfigValue>;

/// Tagged-variant configuration value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Accepts booleans and the strings "true"/"false"
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Accepts integers, integral floats and numeric strings
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Resolve `${NAME}` references against `params`
    pub fn resolve(
        &self,
        option: &str,
        params: &RuntimeParameters,
    ) -> Result<ConfigValue, ContractError> {
        match self {
            Self::String(s) => resolve_string(s, option, params),
            Self::List(items) => items
                .iter()
                .map(|item| item.resolve(option, params))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Self::Map(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), v.resolve(option, params)?)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Self::Map),
            other => Ok(other.clone()),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Name of the parameter when `s` is exactly one `${NAME}` reference
fn whole_reference(s: &str) -> Option<&str> {
    let name = s.strip_prefix("${")?.strip_suffix('}')?;
    (!name.is_empty() && !name.contains(['{', '}', '$'])).then_some(name)
}

fn resolve_string(
    s: &str,
    option: &str,
    params: &RuntimeParameters,
) -> Result<ConfigValue, ContractError> {
    if let Some(name) = whole_reference(s) {
        return lookup(name, option, params).cloned();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let name = &rest[start + 2..start + 2 + len];
        out.push_str(&rest[..start]);
        out.push_str(&lookup(name, option, params)?.to_string());
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    Ok(ConfigValue::String(out))
}

fn lookup<'a>(
    name: &str,
    option: &str,
    params: &'a RuntimeParameters,
) -> Result<&'a ConfigValue, ContractError> {
    params
        .get(name)
        .ok_or_else(|| ContractError::UnresolvedParameter {
            name: name.to_string(),
            option: option.to_string(),
        })
}
