//! Payload mapping definitions: per-connection mapper configuration

use super::conditions::Conditions;
use super::error::ConfigurationError;
use crate::model::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Configuration of one mapper instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MapperDefinition {
    /// Mapper type, resolved by the mapper factory
    pub mapping_engine: String,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default)]
    pub incoming_conditions: BTreeMap<String, String>,
    #[serde(default)]
    pub outgoing_conditions: BTreeMap<String, String>,
}

impl MapperDefinition {
    pub fn new(mapping_engine: impl Into<String>) -> Self {
        Self {
            mapping_engine: mapping_engine.into(),
            options: Map::new(),
            incoming_conditions: BTreeMap::new(),
            outgoing_conditions: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn with_outgoing_condition(mut self, label: impl Into<String>, expr: impl Into<String>) -> Self {
        self.outgoing_conditions.insert(label.into(), expr.into());
        self
    }

    pub fn with_incoming_condition(mut self, label: impl Into<String>, expr: impl Into<String>) -> Self {
        self.incoming_conditions.insert(label.into(), expr.into());
        self
    }
}

/// All mapper definitions of a connection, keyed by mapper id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadMappingDefinition {
    definitions: BTreeMap<String, MapperDefinition>,
}

impl PayloadMappingDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapper(mut self, id: impl Into<String>, definition: MapperDefinition) -> Self {
        self.definitions.insert(id.into(), definition);
        self
    }

    pub fn get(&self, id: &str) -> Option<&MapperDefinition> {
        self.definitions.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MapperDefinition)> {
        self.definitions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Everything a mapper constructor is given.
#[derive(Debug, Clone, Copy)]
pub struct MapperConfig<'a> {
    pub id: &'a str,
    pub definition: &'a MapperDefinition,
    pub connection_id: &'a ConnectionId,
}

impl<'a> MapperConfig<'a> {
    pub fn incoming_conditions(&self) -> Result<Conditions, ConfigurationError> {
        Conditions::parse(self.id, &self.definition.incoming_conditions)
    }

    pub fn outgoing_conditions(&self) -> Result<Conditions, ConfigurationError> {
        Conditions::parse(self.id, &self.definition.outgoing_conditions)
    }

    /// A string option, `None` if absent.
    pub fn option_str(&self, name: &str) -> Result<Option<&'a str>, ConfigurationError> {
        match self.definition.options.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid_option(name, format!("expected a string, got {}", other))),
        }
    }

    /// A positive integer option, `None` if absent.
    pub fn option_positive(&self, name: &str) -> Result<Option<usize>, ConfigurationError> {
        match self.definition.options.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .map(|n| Some(n as usize))
                .ok_or_else(|| self.invalid_option(name, format!("expected a positive integer, got {}", value))),
        }
    }

    pub fn invalid_option(&self, name: &str, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::InvalidOption {
            mapper_id: self.id.to_string(),
            option: name.to_string(),
            reason: reason.into(),
        }
    }
}
