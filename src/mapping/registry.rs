//! Mapper factory and per-connection mapper registry
//!
//! The factory maps a mapping-engine name to a constructor. Built-in engines
//! are registered up front; callers may register their own. The registry is
//! built once per connection configuration and is read-only afterwards.

use super::builtin::{
    ProtocolMapper, RawPayloadMapper, SplitArrayMapper, PROTOCOL_ENGINE, RAW_PAYLOAD_ENGINE,
    SPLIT_ARRAY_ENGINE,
};
use super::definition::{MapperConfig, PayloadMappingDefinition};
use super::error::ConfigurationError;
use super::traits::MessageMapper;
use crate::model::{ConnectionId, PayloadMapping};
use std::collections::HashMap;
use std::sync::Arc;

/// Id of the mapper applied when a payload mapping is empty.
pub const DEFAULT_MAPPER_ID: &str = "default";

/// Builds a mapper from its configuration.
pub type MapperConstructor = Arc<
    dyn Fn(&MapperConfig<'_>) -> Result<Arc<dyn MessageMapper>, ConfigurationError> + Send + Sync,
>;

/// Resolves mapping-engine names to mapper constructors.
#[derive(Clone)]
pub struct MessageMapperFactory {
    constructors: HashMap<String, MapperConstructor>,
}

impl MessageMapperFactory {
    /// A factory with no engines registered.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A factory with the built-in engines registered.
    pub fn with_builtins() -> Self {
        let mut constructors: HashMap<String, MapperConstructor> = HashMap::new();
        constructors.insert(PROTOCOL_ENGINE.to_string(), Arc::new(protocol_mapper));
        constructors.insert(RAW_PAYLOAD_ENGINE.to_string(), Arc::new(raw_payload_mapper));
        constructors.insert(SPLIT_ARRAY_ENGINE.to_string(), Arc::new(split_array_mapper));
        Self { constructors }
    }

    /// Register an engine. Names are unique.
    pub fn register<F>(&mut self, engine: impl Into<String>, constructor: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&MapperConfig<'_>) -> Result<Arc<dyn MessageMapper>, ConfigurationError>
            + Send
            + Sync
            + 'static,
    {
        let engine = engine.into();
        if self.constructors.contains_key(&engine) {
            return Err(ConfigurationError::DuplicateMapperType(engine));
        }
        self.constructors.insert(engine, Arc::new(constructor));
        Ok(())
    }

    /// Registered engine names, sorted.
    pub fn engines(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build one mapper.
    pub fn mapper_of(&self, config: &MapperConfig<'_>) -> Result<Arc<dyn MessageMapper>, ConfigurationError> {
        let engine = &config.definition.mapping_engine;
        let constructor = self.constructors.get(engine).ok_or_else(|| {
            ConfigurationError::UnknownMapperType {
                mapper_id: config.id.to_string(),
                engine: engine.clone(),
            }
        })?;
        constructor(config)
    }

    /// Build every mapper in `definition` into a registry.
    ///
    /// The id `default` names the built-in protocol mapper unless the
    /// definition configures a mapper under that id.
    pub fn registry_of(
        &self,
        connection_id: &ConnectionId,
        definition: &PayloadMappingDefinition,
    ) -> Result<MessageMapperRegistry, ConfigurationError> {
        let mut mappers = HashMap::with_capacity(definition.len() + 1);
        for (id, mapper_definition) in definition.iter() {
            let config = MapperConfig {
                id,
                definition: mapper_definition,
                connection_id,
            };
            mappers.insert(id.to_string(), self.mapper_of(&config)?);
        }

        let default_mapper = mappers
            .entry(DEFAULT_MAPPER_ID.to_string())
            .or_insert_with(|| Arc::new(ProtocolMapper::new(DEFAULT_MAPPER_ID)) as Arc<dyn MessageMapper>)
            .clone();

        Ok(MessageMapperRegistry {
            default_mapper,
            mappers,
        })
    }
}

fn protocol_mapper(config: &MapperConfig<'_>) -> Result<Arc<dyn MessageMapper>, ConfigurationError> {
    Ok(Arc::new(ProtocolMapper::from_config(config)?))
}

fn raw_payload_mapper(config: &MapperConfig<'_>) -> Result<Arc<dyn MessageMapper>, ConfigurationError> {
    Ok(Arc::new(RawPayloadMapper::from_config(config)?))
}

fn split_array_mapper(config: &MapperConfig<'_>) -> Result<Arc<dyn MessageMapper>, ConfigurationError> {
    Ok(Arc::new(SplitArrayMapper::from_config(config)?))
}

impl Default for MessageMapperFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for MessageMapperFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageMapperFactory")
            .field("engines", &self.engines())
            .finish()
    }
}

/// The mappers configured for one connection, by id.
#[derive(Clone)]
pub struct MessageMapperRegistry {
    default_mapper: Arc<dyn MessageMapper>,
    mappers: HashMap<String, Arc<dyn MessageMapper>>,
}

impl MessageMapperRegistry {
    pub fn default_mapper(&self) -> &Arc<dyn MessageMapper> {
        &self.default_mapper
    }

    pub fn mapper(&self, id: &str) -> Option<&Arc<dyn MessageMapper>> {
        self.mappers.get(id)
    }

    /// Resolve a payload mapping to its mapper chain, in order.
    ///
    /// An empty mapping resolves to the default mapper. Any unknown id fails
    /// the whole resolution.
    pub fn mappers_for(&self, mapping: &PayloadMapping) -> Result<Vec<Arc<dyn MessageMapper>>, ConfigurationError> {
        if mapping.is_empty() {
            return Ok(vec![self.default_mapper.clone()]);
        }
        mapping
            .mapper_ids()
            .iter()
            .map(|id| {
                self.mappers
                    .get(id)
                    .cloned()
                    .ok_or_else(|| ConfigurationError::UnknownMapperId(id.clone()))
            })
            .collect()
    }

    /// Registered mapper ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.mappers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

impl std::fmt::Debug for MessageMapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageMapperRegistry")
            .field("default_mapper", &self.default_mapper.id())
            .field("mappers", &self.ids())
            .finish()
    }
}
