//! YAML connection configuration
//!
//! ```yaml
//! connection:
//!   id: my-connection
//!   type: amqp-091
//! mapping:
//!   parallelism: 2
//!   definitions:
//!     m1:
//!       mapping-engine: raw-payload
//!       options: { content-type: text/plain }
//! targets:
//!   - address: topic/a
//!     payload-mapping: [m1]
//! ```

use crate::mapping::placeholders::resolve_connection_id;
use crate::mapping::{
    ConfigurationError, MessageMapperFactory, PayloadMappingDefinition, DEFAULT_MAPPER_ID,
};
use crate::model::{AcknowledgementLabel, ConnectionId, ConnectionType, Target};
use crate::outbound::OutboundMappingProcessor;
use crate::protocol::ProtocolAdapter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub id: ConnectionId,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
}

fn default_parallelism() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MappingConfig {
    /// Target groups mapped at once; 1 maps groups sequentially
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub definitions: PayloadMappingDefinition,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            definitions: PayloadMappingDefinition::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl ConnectivityConfig {
    /// Parse and validate.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigurationError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks that do not need the mapper factory: parallelism, mapper ids
    /// referenced by targets, and issued acknowledgement labels.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.mapping.parallelism == 0 {
            return Err(ConfigurationError::Invalid(
                "mapping.parallelism must be at least 1".to_string(),
            ));
        }

        for target in &self.targets {
            if let Some(unknown) = target
                .payload_mapping
                .mapper_ids()
                .iter()
                .find(|id| id.as_str() != DEFAULT_MAPPER_ID && self.mapping.definitions.get(id).is_none())
            {
                return Err(ConfigurationError::UnknownMapperId(unknown.clone()));
            }

            if let Some(template) = &target.issued_acknowledgement_label {
                let valid = resolve_connection_id(&self.connection.id, template)
                    .map(|label| AcknowledgementLabel::parse(label).is_ok())
                    .unwrap_or(false);
                if !valid {
                    return Err(ConfigurationError::Invalid(format!(
                        "target '{}' issues invalid acknowledgement label '{}'",
                        target.address, template
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the connection's processor.
    pub fn processor(
        &self,
        factory: &MessageMapperFactory,
        adapter: Arc<dyn ProtocolAdapter>,
    ) -> Result<OutboundMappingProcessor, ConfigurationError> {
        Ok(OutboundMappingProcessor::new(
            self.connection.id.clone(),
            self.connection.connection_type,
            &self.mapping.definitions,
            factory,
            adapter,
        )?
        .with_parallelism(self.mapping.parallelism))
    }
}
