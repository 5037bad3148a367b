use super::{Config, ConfigError};
use crate::buffer::BufferConfig;

impl Config {
    pub fn validate(&self, buffer: &BufferConfig) -> Result<(), ConfigError> {
        buffer.validate()?;

        // The disk location is only checked for writability once the ring opens it.
        if !self.memory_only && buffer.disk_location.is_relative() {
            return Err(ConfigError::InvalidConfig(format!(
                "Disk location must be an absolute path: {}",
                buffer.disk_location.display()
            )));
        }

        Ok(())
    }
}
