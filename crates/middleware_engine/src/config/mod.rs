//! Configuration system
//!
//! Buffer sizing for the middleware manager, loadable from TOML or RON.

pub use serde::{Deserialize, Serialize};

/// Largest vertex count addressable by a 16-bit index buffer
pub const MAX_VERTICES_PER_BUFFER: u32 = 65535;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside the range the buffers can work with
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// # Middleware Buffer Configuration
///
/// Initial capacities for every buffer the manager creates. Buffers grow on
/// demand, so these only decide how much is reserved up front; a size that
/// fits a typical frame avoids reallocation during the first frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Bytes reserved per vertex sub-buffer
    pub initial_vertex_bytes: usize,
    /// Bytes reserved per index sub-buffer
    pub initial_index_bytes: usize,
    /// Bytes reserved for the render-info stream
    pub initial_render_info_bytes: usize,
    /// Bytes reserved for the attach-info stream
    pub initial_attach_info_bytes: usize,
    /// Vertices a sub-buffer may hold before writes roll over to the next one
    pub max_vertices_per_buffer: u32,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            initial_vertex_bytes: 64 * 1024,
            initial_index_bytes: 16 * 1024,
            initial_render_info_bytes: 64 * 1024,
            initial_attach_info_bytes: 64 * 1024,
            max_vertices_per_buffer: MAX_VERTICES_PER_BUFFER,
        }
    }
}

impl Config for MiddlewareConfig {}

impl MiddlewareConfig {
    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("initial_vertex_bytes", self.initial_vertex_bytes),
            ("initial_index_bytes", self.initial_index_bytes),
            ("initial_render_info_bytes", self.initial_render_info_bytes),
            ("initial_attach_info_bytes", self.initial_attach_info_bytes),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.max_vertices_per_buffer == 0 || self.max_vertices_per_buffer > MAX_VERTICES_PER_BUFFER {
            return Err(ConfigError::Invalid {
                field: "max_vertices_per_buffer",
                reason: format!(
                    "{} is outside 1..={}",
                    self.max_vertices_per_buffer, MAX_VERTICES_PER_BUFFER
                ),
            });
        }

        Ok(())
    }

    /// Load from file and validate
    pub fn load_validated(path: &str) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}
