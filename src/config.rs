use log::warn;
use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<MessageConfig> = OnceLock::new();

/// Defaults applied to newly created messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub default_protocol: String,
    pub default_protocol_version: String,

    /// zlib/gzip level used by [`HttpResponse::optimize_data`](crate::HttpResponse::optimize_data).
    /// A negative value disables compression.
    pub compression_level: i32,

    /// Content types eligible for compression. An entry ending in `/`
    /// matches every subtype (`text/` covers `text/html`, `text/css`, ...).
    pub compressible_types: Vec<String>,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            default_protocol: "http".to_string(),
            default_protocol_version: "1.0".to_string(),

            compression_level: 1,
            compressible_types: [
                "text/",
                "application/json",
                "application/javascript",
                "image/x-icon",
                "image/vnd.microsoft.icon",
                "image/svg+xml",
            ]
            .iter()
            .map(|t| t.to_string())
            .collect(),
        }
    }
}

impl MessageConfig {
    pub fn from_file(path: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Fail to read {}: {err}, falling back to default config", path);
                return MessageConfig::default();
            }
        };

        match toml::from_str::<MessageConfig>(content.as_str()) {
            Ok(config) => config,
            Err(err) => {
                warn!("Fail to deserialize config file {}: {err}, falling back to default config", path);
                MessageConfig::default()
            }
        }
    }

    /// Whether a bare media type (no parameters, lower-cased) may be compressed.
    pub fn is_compressible(&self, media_type: &str) -> bool {
        self.compressible_types.iter().any(|t| {
            if t.ends_with('/') {
                media_type.starts_with(t.as_str())
            } else {
                media_type == t
            }
        })
    }
}

/// Installs the process-wide config. Returns the rejected value if a
/// config was already installed (or lazily initialized by [`config`]).
pub fn set_config(cfg: MessageConfig) -> Result<(), MessageConfig> {
    CONFIG.set(cfg)
}

pub fn config() -> &'static MessageConfig {
    CONFIG.get_or_init(MessageConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join("rustynet-message-partial.toml");
        std::fs::write(&path, "compression_level = 6\n").unwrap();

        let cfg = MessageConfig::from_file(path.to_str().unwrap());
        assert_eq!(cfg.compression_level, 6);
        assert_eq!(cfg.default_protocol, "http");
        assert!(cfg.is_compressible("text/css"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_falls_back() {
        let cfg = MessageConfig::from_file("/nonexistent/rustynet-message.toml");
        assert_eq!(cfg.default_protocol_version, "1.0");
    }

    #[test]
    fn compressible_prefixes() {
        let cfg = MessageConfig::default();
        assert!(cfg.is_compressible("text/plain"));
        assert!(cfg.is_compressible("image/svg+xml"));
        assert!(!cfg.is_compressible("image/png"));
        assert!(!cfg.is_compressible("application/octet-stream"));
    }
}
