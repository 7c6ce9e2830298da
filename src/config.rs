use std::{fs::read_to_string, str::FromStr};

use anyhow::Result;
use codec::{ExtensionManager, packet::DEFAULT_CAPACITY};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => return Err(format!("unknown log level: {value}")),
        })
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match *self {
            Self::Error => log::Level::Error,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Log {
    ///
    /// log level
    ///
    /// An enum representing the available verbosity levels of the logger.
    ///
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Packet {
    ///
    /// packet capacity
    ///
    /// The largest serialized size of a packet, usually the path MTU minus
    /// the IP, UDP and SRTP overhead.
    ///
    #[serde(default = "Packet::capacity")]
    pub capacity: usize,
}

impl Packet {
    fn capacity() -> usize {
        DEFAULT_CAPACITY
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self {
            capacity: Self::capacity(),
        }
    }
}

/// One `a=extmap` line of the negotiated session.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMapping {
    pub id: u8,
    pub uri: String,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Extensions {
    ///
    /// extmap-allow-mixed
    ///
    /// Allows one-byte and two-byte extension headers in the same session,
    /// which is required for ids above 14 and for values longer than 16
    /// bytes.
    ///
    #[serde(default)]
    pub allow_mixed: bool,
    ///
    /// extension map
    ///
    /// The header extensions negotiated for the session, by id and URI.
    ///
    #[serde(default)]
    pub map: Vec<ExtensionMapping>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub packet: Packet,
    #[serde(default)]
    pub extensions: Extensions,
}

impl Config {
    ///
    /// Load configure from a json5 file.
    ///
    pub fn load(path: &str) -> Result<Self> {
        Ok(serde_json5::from_str::<Self>(&read_to_string(path)?)?)
    }

    ///
    /// Build the extension manager of the session from the extension map.
    ///
    /// Unknown URIs are skipped, an extension the sender does not implement
    /// is simply never written.
    ///
    pub fn extension_manager(&self) -> Result<ExtensionManager> {
        let mut manager = ExtensionManager::new(self.extensions.allow_mixed);

        for mapping in &self.extensions.map {
            match manager.register_by_uri(&mapping.uri, mapping.id) {
                Err(codec::Error::UnknownUri) => {
                    log::warn!("unsupported header extension: id={}, uri={}", mapping.id, mapping.uri);
                }
                Err(e) => {
                    return Err(anyhow::anyhow!(
                        "invalid header extension: id={}, uri={}, error={}",
                        mapping.id,
                        mapping.uri,
                        e
                    ));
                }
                Ok(_) => {
                    log::info!("header extension registered: id={}, uri={}", mapping.id, mapping.uri);
                }
            }
        }

        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use codec::ExtensionType;

    #[test]
    fn defaults() {
        let config = serde_json5::from_str::<Config>("{}").unwrap();

        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.packet.capacity, 1500);
        assert!(!config.extensions.allow_mixed);
        assert!(config.extensions.map.is_empty());
    }

    #[test]
    fn extension_map() {
        let config = serde_json5::from_str::<Config>(
            r#"{
                log: { level: "debug" },
                packet: { capacity: 1200 },
                extensions: {
                    "allow-mixed": true,
                    map: [
                        { id: 4, uri: "http://www.webrtc.org/experiments/rtp-hdrext/video-timing" },
                        { id: 20, uri: "urn:ietf:params:rtp-hdrext:sdes:mid" },
                        { id: 9, uri: "urn:example:unsupported" },
                    ],
                },
            }"#,
        )
        .unwrap();

        assert_eq!(config.log.level.as_level(), log::Level::Debug);
        assert_eq!(config.packet.capacity, 1200);

        let manager = config.extension_manager().unwrap();
        assert!(manager.extmap_allow_mixed());
        assert_eq!(manager.id(ExtensionType::VideoTiming), Some(4));
        assert_eq!(manager.id(ExtensionType::Mid), Some(20));
        assert_eq!(manager.kind(9), None);
    }

    #[test]
    fn conflicting_extension_map() {
        let config = serde_json5::from_str::<Config>(
            r#"{
                extensions: {
                    map: [
                        { id: 4, uri: "http://www.webrtc.org/experiments/rtp-hdrext/video-timing" },
                        { id: 4, uri: "urn:ietf:params:rtp-hdrext:sdes:mid" },
                    ],
                },
            }"#,
        )
        .unwrap();

        assert!(config.extension_manager().is_err());
    }

    #[test]
    fn log_level_from_str() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
