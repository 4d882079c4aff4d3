//! Wire shapes exchanged with the monitoring backend: the REST snapshot and
//! the JSON hub protocol spoken over the push channel.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SNAPSHOT_PATH: &str = "GetDataForUI";

/// Terminates every hub protocol frame.
pub const RECORD_SEPARATOR: char = '\u{1e}';

pub const HUB_PROTOCOL_NAME: &str = "json";
pub const HUB_PROTOCOL_VERSION: u32 = 1;

const MESSAGE_INVOCATION: u8 = 1;
const MESSAGE_PING: u8 = 6;
const MESSAGE_CLOSE: u8 = 7;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotResponse {
    #[serde(rename = "ChanellInfo", alias = "chanellInfo", default)]
    pub chanell_info: Value,
    #[serde(rename = "SatelliteView", alias = "satelliteView", default)]
    pub satellite_view: Value,
    #[serde(rename = "TemperatureInfo", alias = "temperatureInfo", default)]
    pub temperature_info: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HubTarget {
    TemperatureUpdate,
    EmrTemperatureUpdate,
    StartAnimate,
    RobotSay,
    ChannelStatusUpdate,
    ChanellInfoUpdate,
    SatelliteMonitoringUpdate,
    OpticChannelHealthUpdate,
    CardsWhichNeedToBeActivate,
    RegionBitrateUpdate,
}

impl HubTarget {
    pub const ALL: [HubTarget; 10] = [
        HubTarget::TemperatureUpdate,
        HubTarget::EmrTemperatureUpdate,
        HubTarget::StartAnimate,
        HubTarget::RobotSay,
        HubTarget::ChannelStatusUpdate,
        HubTarget::ChanellInfoUpdate,
        HubTarget::SatelliteMonitoringUpdate,
        HubTarget::OpticChannelHealthUpdate,
        HubTarget::CardsWhichNeedToBeActivate,
        HubTarget::RegionBitrateUpdate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemperatureUpdate => "temperatureUpdate",
            Self::EmrTemperatureUpdate => "emrTemperatureUpdate",
            Self::StartAnimate => "StartAnimate",
            Self::RobotSay => "robotsay",
            Self::ChannelStatusUpdate => "channelStatusUpdate",
            Self::ChanellInfoUpdate => "chanellInfoUpdate",
            Self::SatelliteMonitoringUpdate => "satelliteMonitoringUpdate",
            Self::OpticChannelHealthUpdate => "OpticChannelHealthUpdate",
            Self::CardsWhichNeedToBeActivate => "CardsWhichNeedToBeActivate",
            Self::RegionBitrateUpdate => "regionbitrateupdate",
        }
    }

    /// Hub method names match case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|target| target.as_str().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub protocol: String,
    pub version: u32,
}

impl Default for HandshakeRequest {
    fn default() -> Self {
        Self {
            protocol: HUB_PROTOCOL_NAME.to_string(),
            version: HUB_PROTOCOL_VERSION,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation {
        target: String,
        arguments: Vec<Value>,
    },
    Ping,
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// Message types the client does not act on (completions, stream items, ...).
    Other(u8),
}

#[derive(Debug, Deserialize)]
struct RawHubMessage {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "allowReconnect")]
    allow_reconnect: Option<bool>,
}

impl HubMessage {
    pub fn invocation(target: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self::Invocation {
            target: target.into(),
            arguments,
        }
    }

    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        let raw: RawHubMessage = serde_json::from_str(frame)?;
        Ok(match (raw.kind, raw.target) {
            (MESSAGE_INVOCATION, Some(target)) => Self::Invocation {
                target,
                arguments: raw.arguments,
            },
            (MESSAGE_PING, _) => Self::Ping,
            (MESSAGE_CLOSE, _) => Self::Close {
                error: raw.error,
                allow_reconnect: raw.allow_reconnect.unwrap_or(false),
            },
            (kind, _) => Self::Other(kind),
        })
    }

    /// Serializes the message as one record-separated frame.
    pub fn to_frame(&self) -> String {
        let body = match self {
            Self::Invocation { target, arguments } => json!({
                "type": MESSAGE_INVOCATION,
                "target": target,
                "arguments": arguments,
            }),
            Self::Ping => json!({ "type": MESSAGE_PING }),
            Self::Close {
                error,
                allow_reconnect,
            } => {
                let mut body = json!({ "type": MESSAGE_CLOSE, "allowReconnect": allow_reconnect });
                if let Some(error) = error {
                    body["error"] = Value::String(error.clone());
                }
                body
            }
            Self::Other(kind) => json!({ "type": kind }),
        };
        format!("{body}{RECORD_SEPARATOR}")
    }
}

pub fn encode_frame<T: Serialize>(message: &T) -> serde_json::Result<String> {
    Ok(format!("{}{RECORD_SEPARATOR}", serde_json::to_string(message)?))
}

/// Splits one transport message into its protocol frames.
pub fn frames(text: &str) -> impl Iterator<Item = &str> {
    text.split(RECORD_SEPARATOR)
        .filter(|frame| !frame.trim().is_empty())
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
