use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(ChannelOrder);
id_newtype!(ChannelId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub order: ChannelOrder,
    pub name: String,
    pub has_error: bool,
    pub disabled: bool,
    pub status: String,
}

/// One entry of the `channelStatusUpdate` id → status map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatusEntry {
    pub id: ChannelId,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteStatus {
    pub degree: String,
    pub details: Vec<SatelliteDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteDetail {
    pub frequency: String,
    pub symbol_rate: String,
    pub polarisation: String,
    pub port_in_250: i64,
    pub mer: Option<String>,
    pub has_error: bool,
    pub has_warning: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRelay {
    pub region_name: String,
    pub relay_infos: Vec<RelayInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayInfo {
    pub frequency_order: String,
    pub mer: String,
    pub has_problem: bool,
    pub is_warning: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub temperature: String,
}

impl TemperatureReading {
    pub fn new(temperature: impl Into<String>) -> Self {
        Self {
            temperature: temperature.into(),
        }
    }

    pub fn celsius(&self) -> Option<f64> {
        self.temperature.trim().parse::<f64>().ok()
    }

    /// Unparseable readings count as 0 °C.
    pub fn is_hot(&self, threshold_celsius: f64) -> bool {
        self.celsius().unwrap_or(0.0) > threshold_celsius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    Disco,
    RobotSpeech,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientBanner {
    pub message: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoAnimation {
    Morning,
    Evening,
    Night,
    Afternoon,
    Birthday,
    CpuOverload,
    RamOverload,
    TemperatureProblem,
    Default,
}

impl DiscoAnimation {
    pub fn from_message(message: &str) -> Self {
        match message {
            "Morning" => Self::Morning,
            "Evening" => Self::Evening,
            "Night" => Self::Night,
            "Afternoon" => Self::Afternoon,
            "birthday" => Self::Birthday,
            "NatiasCpuOverload" => Self::CpuOverload,
            "NatiasRamOverload" => Self::RamOverload,
            "TemperatureProblem" => Self::TemperatureProblem,
            _ => Self::Default,
        }
    }

    pub fn asset_path(self) -> &'static str {
        match self {
            Self::Morning => "assets/gif/morning.gif",
            Self::Evening => "assets/gif/evening.gif",
            Self::Night => "assets/gif/night.gif",
            Self::Afternoon => "assets/gif/afternoon.gif",
            Self::Birthday => "assets/gif/birthday.gif",
            Self::CpuOverload | Self::RamOverload => "assets/gif/cpu.gif",
            Self::TemperatureProblem => "assets/gif/temperature.gif",
            Self::Default => "/animations/default.gif",
        }
    }
}

/// Composite identity of a card activation request. Absent fields compare as
/// null and numbers compare by value, so `1` and `1.0` are the same card.
#[derive(Debug, Clone)]
pub struct CardKey {
    pub card: Value,
    pub port: Value,
    pub emr: Value,
}

fn same_key_part(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64() == right.as_f64(),
        _ => left == right,
    }
}

impl PartialEq for CardKey {
    fn eq(&self, other: &Self) -> bool {
        same_key_part(&self.card, &other.card)
            && same_key_part(&self.port, &other.port)
            && same_key_part(&self.emr, &other.emr)
    }
}

/// Open record: the backend adds fields freely, only the key is fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardActivationInfo {
    pub fields: Map<String, Value>,
}

impl CardActivationInfo {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn key(&self) -> CardKey {
        let field = |name: &str| self.fields.get(name).cloned().unwrap_or(Value::Null);
        CardKey {
            card: field("card"),
            port: field("port"),
            emr: field("emr"),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Shallow merge: fields present in `update` overwrite, the rest are kept.
    pub fn merge_from(&mut self, update: &CardActivationInfo) {
        for (name, value) in &update.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpticChannelProblem {
    pub fields: Map<String, Value>,
}
