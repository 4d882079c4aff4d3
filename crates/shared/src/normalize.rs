//! Turns loosely typed backend JSON into domain records.
//!
//! The backend serializes the same entity with either a lowercase-first or an
//! uppercase-first key spelling depending on the endpoint, so every entity
//! declares the key names it accepts. The first present, non-null key wins.
//! Booleans follow JSON truthiness and default to `false`.

use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    domain::{
        CardActivationInfo, ChannelId, ChannelOrder, ChannelStatus, ChannelStatusEntry,
        OpticChannelProblem, RegionRelay, RelayInfo, SatelliteDetail, SatelliteStatus,
        TemperatureReading,
    },
    error::{json_kind, PayloadError},
};

type Result<T> = std::result::Result<T, PayloadError>;

mod keys {
    pub const ORDER: &[&str] = &["order", "Order"];
    pub const CHANNEL_NAME: &[&str] = &["chanellName", "ChanellName", "name", "Name"];
    pub const HAVE_ERROR: &[&str] = &["haveError", "HaveError", "hasError", "HasError"];
    pub const IS_DISABLE: &[&str] = &["isDIsable", "IsDIsable", "disabled", "Disabled"];
    pub const STATUS: &[&str] = &["status", "Status"];

    pub const DEGREE: &[&str] = &["degree", "Degree"];
    pub const DETAILS: &[&str] = &["details", "Details"];
    pub const FREQUENCY: &[&str] = &["frequency", "Frequency"];
    pub const SYMBOL_RATE: &[&str] = &["symbolRate", "SymbolRate"];
    pub const POLARISATION: &[&str] = &["polarisation", "Polarisation"];
    pub const PORT_IN_250: &[&str] = &["portIn250", "PortIn250"];
    pub const MER: &[&str] = &["mer", "Mer"];
    pub const HAVE_WARN: &[&str] = &["haveWarn", "HaveWarn", "hasWarning", "HasWarning"];

    pub const REGION_NAME: &[&str] = &["regionName", "RegionName"];
    pub const RELAY_INFOS: &[&str] = &["relayInfos", "RelayInfos"];
    pub const FREQUENCY_ORDER: &[&str] = &[
        "frequecyOrder",
        "FrequecyOrder",
        "frequencyOrder",
        "FrequencyOrder",
    ];
    pub const HAVE_PROBLEM: &[&str] = &["isHaveProblem", "IsHaveProblem", "hasProblem", "HasProblem"];
    pub const IS_WARNING: &[&str] = &["isWarning", "IsWarning"];

    pub const TEMPERATURE: &[&str] = &["temperature", "Temperature"];

    pub const SENDER: &[&str] = &["sender", "Sender"];
    pub const MESSAGE: &[&str] = &["message", "Message"];
    pub const ROBOT_SAY: &[&str] = &["robotSay", "RobotSay"];

    pub const NAMES: &[&str] = &["names", "Names"];
    pub const OPTIC_PROBLEMS: &[&str] = &[
        "opticChanellsWhichHaveProblem",
        "OpticChanellsWhichHaveProblem",
    ];
    pub const CARDS_TO_ACTIVATE: &[&str] = &[
        "cardsInfoThathNeedToBeActivated",
        "CardsInfoThathNeedToBeActivated",
    ];
}

struct Fields<'a> {
    entity: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn of(entity: &'static str, value: &'a Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self { entity, map }),
            other => Err(PayloadError::NotObject {
                entity,
                found: json_kind(other),
            }),
        }
    }

    fn first(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|key| self.map.get(*key))
            .find(|value| !value.is_null())
    }

    fn text(&self, keys: &[&str]) -> Option<String> {
        self.first(keys).and_then(scalar_text)
    }

    fn text_or_default(&self, keys: &[&str]) -> String {
        self.text(keys).unwrap_or_default()
    }

    fn flag(&self, keys: &[&str]) -> bool {
        self.first(keys).is_some_and(truthy)
    }

    fn integer(&self, field: &'static str, keys: &[&str]) -> Result<Option<i64>> {
        let Some(value) = self.first(keys) else {
            return Ok(None);
        };
        integer_value(value).map(Some).ok_or_else(|| PayloadError::InvalidField {
            entity: self.entity,
            field,
            detail: format!("expected an integer, got {value}"),
        })
    }

    /// Like [`Fields::integer`], but an unreadable value is logged and read as `0`.
    fn integer_or_zero(&self, field: &'static str, keys: &[&str]) -> i64 {
        match self.integer(field, keys) {
            Ok(value) => value.unwrap_or(0),
            Err(err) => {
                warn!(entity = self.entity, field, error = %err, "unreadable integer, using 0");
                0
            }
        }
    }

    fn required_integer(&self, field: &'static str, keys: &[&str]) -> Result<i64> {
        self.integer(field, keys)?.ok_or(PayloadError::MissingField {
            entity: self.entity,
            field,
        })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|n| n.fract() == 0.0 && n.is_finite())
                .map(|n| n as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn list<T>(
    entity: &'static str,
    value: &Value,
    item: impl Fn(&Value) -> Result<T>,
) -> Result<Vec<T>> {
    let Value::Array(items) = value else {
        return Err(PayloadError::NotArray {
            entity,
            found: json_kind(value),
        });
    };
    items
        .iter()
        .enumerate()
        .map(|(index, element)| {
            item(element).map_err(|source| PayloadError::InvalidElement {
                entity,
                index,
                source: Box::new(source),
            })
        })
        .collect()
}

fn object_record(entity: &'static str, value: &Value) -> Result<Map<String, Value>> {
    Fields::of(entity, value).map(|fields| fields.map.clone())
}

pub fn channel_status(value: &Value) -> Result<ChannelStatus> {
    let fields = Fields::of("channel", value)?;
    Ok(ChannelStatus {
        order: ChannelOrder(fields.required_integer("order", keys::ORDER)?),
        name: fields.text_or_default(keys::CHANNEL_NAME),
        has_error: fields.flag(keys::HAVE_ERROR),
        disabled: fields.flag(keys::IS_DISABLE),
        status: fields.text_or_default(keys::STATUS),
    })
}

pub fn channel_statuses(value: &Value) -> Result<Vec<ChannelStatus>> {
    list("channels", value, channel_status)
}

pub fn satellite_detail(value: &Value) -> Result<SatelliteDetail> {
    let fields = Fields::of("satellite detail", value)?;
    Ok(SatelliteDetail {
        frequency: fields.text_or_default(keys::FREQUENCY),
        symbol_rate: fields.text_or_default(keys::SYMBOL_RATE),
        polarisation: fields.text_or_default(keys::POLARISATION),
        port_in_250: fields.integer_or_zero("portIn250", keys::PORT_IN_250),
        mer: fields.text(keys::MER),
        has_error: fields.flag(keys::HAVE_ERROR),
        has_warning: fields.flag(keys::HAVE_WARN),
    })
}

pub fn satellite(value: &Value) -> Result<SatelliteStatus> {
    let fields = Fields::of("satellite", value)?;
    let details = match fields.first(keys::DETAILS) {
        Some(details) => list("satellite details", details, satellite_detail)?,
        None => Vec::new(),
    };
    Ok(SatelliteStatus {
        degree: fields.text_or_default(keys::DEGREE),
        details,
    })
}

pub fn satellites(value: &Value) -> Result<Vec<SatelliteStatus>> {
    list("satellites", value, satellite)
}

pub fn relay_info(value: &Value) -> Result<RelayInfo> {
    let fields = Fields::of("relay info", value)?;
    Ok(RelayInfo {
        frequency_order: fields.text_or_default(keys::FREQUENCY_ORDER),
        mer: fields.text_or_default(keys::MER),
        has_problem: fields.flag(keys::HAVE_PROBLEM),
        is_warning: fields.flag(keys::IS_WARNING),
    })
}

pub fn region_relay(value: &Value) -> Result<RegionRelay> {
    let fields = Fields::of("region relay", value)?;
    let relay_infos = match fields.first(keys::RELAY_INFOS) {
        Some(infos) => list("relay infos", infos, relay_info)?,
        None => Vec::new(),
    };
    Ok(RegionRelay {
        region_name: fields.text_or_default(keys::REGION_NAME),
        relay_infos,
    })
}

pub fn region_relays(value: &Value) -> Result<Vec<RegionRelay>> {
    list("region relays", value, region_relay)
}

/// `null` means "no reading"; a bare scalar is taken as the temperature itself.
pub fn temperature(value: &Value) -> Result<Option<TemperatureReading>> {
    match value {
        Value::Null => Ok(None),
        Value::String(_) | Value::Number(_) => {
            Ok(scalar_text(value).map(TemperatureReading::new))
        }
        other => {
            let fields = Fields::of("temperature", other)?;
            Ok(Some(TemperatureReading::new(
                fields.text_or_default(keys::TEMPERATURE),
            )))
        }
    }
}

/// Disco messages are only valid with both a sender and a message.
pub fn disco_message(value: &Value) -> Result<String> {
    let fields = Fields::of("disco message", value)?;
    if !fields.flag(keys::SENDER) {
        return Err(PayloadError::MissingField {
            entity: "disco message",
            field: "sender",
        });
    }
    fields
        .first(keys::MESSAGE)
        .filter(|message| truthy(message))
        .and_then(scalar_text)
        .ok_or(PayloadError::MissingField {
            entity: "disco message",
            field: "message",
        })
}

pub fn robot_speech(value: &Value) -> Result<String> {
    let speech = match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(_) => {
            let fields = Fields::of("robot speech", value)?;
            fields
                .first(keys::ROBOT_SAY)
                .filter(|speech| truthy(speech))
                .and_then(scalar_text)
        }
        other => {
            return Err(PayloadError::NotObject {
                entity: "robot speech",
                found: json_kind(other),
            })
        }
    };
    speech
        .filter(|text| !text.is_empty())
        .ok_or(PayloadError::MissingField {
            entity: "robot speech",
            field: "robotSay",
        })
}

/// `{names: {"<id>": <status>}}`, returned sorted by id.
pub fn channel_status_map(value: &Value) -> Result<Vec<ChannelStatusEntry>> {
    let fields = Fields::of("channel status", value)?;
    let names = fields.first(keys::NAMES).ok_or(PayloadError::MissingField {
        entity: "channel status",
        field: "names",
    })?;
    let names = Fields::of("channel status names", names)?;
    let mut entries = names
        .map
        .iter()
        .map(|(id, status)| -> Result<ChannelStatusEntry> {
            let id = id.trim().parse::<i64>().map_err(|_| PayloadError::InvalidField {
                entity: "channel status",
                field: "names",
                detail: format!("channel id `{id}` is not an integer"),
            })?;
            Ok(ChannelStatusEntry {
                id: ChannelId(id),
                status: scalar_text(status).unwrap_or_else(|| status.to_string()),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.id);
    Ok(entries)
}

/// A missing or non-array problem list reads as "no problems".
pub fn optic_problems(value: &Value) -> Result<Vec<OpticChannelProblem>> {
    let fields = Fields::of("optic channel health", value)?;
    match fields.first(keys::OPTIC_PROBLEMS) {
        Some(items) if items.is_array() => list("optic channel problems", items, |item| {
            object_record("optic channel problem", item).map(|fields| OpticChannelProblem { fields })
        }),
        _ => Ok(Vec::new()),
    }
}

/// A missing list reads as empty; a present non-array list is rejected.
pub fn card_updates(value: &Value) -> Result<Vec<CardActivationInfo>> {
    let fields = Fields::of("card activation", value)?;
    match fields.first(keys::CARDS_TO_ACTIVATE) {
        Some(items) => list("card activation infos", items, |item| {
            object_record("card activation info", item).map(CardActivationInfo::new)
        }),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
