use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemStreamInfo {
    pub ip: String,
    pub port: u16,
    pub duration_seconds: f64,
    pub started_at_utc: String,
    pub ended_at_utc: String,
    pub total_packets: u64,
    pub bitrate_kbps: f64,
    pub bitrate_mbps: f64,
    pub programs: Vec<Program>,
}

impl SystemStreamInfo {
    /// Stable identity of a capture, `ip:port`.
    pub fn endpoint_key(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn problematic_programs(&self) -> impl Iterator<Item = &Program> {
        self.programs.iter().filter(|program| program.is_problematic())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default)]
    pub program_id: u32,
    #[serde(default)]
    pub pmt_pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streams: Option<Vec<ElementaryStream>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_streams: Option<Vec<ElementaryStream>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_glitch_status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_video: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_audio: Option<bool>,
    #[serde(default, rename = "isProblematic", skip_serializing_if = "Option::is_none")]
    pub problematic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

impl Program {
    pub fn is_problematic(&self) -> bool {
        self.problematic.unwrap_or(false)
            || self.issues.as_ref().is_some_and(|issues| !issues.is_empty())
    }

    pub fn streams(&self) -> &[ElementaryStream] {
        self.streams.as_deref().unwrap_or_default()
    }

    pub fn missing_streams(&self) -> &[ElementaryStream] {
        self.missing_streams.as_deref().unwrap_or_default()
    }
}

/// One PID inside a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementaryStream {
    #[serde(default)]
    pub pid: u32,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_sample: Option<String>,
    #[serde(default, rename = "lastPTS", skip_serializing_if = "Option::is_none")]
    pub last_pts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuity_errors: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_video: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_audio: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}
