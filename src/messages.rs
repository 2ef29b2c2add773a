use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::discovery::SerialPortInfo;
use crate::error::BridgeError;
use crate::pairing::PairReport;

// -------------------- Requests --------------------

/// Device fields shared by `send` and `pair`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub protocol: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub device_id: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub house_code: String,
    #[serde(default = "default_unit", deserialize_with = "unit_code")]
    pub unit_code: u32,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Init { port: Option<String> },
    Send(DeviceRequest),
    Pair(DeviceRequest),
    Close,
    Status,
    ListPorts,
}

impl Request {
    /// Decode one stdin line.
    pub fn parse(line: &str) -> Result<Request, BridgeError> {
        let value: Value = serde_json::from_str(line)?;
        let action = value.get("action").and_then(Value::as_str);
        Ok(match action {
            Some("init") => Request::Init {
                port: value
                    .get("port")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from),
            },
            Some("send") => Request::Send(serde_json::from_value(value)?),
            Some("pair") => Request::Pair(serde_json::from_value(value)?),
            Some("close") => Request::Close,
            Some("status") => Request::Status,
            Some("list_ports") => Request::ListPorts,
            _ => return Err(BridgeError::UnknownAction),
        })
    }
}

fn default_unit() -> u32 {
    1
}

fn empty_if_null<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Accepts 3 or "3". Null, missing, 0, "" and false all mean unit 1.
fn unit_code<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    use serde::de::Error;

    let unit = match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => 0,
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid unit_code: {n}")))?,
        Some(Value::String(s)) if s.trim().is_empty() => 0,
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| D::Error::custom(format!("invalid unit_code: {s}")))?,
        Some(other) => return Err(D::Error::custom(format!("invalid unit_code: {other}"))),
    };
    Ok(if unit == 0 { default_unit() } else { unit })
}

// -------------------- Responses --------------------

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ready {
        port: String,
    },
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<PairReport>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ports: Option<Vec<SerialPortInfo>>,
    },
    #[serde(rename = "ok")]
    Health {
        initialized: bool,
        port: Option<String>,
    },
    Closed,
    Error {
        error: String,
    },
}

impl Response {
    pub fn success() -> Self {
        Response::Success {
            result: None,
            ports: None,
        }
    }

    pub fn paired(report: PairReport) -> Self {
        Response::Success {
            result: Some(report),
            ports: None,
        }
    }

    pub fn error(err: impl std::fmt::Display) -> Self {
        Response::Error {
            error: err.to_string(),
        }
    }

    /// One output line, without the newline.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","error":"{}"}}"#, e.to_string().replace('"', "'"))
        })
    }
}
