//! Time-based escrow (`tbe`) wire types.
//!
//! | request             | response                       |
//! |---------------------|--------------------------------|
//! | `GET tbe`           | `{"m":..,"t":..,"s":..,"k":..}` |
//! | `POST tbe` `t`,`o`  | `{"iv":..,"ct":..}`            |
//! | `GET tbe?t=<time>`  | `{"k":..}` or `{"error":..}`   |

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtoError;
use crate::text::text_or_number;

/// A timestamp signed by the escrow service, with the key to check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTimestampRecord {
    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Epoch millis exactly as the service wrote them.
    #[serde(rename = "t", deserialize_with = "text_or_number")]
    pub time: String,
    /// Base64 RSASSA-PKCS1-v1_5 signature.
    #[serde(rename = "s")]
    pub signature: String,
    /// Base64 SPKI DER public key.
    #[serde(rename = "k")]
    pub public_key: String,
}

impl SignedTimestampRecord {
    pub fn parse(raw: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// UTF-8 of `"<t>:<m>"`, or of `"<t>"` alone when the service sent no
    /// mode tag. Must match the service byte for byte.
    pub fn signed_bytes(&self) -> Vec<u8> {
        match &self.mode {
            Some(mode) => format!("{}:{}", self.time, mode).into_bytes(),
            None => self.time.clone().into_bytes(),
        }
    }

    pub fn time_millis(&self) -> Result<i64, ProtoError> {
        parse_millis(&self.time)
    }

    pub fn issued_at(&self) -> Result<DateTime<Utc>, ProtoError> {
        let millis = self.time_millis()?;
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| ProtoError::InvalidTime(self.time.clone()))
    }
}

pub fn parse_millis(text: &str) -> Result<i64, ProtoError> {
    text.trim()
        .parse()
        .map_err(|_| ProtoError::InvalidTime(text.to_string()))
}

/// Ask the service to seal `data` until `time` (epoch millis).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRequest {
    pub time: i64,
    pub data: String,
}

impl EscrowRequest {
    pub fn new(time: i64, data: impl Into<String>) -> Self {
        Self {
            time,
            data: data.into(),
        }
    }

    pub fn to_form_body(&self) -> Result<String, ProtoError> {
        let time = self.time.to_string();
        Ok(serde_urlencoded::to_string([
            ("t", time.as_str()),
            ("o", self.data.as_str()),
        ])?)
    }
}

/// Query string for the key request: `t=<time>`.
pub fn key_query(time: i64) -> Result<String, ProtoError> {
    Ok(serde_urlencoded::to_string([("t", time.to_string())])?)
}

/// Escrow response, kept as the service sent it. `iv` and `ct` are what
/// decryption needs; anything else rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EscrowBlob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ct: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EscrowBlob {
    pub fn parse(raw: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn iv(&self) -> Result<&str, ProtoError> {
        self.iv.as_deref().ok_or(ProtoError::MissingField("iv"))
    }

    pub fn ct(&self) -> Result<&str, ProtoError> {
        self.ct.as_deref().ok_or(ProtoError::MissingField("ct"))
    }

    /// Record `time` as the blob's `t` unless the service already echoed
    /// one, so the blob alone is enough to ask for its key later.
    pub fn stamp_time(&mut self, time: i64) {
        self.extra
            .entry("t")
            .or_insert_with(|| Value::from(time));
    }

    /// Target time, when the service echoes it back as `t`.
    pub fn time(&self) -> Option<i64> {
        match self.extra.get("t")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => parse_millis(s).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyResponse {
    /// Base64 raw AES key.
    Key(String),
    /// The service declined; carries its error value verbatim.
    Refused(Value),
}

impl KeyResponse {
    pub fn parse(raw: &str) -> Result<Self, ProtoError> {
        let value: Value = serde_json::from_str(raw)?;
        if let Some(err) = value.get("error").or_else(|| value.get("e")) {
            return Ok(Self::Refused(err.clone()));
        }
        value
            .get("k")
            .and_then(Value::as_str)
            .map(|k| Self::Key(k.to_string()))
            .ok_or(ProtoError::MissingField("k"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_bytes_join_time_and_mode() {
        let rec = SignedTimestampRecord::parse(
            r#"{"m":"live","t":"1700000000000","s":"c2ln","k":"a2V5"}"#,
        )
        .unwrap();
        assert_eq!(rec.signed_bytes(), b"1700000000000:live");
        assert_eq!(rec.time_millis().unwrap(), 1_700_000_000_000);
        assert_eq!(
            rec.issued_at().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }

    #[test]
    fn numeric_time_without_mode_signs_time_only() {
        let rec = SignedTimestampRecord::parse(r#"{"t":1700000000000,"s":"c2ln","k":"a2V5"}"#)
            .unwrap();
        assert_eq!(rec.time, "1700000000000");
        assert_eq!(rec.signed_bytes(), b"1700000000000");
    }

    #[test]
    fn non_numeric_time_is_reported() {
        let rec = SignedTimestampRecord::parse(r#"{"m":"x","t":"soon","s":"","k":""}"#).unwrap();
        assert!(matches!(rec.time_millis(), Err(ProtoError::InvalidTime(_))));
        // still signable: the bytes are whatever the service sent
        assert_eq!(rec.signed_bytes(), b"soon:x");
    }

    #[test]
    fn escrow_request_form() {
        let req = EscrowRequest::new(1700000000000, "hello world");
        assert_eq!(req.to_form_body().unwrap(), "t=1700000000000&o=hello+world");
        assert_eq!(key_query(42).unwrap(), "t=42");
    }

    #[test]
    fn blob_keeps_unknown_fields() {
        let blob = EscrowBlob::parse(r#"{"iv":"aXY=","ct":"Y3Q=","t":1700000000000,"x":1}"#)
            .unwrap();
        assert_eq!(blob.iv().unwrap(), "aXY=");
        assert_eq!(blob.time(), Some(1700000000000));
        assert_eq!(blob.extra.get("x"), Some(&Value::from(1)));
    }

    #[test]
    fn stamped_time_survives_printing_and_reparsing() {
        let mut blob = EscrowBlob::parse(r#"{"iv":"aXY=","ct":"Y3Q="}"#).unwrap();
        assert_eq!(blob.time(), None);
        blob.stamp_time(1_700_000_060_000);

        let printed = serde_json::to_string(&blob).unwrap();
        let reparsed = EscrowBlob::parse(&printed).unwrap();
        assert_eq!(reparsed.time(), Some(1_700_000_060_000));
        assert_eq!(reparsed.iv().unwrap(), "aXY=");
    }

    #[test]
    fn stamping_keeps_an_echoed_time() {
        let mut blob = EscrowBlob::parse(r#"{"iv":"aXY=","ct":"Y3Q=","t":"42"}"#).unwrap();
        blob.stamp_time(7);
        assert_eq!(blob.time(), Some(42));
    }

    #[test]
    fn blob_without_iv_reports_missing_field() {
        let blob = EscrowBlob::parse(r#"{"c":"abc"}"#).unwrap();
        assert!(matches!(blob.iv(), Err(ProtoError::MissingField("iv"))));
        assert!(matches!(blob.ct(), Err(ProtoError::MissingField("ct"))));
        assert_eq!(blob.time(), None);
    }

    #[test]
    fn key_response_variants() {
        assert_eq!(
            KeyResponse::parse(r#"{"k":"AAAA"}"#).unwrap(),
            KeyResponse::Key("AAAA".into())
        );
        assert_eq!(
            KeyResponse::parse(r#"{"error":-1}"#).unwrap(),
            KeyResponse::Refused(Value::from(-1))
        );
        assert_eq!(
            KeyResponse::parse(r#"{"e":"error"}"#).unwrap(),
            KeyResponse::Refused(Value::from("error"))
        );
        assert!(matches!(
            KeyResponse::parse("{}"),
            Err(ProtoError::MissingField("k"))
        ));
    }
}
