//! Relay (`com`) wire types.
//!
//! Receive: `GET com?w=<worker>` is held open until a message for that
//! worker arrives, then answered with one JSON object:
//!
//! ```text
//! {"t":["bob","carol"],"f":"Mr. X","r":1700000000000,"a":[1700000000042],"m":"hi"}
//! ```
//!
//! Only `r` and `m` are required. The relay writes a lone newline before
//! the object so the client sees body bytes as soon as the poll is parked.
//!
//! Send: `POST com` with `f=<worker>&t=<recipient>...&m=<text>`.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;
use crate::text::text_or_number;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    #[serde(rename = "r", deserialize_with = "text_or_number")]
    pub recipient: String,
    #[serde(rename = "m")]
    pub body: String,
    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(rename = "t", default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    /// Delivery attempt times (epoch millis) stamped by the relay.
    #[serde(rename = "a", default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<i64>,
}

impl RelayMessage {
    /// Parse a completed poll body. A whitespace-only body is a poll that
    /// expired without traffic and yields `None`.
    pub fn parse_body(body: &[u8]) -> Result<Option<Self>, ProtoError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(body)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: Vec<String>,
    pub body: String,
}

impl OutgoingMessage {
    pub fn new(from: impl Into<String>, to: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to,
            body: body.into(),
        }
    }

    /// Build from a comma-separated recipient list. Blank entries are
    /// dropped, so `""` means no recipients at all.
    pub fn with_recipient_list(
        from: impl Into<String>,
        recipients: &str,
        body: impl Into<String>,
    ) -> Self {
        let to = recipients
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(from, to, body)
    }

    /// `f`, then one `t` per recipient, then `m`.
    pub fn form_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::with_capacity(self.to.len() + 2);
        pairs.push(("f", self.from.as_str()));
        pairs.extend(self.to.iter().map(|t| ("t", t.as_str())));
        pairs.push(("m", self.body.as_str()));
        pairs
    }

    pub fn to_form_body(&self) -> Result<String, ProtoError> {
        Ok(serde_urlencoded::to_string(self.form_pairs())?)
    }
}

/// Answer to `GET com?i=1`: `waiters: <n> messages: <n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub waiters: usize,
    pub messages: usize,
}

impl RelayStats {
    pub fn parse(line: &str) -> Result<Self, ProtoError> {
        let malformed = || ProtoError::MalformedStats(line.trim().to_string());
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["waiters:", w, "messages:", m] => Ok(Self {
                waiters: w.parse().map_err(|_| malformed())?,
                messages: m.parse().map_err(|_| malformed())?,
            }),
            _ => Err(malformed()),
        }
    }
}
