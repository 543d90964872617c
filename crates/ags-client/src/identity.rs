use rand::Rng;
use std::fmt;

use crate::error::RelayError;

pub const DEFAULT_WORKER_PREFIX: &str = "tofer17";

/// Client-chosen name the relay routes messages by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerId(String);

impl WorkerId {
    /// The relay answers an empty worker with 422, so refuse it up front.
    pub fn new(id: impl Into<String>) -> Result<Self, RelayError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RelayError::EmptyWorkerId);
        }
        Ok(Self(id))
    }

    /// `<prefix>-<n>` with `n` drawn from `0..=100`.
    pub fn generate(prefix: &str) -> Self {
        let n: u8 = rand::thread_rng().gen_range(0..=100);
        Self(format!("{prefix}-{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
