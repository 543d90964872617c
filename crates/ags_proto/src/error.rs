#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Form encoding error: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),
    #[error("Invalid time value: {0:?}")]
    InvalidTime(String),
    #[error("Malformed relay stats line: {0:?}")]
    MalformedStats(String),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}
