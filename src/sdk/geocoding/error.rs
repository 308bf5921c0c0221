use serde::Deserialize;
use thiserror::Error;

// OpenCage wraps every reply, errors included, in a `status` object.
#[derive(Deserialize, Debug)]
pub struct OpenCageStatus {
    pub code: u32,
    pub message: String,
}
#[derive(Deserialize, Debug)]
pub struct OpenCageStatusPayload {
    pub status: OpenCageStatus,
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("API Error (Code {code}): {message}")]
    Api { code: u32, message: String },

    // Non-2xx whose body isn't OpenCage's status envelope
    #[error("Unstructured API Error (HTTP {status}): {body}")]
    RawApi { status: u16, body: String },

    #[error("Underlying request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No geocoding API key configured")]
    MissingApiKey,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}
