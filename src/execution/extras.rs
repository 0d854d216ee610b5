//! The safety gate validating `Scenario.extras` / `AdapterConfig.extras`
//! before they ever reach a provider call. Grounded on
//! `original_source/src/salvo/execution/extras.py`.

use serde_json::{Map, Value};
use thiserror::Error;

const BLOCKED_KEYS: &[&str] = &[
    "api_key",
    "api_secret",
    "secret",
    "token",
    "password",
    "authorization",
    "secret_key",
    "access_token",
    "refresh_token",
];

const MAX_EXTRAS_KEYS: usize = 10;
const MAX_EXTRAS_SIZE: usize = 4096;

#[derive(Error, Debug)]
pub enum ExtrasError {
    #[error("extras key '{0}' resembles a secret and is not allowed")]
    BlockedKey(String),

    #[error("extras has {0} keys, exceeding the maximum of {MAX_EXTRAS_KEYS}")]
    TooManyKeys(usize),

    #[error("serialized extras is {0} bytes, exceeding the maximum of {MAX_EXTRAS_SIZE}")]
    TooLarge(usize),
}

/// Rejects extras maps carrying secret-shaped keys, too many keys, or too
/// large a serialized payload. Case-insensitive on key names.
pub fn validate_extras(extras: &Map<String, Value>) -> Result<(), ExtrasError> {
    if extras.len() > MAX_EXTRAS_KEYS {
        return Err(ExtrasError::TooManyKeys(extras.len()));
    }

    for key in extras.keys() {
        let lowered = key.to_lowercase();
        if BLOCKED_KEYS.iter().any(|blocked| lowered == *blocked) {
            return Err(ExtrasError::BlockedKey(key.clone()));
        }
    }

    let serialized_size = serde_json::to_string(extras).map(|s| s.len()).unwrap_or(0);
    if serialized_size > MAX_EXTRAS_SIZE {
        return Err(ExtrasError::TooLarge(serialized_size));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_blocked_key_case_insensitively() {
        let mut extras = Map::new();
        extras.insert("API_KEY".to_string(), json!("sk-whatever"));
        assert!(matches!(
            validate_extras(&extras),
            Err(ExtrasError::BlockedKey(_))
        ));
    }

    #[test]
    fn rejects_too_many_keys() {
        let mut extras = Map::new();
        for i in 0..11 {
            extras.insert(format!("key{i}"), json!(i));
        }
        assert!(matches!(
            validate_extras(&extras),
            Err(ExtrasError::TooManyKeys(11))
        ));
    }

    #[test]
    fn accepts_benign_extras() {
        let mut extras = Map::new();
        extras.insert("top_p".to_string(), json!(0.9));
        assert!(validate_extras(&extras).is_ok());
    }
}
