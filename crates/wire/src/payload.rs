//! Envelope unwrapping and wire atoms shared by every adapter.

use crate::{WireError, WireResult};
use campus_types::UserKey;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Parses raw response text and strips any result envelope around the payload.
pub(crate) fn open(json_text: &str) -> WireResult<Value> {
    let value: Value = serde_json::from_str(json_text)?;
    unwrap_payload(value)
}

/// Strips `{ success, message, data }` envelopes and bare `{ data }` wrappers.
///
/// A `success: false` envelope becomes [`WireError::Rejected`] carrying the server message.
/// When `success` is present without `data`, the remaining fields are the payload. A flat
/// `message` is kept there: it cannot be told apart from a record's own message body.
pub(crate) fn unwrap_payload(value: Value) -> WireResult<Value> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    let success = map.get("success").and_then(Value::as_bool);
    if success == Some(false) {
        let message = map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request was not successful")
            .to_string();
        return Err(WireError::Rejected { message });
    }

    if let Some(inner) = map.remove("data") {
        return unwrap_payload(inner);
    }

    if success.is_some() {
        map.remove("success");
    }

    Ok(Value::Object(map))
}

/// Deserialises a payload into a wire struct, reporting the failing field path.
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> WireResult<T> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(WireError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}

/// Takes the value of the first key present in `keys`.
pub(crate) fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| map.remove(*key))
}

/// Identifier that may be sent as a JSON string or number.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    pub(crate) fn into_string(self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }

    /// Converts to a string, treating blank text as absent.
    pub(crate) fn into_non_blank(self) -> Option<String> {
        Some(self.into_string()).filter(|s| !s.is_empty())
    }

    pub(crate) fn into_user_key(self, field: &str) -> WireResult<UserKey> {
        let raw = self.into_string();
        UserKey::new(&raw)
            .map_err(|e| WireError::InvalidInput(format!("invalid {field} '{raw}': {e}")))
    }
}

/// A user profile embedded in a payload.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireProfile {
    #[serde(alias = "id", alias = "userId", alias = "user_id")]
    pub ci: WireId,
    #[serde(default, alias = "fullName", alias = "full_name")]
    pub name: Option<String>,
    #[serde(default, alias = "pictureUrl", alias = "picture_url", alias = "avatar")]
    pub picture: Option<String>,
}

/// Returns `None` for blank strings.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
