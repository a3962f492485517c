use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Fails with the first key of `body` that is not in `allowed`.
pub fn reject_unknown_keys(body: &Value, allowed: &[&str]) -> Result<(), String> {
    let object = body
        .as_object()
        .ok_or_else(|| "expected a JSON object".to_string())?;

    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(format!("field '{key}' cannot be updated")),
        None => Ok(()),
    }
}

/// Distinguishes an omitted field (`None`) from an explicit `null`
/// (`Some(None)`). Pair with `#[serde(default)]`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims and drops empty strings.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
