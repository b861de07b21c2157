//! Serde helpers for backend payloads.

use serde::{Deserialize, Deserializer};

/// Reads a JSON `null` as the type's default value.
///
/// Pair with `#[serde(default)]` so a missing field is accepted as well.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
