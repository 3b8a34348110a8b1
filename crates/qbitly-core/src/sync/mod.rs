// ── Sync engine ──
//
// Polling hubs, the feeds they drive, and the field-level merge shared by
// every incremental endpoint.

pub(crate) mod hub;
mod main_data;
mod peers;

use std::collections::HashMap;
use std::sync::Arc;

use qbitly_api::models::JsonObject;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CoreError;

pub use main_data::MainData;
pub(crate) use main_data::MainDataFeed;
pub use peers::TorrentPeers;
pub(crate) use peers::PeersFeed;

/// Raw fields plus their decoded form.
#[derive(Debug, Default)]
struct Entry<T> {
    raw: JsonObject,
    typed: Arc<T>,
}

/// Merge `fields` into the entry under `key`. With `key_field` set, the key
/// itself is injected under that name, since the wire format keys some
/// entities by a field it does not repeat.
fn merge_entry<T: DeserializeOwned>(
    entries: &mut HashMap<String, Entry<T>>,
    key: String,
    fields: JsonObject,
    key_field: Option<&str>,
) -> Result<(), CoreError> {
    let mut raw = entries
        .remove(&key)
        .map(|entry| entry.raw)
        .unwrap_or_default();
    raw.extend(fields);
    if let Some(field) = key_field {
        raw.entry(field)
            .or_insert_with(|| Value::String(key.clone()));
    }

    let typed = Arc::new(decode(&raw)?);
    entries.insert(key, Entry { raw, typed });
    Ok(())
}

fn typed<T>(entries: &HashMap<String, Entry<T>>) -> HashMap<String, Arc<T>> {
    entries
        .iter()
        .map(|(key, entry)| (key.clone(), Arc::clone(&entry.typed)))
        .collect()
}

fn decode<T: DeserializeOwned>(raw: &JsonObject) -> Result<T, CoreError> {
    serde_json::from_value(Value::Object(raw.clone())).map_err(|e| CoreError::Deserialization {
        message: e.to_string(),
    })
}

