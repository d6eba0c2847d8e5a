//! The info.json record: device, application and build facts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys of info.json, in serialization order.
pub const INFO_KEYS: [&str; 13] = [
    "os_ver",
    "api_level",
    "device",
    "abi_list",
    "os_arch64",
    "prebuilt",
    "app_id",
    "app_ver_name",
    "app_ver_code",
    "app_arch64",
    "module_ver_name",
    "module_ver_code",
    "module_settings",
];

/// The info.json file. Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Operating system release string.
    pub os_ver: String,
    /// Platform API level.
    pub api_level: u32,
    /// `"<manufacturer> <model>"`.
    pub device: String,
    /// Supported ABIs, comma-joined, most preferred first.
    pub abi_list: String,
    /// Whether the device supports any 64-bit ABI.
    pub os_arch64: bool,
    /// Whether the host build carries the expected release signature.
    pub prebuilt: bool,
    /// Application package id.
    pub app_id: String,
    pub app_ver_name: String,
    pub app_ver_code: i64,
    /// Whether the application runs with 64-bit native libraries.
    pub app_arch64: bool,
    pub module_ver_name: String,
    pub module_ver_code: u32,
    /// Flattened settings snapshot taken at export time.
    pub module_settings: Map<String, Value>,
}

impl MetadataRecord {
    /// Serialize as pretty-printed JSON with a 2-space indent.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Live settings as key → value pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsSnapshot(Map<String, Value>);

impl SettingsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a setting value, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Build a snapshot from a JSON document. Only objects are accepted.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten nested groups into dotted keys.
    ///
    /// `{"player": {"speed": 2}}` becomes `{"player.speed": 2}`. Scalars and
    /// arrays are kept as they are; an empty group is kept as `{}`.
    pub fn flatten(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in &self.0 {
            flatten_into(&mut out, key.clone(), value);
        }
        out
    }
}

fn flatten_into(out: &mut Map<String, Value>, key: String, value: &Value) {
    match value {
        Value::Object(group) if !group.is_empty() => {
            for (child, child_value) in group {
                flatten_into(out, format!("{}.{}", key, child), child_value);
            }
        }
        other => {
            out.insert(key, other.clone());
        }
    }
}

impl FromIterator<(String, Value)> for SettingsSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
