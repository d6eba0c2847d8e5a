//! JSON schema definitions for bundle validation.

/// JSON Schema for info.json.
pub const INFO_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "$id": "https://diagpack.dev/schemas/info.json",
  "title": "Diagpack Bundle Info",
  "type": "object",
  "required": [
    "os_ver", "api_level", "device", "abi_list", "os_arch64", "prebuilt",
    "app_id", "app_ver_name", "app_ver_code", "app_arch64",
    "module_ver_name", "module_ver_code", "module_settings"
  ],
  "additionalProperties": false,
  "properties": {
    "os_ver": { "type": "string" },
    "api_level": { "type": "integer", "minimum": 0 },
    "device": { "type": "string" },
    "abi_list": { "type": "string" },
    "os_arch64": { "type": "boolean" },
    "prebuilt": { "type": "boolean" },
    "app_id": { "type": "string" },
    "app_ver_name": { "type": "string" },
    "app_ver_code": { "type": "integer" },
    "app_arch64": { "type": "boolean" },
    "module_ver_name": { "type": "string" },
    "module_ver_code": { "type": "integer", "minimum": 0 },
    "module_settings": {
      "type": "object",
      "additionalProperties": {
        "type": ["string", "number", "boolean", "array", "object", "null"]
      }
    }
  }
}"#;

/// Get the info schema as a parsed JSON value.
pub fn info_schema() -> serde_json::Value {
    serde_json::from_str(INFO_SCHEMA).expect("Invalid info schema")
}
