use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Keys the settings panel knows how to label, in display order.
pub const KNOWN_KEYS: &[(&str, &str)] = &[
    ("ebay_app_id", "Application ID"),
    ("ebay_dev_id", "Developer ID"),
    ("ebay_cert_id", "Certificate ID"),
    ("ebay_auth_token", "Auth Token"),
    ("openai_api_key", "OpenAI API Key"),
    ("use_sandbox", "Sandbox-Modus verwenden"),
    ("auto_mode", "Automatischer Modus"),
];

const FLAG_KEYS: &[&str] = &["use_sandbox", "auto_mode"];
const SECRET_KEYS: &[&str] = &["ebay_cert_id", "ebay_auth_token", "openai_api_key"];

/// Flat key/value bag of credentials and mode flags.
///
/// Values are kept as strings, flags as `"true"`/`"false"`, matching what the
/// backend stores. Keys this client does not know survive a load/save cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, String>);

impl Default for Settings {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        for (key, _) in KNOWN_KEYS {
            values.insert(key.to_string(), String::new());
        }
        values.insert("use_sandbox".to_string(), "true".to_string());
        values.insert("auto_mode".to_string(), "false".to_string());
        Self(values)
    }
}

impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut settings = Settings::default();
        for (key, value) in raw {
            let text = match value {
                Value::Null => String::new(),
                Value::String(s) => s,
                other => other.to_string(),
            };
            settings.0.insert(key, text);
        }
        Ok(settings)
    }
}

impl Settings {
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key) == "true"
    }

    pub fn toggle_flag(&mut self, key: &str) {
        let next = !self.flag(key);
        self.set(key, next.to_string());
    }

    pub fn is_flag(key: &str) -> bool {
        FLAG_KEYS.contains(&key)
    }

    pub fn is_secret(key: &str) -> bool {
        SECRET_KEYS.contains(&key)
    }

    /// Value for display; secrets keep only their last four characters.
    pub fn display_value(&self, key: &str) -> String {
        let value = self.get(key);
        if Self::is_flag(key) {
            return if self.flag(key) { "an" } else { "aus" }.to_string();
        }
        if value.is_empty() || !Self::is_secret(key) {
            return value.to_string();
        }
        let count = value.chars().count();
        if count <= 4 {
            return "•".repeat(count);
        }
        let tail: String = value.chars().skip(count - 4).collect();
        format!("{}{}", "•".repeat(8), tail)
    }

    /// Known keys first, then anything else the backend sent.
    pub fn ordered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = KNOWN_KEYS.iter().map(|(k, _)| k.to_string()).collect();
        keys.extend(
            self.0
                .keys()
                .filter(|k| !KNOWN_KEYS.iter().any(|(known, _)| known == k))
                .cloned(),
        );
        keys
    }

    pub fn label(key: &str) -> &str {
        KNOWN_KEYS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, label)| *label)
            .unwrap_or(key)
    }
}

/// External services the backend can test credentials against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Service {
    Ebay,
    OpenAi,
}

impl Service {
    /// Path segment after `/api/`.
    pub fn endpoint(self) -> &'static str {
        match self {
            Service::Ebay => "test-ebay",
            Service::OpenAi => "test-openai",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Service::Ebay => "eBay",
            Service::OpenAi => "OpenAI",
        }
    }
}

/// Outcome of a connectivity check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectionTest {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl ConnectionTest {
    pub fn failed() -> Self {
        Self {
            success: false,
            message: "Verbindungstest fehlgeschlagen".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_round_trip() {
        let settings: Settings =
            serde_json::from_str(r#"{"ebay_app_id": "abc", "region": "DE", "use_sandbox": false}"#)
                .unwrap();
        assert_eq!(settings.get("ebay_app_id"), "abc");
        assert!(!settings.flag("use_sandbox"));
        let body = serde_json::to_value(&settings).unwrap();
        assert_eq!(body["region"], "DE");
        assert_eq!(body["use_sandbox"], "false");
        assert_eq!(body["auto_mode"], "false");
        assert_eq!(settings.ordered_keys().last().map(String::as_str), Some("region"));
    }

    #[test]
    fn flags_toggle_as_strings() {
        let mut settings = Settings::default();
        assert!(settings.flag("use_sandbox"));
        settings.toggle_flag("use_sandbox");
        assert_eq!(settings.get("use_sandbox"), "false");
    }

    #[test]
    fn secrets_are_masked() {
        let mut settings = Settings::default();
        settings.set("openai_api_key", "sk-1234567890");
        settings.set("ebay_app_id", "visible");
        assert_eq!(settings.display_value("openai_api_key"), "••••••••7890");
        assert_eq!(settings.display_value("ebay_app_id"), "visible");
        assert_eq!(settings.display_value("auto_mode"), "aus");
    }
}
