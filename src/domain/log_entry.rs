use crate::domain::money::percentage_of;
use crate::domain::timefmt::parse_timestamp;
use crate::domain::wire;
use chrono::{Duration, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the bot did. Unknown actions keep their wire name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "wire::WireText", into = "String")]
pub enum LogAction {
    Received,
    AiAnalyzed,
    ResponseSent,
    ManualOverride,
    Error,
    SystemStarted,
    AutoAccept,
    AutoDecline,
    AutoCounter,
    Other(String),
}

impl LogAction {
    pub fn as_str(&self) -> &str {
        match self {
            LogAction::Received => "received",
            LogAction::AiAnalyzed => "ai_analyzed",
            LogAction::ResponseSent => "response_sent",
            LogAction::ManualOverride => "manual_override",
            LogAction::Error => "error",
            LogAction::SystemStarted => "system_started",
            LogAction::AutoAccept => "auto_accept",
            LogAction::AutoDecline => "auto_decline",
            LogAction::AutoCounter => "auto_counter",
            LogAction::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            LogAction::Received => "Empfangen",
            LogAction::AiAnalyzed => "KI-Analyse",
            LogAction::ResponseSent => "Antwort gesendet",
            LogAction::ManualOverride => "Manuell übersteuert",
            LogAction::Error => "Fehler",
            LogAction::SystemStarted => "System gestartet",
            LogAction::AutoAccept => "Auto-Akzeptiert",
            LogAction::AutoDecline => "Auto-Abgelehnt",
            LogAction::AutoCounter => "Auto-Gegenangebot",
            LogAction::Other(raw) => raw,
        }
    }
}

impl Default for LogAction {
    fn default() -> Self {
        LogAction::Other(String::new())
    }
}

impl From<wire::WireText> for LogAction {
    fn from(text: wire::WireText) -> Self {
        LogAction::from(text.0)
    }
}

impl From<String> for LogAction {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "" => LogAction::default(),
            "received" => LogAction::Received,
            "ai_analyzed" => LogAction::AiAnalyzed,
            "response_sent" => LogAction::ResponseSent,
            "manual_override" => LogAction::ManualOverride,
            "error" => LogAction::Error,
            "system_started" => LogAction::SystemStarted,
            "auto_accept" => LogAction::AutoAccept,
            "auto_decline" => LogAction::AutoDecline,
            "auto_counter" => LogAction::AutoCounter,
            _ => LogAction::Other(raw),
        }
    }
}

impl From<LogAction> for String {
    fn from(action: LogAction) -> Self {
        action.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "wire::WireText", into = "String")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
    Other(String),
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
            LogLevel::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            LogLevel::Info => "Info",
            LogLevel::Warning => "Warnung",
            LogLevel::Error => "Fehler",
            LogLevel::Success => "Erfolg",
            LogLevel::Other(raw) => raw,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl From<wire::WireText> for LogLevel {
    fn from(text: wire::WireText) -> Self {
        LogLevel::from(text.0)
    }
}

impl From<String> for LogLevel {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "" => LogLevel::default(),
            "info" => LogLevel::Info,
            "warning" | "warn" => LogLevel::Warning,
            "error" => LogLevel::Error,
            "success" => LogLevel::Success,
            _ => LogLevel::Other(raw),
        }
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Immutable record of one bot action.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "wire::string_or_number")]
    pub timestamp: String,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub action: LogAction,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub offer_title: Option<String>,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_price")]
    pub listing_price: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_price")]
    pub offer_price: Option<f64>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub details: Option<Value>,
}

const DETAILS_PREVIEW_CHARS: usize = 50;

impl LogEntry {
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }

    /// Payload as one line of text: strings verbatim, JSON compact.
    pub fn payload_text(&self) -> String {
        match &self.payload {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Payload for the detail view. String payloads holding JSON are
    /// pretty-printed.
    pub fn payload_pretty(&self) -> Option<String> {
        match &self.payload {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(
                serde_json::from_str::<Value>(s)
                    .ok()
                    .filter(|v| v.is_object() || v.is_array())
                    .and_then(|v| serde_json::to_string_pretty(&v).ok())
                    .unwrap_or_else(|| s.clone()),
            ),
            Some(other) => serde_json::to_string_pretty(other).ok(),
        }
    }

    pub fn details_preview(&self) -> String {
        match &self.details {
            Some(Value::Object(map)) if !map.is_empty() => {
                let json = Value::Object(map.clone()).to_string();
                let head: String = json.chars().take(DETAILS_PREVIEW_CHARS).collect();
                format!("{}...", head)
            }
            _ => "Keine Details".to_string(),
        }
    }

    /// Offer as a share of the listing price, only when both are known.
    pub fn price_percentage(&self) -> Option<f64> {
        match (self.listing_price, self.offer_price) {
            (Some(list), Some(offer)) if list != 0.0 && offer != 0.0 => {
                Some(percentage_of(Some(offer), Some(list)))
            }
            _ => None,
        }
    }

    fn matches_search(&self, needle_lower: &str) -> bool {
        let hit = |text: &str| text.to_lowercase().contains(needle_lower);
        self.message.as_deref().is_some_and(hit)
            || hit(self.action.as_str())
            || hit(self.level.as_str())
    }
}

/// Sort newest first. Entries without a readable timestamp go last.
pub fn sort_newest_first(logs: &mut [LogEntry]) {
    logs.sort_by(|a, b| b.parsed_timestamp().cmp(&a.parsed_timestamp()));
}

/// Action choices offered by the logs panel filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionFilter {
    #[default]
    All,
    Received,
    AiAnalyzed,
    ResponseSent,
    ManualOverride,
}

impl ActionFilter {
    pub fn matches(self, action: &LogAction) -> bool {
        match self {
            ActionFilter::All => true,
            ActionFilter::Received => *action == LogAction::Received,
            ActionFilter::AiAnalyzed => *action == LogAction::AiAnalyzed,
            ActionFilter::ResponseSent => *action == LogAction::ResponseSent,
            ActionFilter::ManualOverride => *action == LogAction::ManualOverride,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionFilter::All => "Alle",
            ActionFilter::Received => "Empfangen",
            ActionFilter::AiAnalyzed => "KI-Analyse",
            ActionFilter::ResponseSent => "Antwort gesendet",
            ActionFilter::ManualOverride => "Manuell übersteuert",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ActionFilter::All => ActionFilter::Received,
            ActionFilter::Received => ActionFilter::AiAnalyzed,
            ActionFilter::AiAnalyzed => ActionFilter::ResponseSent,
            ActionFilter::ResponseSent => ActionFilter::ManualOverride,
            ActionFilter::ManualOverride => ActionFilter::All,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl DateFilter {
    /// Earliest timestamp kept, relative to `now`.
    pub fn cutoff(self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            DateFilter::All => None,
            DateFilter::Today => now.date().and_hms_opt(0, 0, 0),
            DateFilter::Week => Some(now - Duration::days(7)),
            DateFilter::Month => now.checked_sub_months(Months::new(1)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateFilter::All => "Alle",
            DateFilter::Today => "Heute",
            DateFilter::Week => "Letzte Woche",
            DateFilter::Month => "Letzter Monat",
        }
    }

    pub fn next(self) -> Self {
        match self {
            DateFilter::All => DateFilter::Today,
            DateFilter::Today => DateFilter::Week,
            DateFilter::Week => DateFilter::Month,
            DateFilter::Month => DateFilter::All,
        }
    }
}

/// Combined search, action and date filter of the logs panel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub search: String,
    pub action: ActionFilter,
    pub date: DateFilter,
}

impl LogFilter {
    pub fn apply<'a>(&self, logs: &'a [LogEntry], now: NaiveDateTime) -> Vec<&'a LogEntry> {
        let needle = self.search.trim().to_lowercase();
        let cutoff = self.date.cutoff(now);

        logs.iter()
            .filter(|log| needle.is_empty() || log.matches_search(&needle))
            .filter(|log| self.action.matches(&log.action))
            .filter(|log| match cutoff {
                None => true,
                Some(cut) => log.parsed_timestamp().is_some_and(|ts| ts >= cut),
            })
            .collect()
    }
}

/// Counts shown under the log table, over all loaded entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub received: usize,
    pub ai_analyzed: usize,
    pub response_sent: usize,
    pub manual_override: usize,
}

impl LogSummary {
    pub fn from_logs(logs: &[LogEntry]) -> Self {
        let mut summary = Self::default();
        for log in logs {
            match log.action {
                LogAction::Received => summary.received += 1,
                LogAction::AiAnalyzed => summary.ai_analyzed += 1,
                LogAction::ResponseSent => summary.response_sent += 1,
                LogAction::ManualOverride => summary.manual_override += 1,
                _ => {}
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(ts: &str, action: &str, message: &str) -> LogEntry {
        serde_json::from_value(serde_json::json!({
            "timestamp": ts,
            "action": action,
            "level": "info",
            "message": message,
        }))
        .unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn unknown_action_keeps_raw_label() {
        let log = entry("2024-03-15T10:00:00", "price_drop", "x");
        assert_eq!(log.action, LogAction::Other("price_drop".to_string()));
        assert_eq!(log.action.label(), "price_drop");
        assert_eq!(entry("", "auto_counter", "").action.label(), "Auto-Gegenangebot");
    }

    #[test]
    fn null_level_and_action_use_defaults() {
        let log: LogEntry = serde_json::from_str(
            r#"{"id": 5, "timestamp": "2024-03-15T10:00:00", "level": null, "action": null}"#,
        )
        .unwrap();
        assert_eq!(log.level, LogLevel::Info);
        assert_eq!(log.action, LogAction::Other(String::new()));
    }

    #[test]
    fn sorts_newest_first() {
        let mut logs = vec![
            entry("2024-03-10T10:00:00", "received", "old"),
            entry("kaputt", "received", "broken"),
            entry("2024-03-15T10:00:00", "received", "new"),
        ];
        sort_newest_first(&mut logs);
        let order: Vec<_> = logs.iter().map(|l| l.message.clone().unwrap()).collect();
        assert_eq!(order, ["new", "old", "broken"]);
    }

    #[test]
    fn search_is_case_insensitive_over_message_action_and_level() {
        let logs = vec![
            entry("2024-03-15T10:00:00", "received", "Neues Angebot von Max"),
            entry("2024-03-15T10:00:00", "ai_analyzed", "Analyse fertig"),
        ];
        let filter = LogFilter {
            search: "ANGEBOT".to_string(),
            ..LogFilter::default()
        };
        assert_eq!(filter.apply(&logs, now()).len(), 1);

        let by_action = LogFilter {
            search: "ai_ana".to_string(),
            ..LogFilter::default()
        };
        assert_eq!(by_action.apply(&logs, now())[0].message.as_deref(), Some("Analyse fertig"));

        let by_level = LogFilter {
            search: "info".to_string(),
            ..LogFilter::default()
        };
        assert_eq!(by_level.apply(&logs, now()).len(), 2);
    }

    #[test]
    fn date_filters() {
        let logs = vec![
            entry("2024-03-15T08:00:00", "received", "today"),
            entry("2024-03-10T08:00:00", "received", "this week"),
            entry("2024-02-20T08:00:00", "received", "this month"),
            entry("2024-01-01T08:00:00", "received", "old"),
            entry("unlesbar", "received", "broken"),
        ];
        let count = |date| {
            LogFilter {
                date,
                ..LogFilter::default()
            }
            .apply(&logs, now())
            .len()
        };
        assert_eq!(count(DateFilter::All), 5);
        assert_eq!(count(DateFilter::Today), 1);
        assert_eq!(count(DateFilter::Week), 2);
        assert_eq!(count(DateFilter::Month), 3);
    }

    #[test]
    fn action_filter_and_summary() {
        let logs = vec![
            entry("2024-03-15T08:00:00", "received", "a"),
            entry("2024-03-15T08:00:00", "received", "b"),
            entry("2024-03-15T08:00:00", "manual_override", "c"),
            entry("2024-03-15T08:00:00", "auto_accept", "d"),
        ];
        let filter = LogFilter {
            action: ActionFilter::Received,
            ..LogFilter::default()
        };
        assert_eq!(filter.apply(&logs, now()).len(), 2);

        let summary = LogSummary::from_logs(&logs);
        assert_eq!(summary.received, 2);
        assert_eq!(summary.manual_override, 1);
        assert_eq!(summary.ai_analyzed, 0);
    }

    #[test]
    fn payload_and_details_rendering() {
        let log: LogEntry = serde_json::from_value(serde_json::json!({
            "timestamp": "2024-03-15T08:00:00",
            "payload": "{\"offer\": 12}",
            "details": {"reason": "a long explanation that certainly exceeds fifty characters"},
            "listing_price": 50,
            "offer_price": "40,00 €"
        }))
        .unwrap();
        assert_eq!(log.payload_text(), "{\"offer\": 12}");
        assert!(log.payload_pretty().unwrap().contains("\n"));
        assert!(log.details_preview().ends_with("..."));
        assert_eq!(log.details_preview().chars().count(), 53);
        assert_eq!(log.price_percentage(), Some(80.0));
        assert_eq!(LogEntry::default().details_preview(), "Keine Details");
    }
}
