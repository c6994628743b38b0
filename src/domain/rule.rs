use crate::domain::wire;
use crate::domain::ValidationError;
use serde::{Deserialize, Serialize};

/// `time_range_end` at or above this value means "no upper bound".
pub const OPEN_ENDED_DAYS: u32 = 999;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "wire::WireText", into = "String")]
pub enum RuleType {
    #[default]
    General,
    TimeBased,
    Auto,
    Other(String),
}

impl RuleType {
    pub fn as_str(&self) -> &str {
        match self {
            RuleType::General => "general",
            RuleType::TimeBased => "time_based",
            RuleType::Auto => "auto",
            RuleType::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RuleType::General => "Allgemein",
            RuleType::TimeBased => "Zeitbasiert",
            RuleType::Auto => "Vollautomatik",
            RuleType::Other(raw) => raw,
        }
    }

    pub fn next(&self) -> RuleType {
        match self {
            RuleType::General => RuleType::TimeBased,
            RuleType::TimeBased => RuleType::Auto,
            RuleType::Auto | RuleType::Other(_) => RuleType::General,
        }
    }
}

impl From<wire::WireText> for RuleType {
    fn from(text: wire::WireText) -> Self {
        RuleType::from(text.0)
    }
}

impl From<String> for RuleType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "" => RuleType::default(),
            "general" => RuleType::General,
            "time_based" => RuleType::TimeBased,
            "auto" => RuleType::Auto,
            _ => RuleType::Other(raw),
        }
    }
}

impl From<RuleType> for String {
    fn from(kind: RuleType) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "wire::WireText", into = "String")]
pub enum NegotiationTone {
    #[default]
    Friendly,
    Professional,
    Firm,
    Efficient,
    Other(String),
}

impl NegotiationTone {
    pub fn as_str(&self) -> &str {
        match self {
            NegotiationTone::Friendly => "friendly",
            NegotiationTone::Professional => "professional",
            NegotiationTone::Firm => "firm",
            NegotiationTone::Efficient => "efficient",
            NegotiationTone::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NegotiationTone::Friendly => "Freundlich",
            NegotiationTone::Professional => "Professionell",
            NegotiationTone::Firm => "Bestimmt",
            NegotiationTone::Efficient => "Effizient",
            NegotiationTone::Other(raw) => raw,
        }
    }

    pub fn next(&self) -> NegotiationTone {
        match self {
            NegotiationTone::Friendly => NegotiationTone::Professional,
            NegotiationTone::Professional => NegotiationTone::Firm,
            NegotiationTone::Firm => NegotiationTone::Efficient,
            NegotiationTone::Efficient | NegotiationTone::Other(_) => NegotiationTone::Friendly,
        }
    }
}

impl From<wire::WireText> for NegotiationTone {
    fn from(text: wire::WireText) -> Self {
        NegotiationTone::from(text.0)
    }
}

impl From<String> for NegotiationTone {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "" => NegotiationTone::default(),
            "friendly" => NegotiationTone::Friendly,
            "professional" => NegotiationTone::Professional,
            "firm" => NegotiationTone::Firm,
            "efficient" => NegotiationTone::Efficient,
            _ => NegotiationTone::Other(raw),
        }
    }
}

impl From<NegotiationTone> for String {
    fn from(tone: NegotiationTone) -> Self {
        tone.as_str().to_string()
    }
}

/// A named negotiation policy. Also used as the create/edit draft, so
/// `Default` yields the values a new rule starts with.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(from = "RuleWire")]
pub struct NegotiationRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub min_price_percentage: f64,
    pub auto_accept_percentage: f64,
    pub auto_decline_percentage: f64,
    pub max_counter_offers: u32,
    pub negotiation_tone: NegotiationTone,
    pub is_active: bool,
    pub rule_type: RuleType,
    pub time_range_start: u32,
    pub time_range_end: u32,
    pub auto_execute_enabled: bool,
    pub auto_counter_enabled: bool,
    pub counter_offer_percentage: f64,
}

/// Rule as the backend sends it. Absent, null or unreadable numbers fall
/// back to the new-rule defaults.
#[derive(Default, Deserialize)]
#[serde(default)]
struct RuleWire {
    #[serde(deserialize_with = "wire::opt_string_or_number")]
    id: Option<String>,
    #[serde(deserialize_with = "wire::string_or_number")]
    name: String,
    #[serde(deserialize_with = "wire::string_or_number")]
    description: String,
    #[serde(deserialize_with = "wire::opt_price")]
    min_price_percentage: Option<f64>,
    #[serde(deserialize_with = "wire::opt_price")]
    auto_accept_percentage: Option<f64>,
    #[serde(deserialize_with = "wire::opt_price")]
    auto_decline_percentage: Option<f64>,
    #[serde(deserialize_with = "wire::opt_u32")]
    max_counter_offers: Option<u32>,
    negotiation_tone: NegotiationTone,
    #[serde(deserialize_with = "wire::lenient_bool")]
    is_active: bool,
    rule_type: RuleType,
    #[serde(deserialize_with = "wire::opt_u32")]
    time_range_start: Option<u32>,
    #[serde(deserialize_with = "wire::opt_u32")]
    time_range_end: Option<u32>,
    #[serde(deserialize_with = "wire::lenient_bool")]
    auto_execute_enabled: bool,
    #[serde(deserialize_with = "wire::lenient_bool")]
    auto_counter_enabled: bool,
    #[serde(deserialize_with = "wire::opt_price")]
    counter_offer_percentage: Option<f64>,
}

impl From<RuleWire> for NegotiationRule {
    fn from(raw: RuleWire) -> Self {
        let base = NegotiationRule::default();
        Self {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            min_price_percentage: raw.min_price_percentage.unwrap_or(base.min_price_percentage),
            auto_accept_percentage: raw
                .auto_accept_percentage
                .unwrap_or(base.auto_accept_percentage),
            auto_decline_percentage: raw
                .auto_decline_percentage
                .unwrap_or(base.auto_decline_percentage),
            max_counter_offers: raw.max_counter_offers.unwrap_or(base.max_counter_offers),
            negotiation_tone: raw.negotiation_tone,
            is_active: raw.is_active,
            rule_type: raw.rule_type,
            time_range_start: raw.time_range_start.unwrap_or(base.time_range_start),
            time_range_end: raw.time_range_end.unwrap_or(base.time_range_end),
            auto_execute_enabled: raw.auto_execute_enabled,
            auto_counter_enabled: raw.auto_counter_enabled,
            counter_offer_percentage: raw
                .counter_offer_percentage
                .unwrap_or(base.counter_offer_percentage),
        }
    }
}

impl Default for NegotiationRule {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            min_price_percentage: 70.0,
            auto_accept_percentage: 75.0,
            auto_decline_percentage: 60.0,
            max_counter_offers: 2,
            negotiation_tone: NegotiationTone::Friendly,
            is_active: false,
            rule_type: RuleType::General,
            time_range_start: 0,
            time_range_end: OPEN_ENDED_DAYS,
            auto_execute_enabled: false,
            auto_counter_enabled: false,
            counter_offer_percentage: 80.0,
        }
    }
}

impl NegotiationRule {
    /// Day range shown next to time-based rules.
    pub fn time_range_text(&self) -> Option<String> {
        if self.rule_type != RuleType::TimeBased {
            return None;
        }
        if self.time_range_end >= OPEN_ENDED_DAYS {
            Some(format!("{}+ Tage", self.time_range_start))
        } else {
            Some(format!("{}-{} Tage", self.time_range_start, self.time_range_end))
        }
    }

    /// Active rules stay until they are switched off.
    pub fn can_delete(&self) -> bool {
        !self.is_active
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyRuleName);
        }
        let percentages = [
            ("min_price_percentage", self.min_price_percentage),
            ("auto_accept_percentage", self.auto_accept_percentage),
            ("auto_decline_percentage", self.auto_decline_percentage),
            ("counter_offer_percentage", self.counter_offer_percentage),
        ];
        for (field, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                return Err(ValidationError::PercentageOutOfRange { field, value });
            }
        }
        if !(1..=10).contains(&self.max_counter_offers) {
            return Err(ValidationError::CounterLimitOutOfRange(self.max_counter_offers));
        }
        if self.rule_type == RuleType::TimeBased && self.time_range_start >= self.time_range_end {
            return Err(ValidationError::InvalidTimeRange {
                start: self.time_range_start,
                end: self.time_range_end,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rule_defaults() {
        let rule = NegotiationRule::default();
        assert_eq!(rule.min_price_percentage, 70.0);
        assert_eq!(rule.auto_accept_percentage, 75.0);
        assert_eq!(rule.auto_decline_percentage, 60.0);
        assert_eq!(rule.max_counter_offers, 2);
        assert!(!rule.is_active);
        assert_eq!(rule.time_range_end, OPEN_ENDED_DAYS);
        assert_eq!(rule.counter_offer_percentage, 80.0);
    }

    #[test]
    fn decodes_partial_backend_rule() {
        let rule: NegotiationRule = serde_json::from_str(
            r#"{"id": 3, "name": "Alt", "is_active": 1, "rule_type": "time_based",
                "time_range_start": 30, "time_range_end": 60, "negotiation_tone": "rude"}"#,
        )
        .unwrap();
        assert_eq!(rule.id.as_deref(), Some("3"));
        assert!(rule.is_active);
        assert_eq!(rule.time_range_text().as_deref(), Some("30-60 Tage"));
        assert_eq!(rule.negotiation_tone, NegotiationTone::Other("rude".to_string()));
        assert_eq!(rule.max_counter_offers, 2);
    }

    #[test]
    fn null_and_string_fields_fall_back() {
        let rules: Vec<NegotiationRule> = serde_json::from_str(
            r#"[{"name": "Standard", "description": null, "counter_offer_percentage": null,
                 "min_price_percentage": "70", "auto_accept_percentage": "82,5",
                 "max_counter_offers": null, "negotiation_tone": null, "rule_type": null},
                {"name": 42, "description": 7}]"#,
        )
        .unwrap();
        let rule = &rules[0];
        assert_eq!(rule.description, "");
        assert_eq!(rule.counter_offer_percentage, 80.0);
        assert_eq!(rule.min_price_percentage, 70.0);
        assert_eq!(rule.auto_accept_percentage, 82.5);
        assert_eq!(rule.max_counter_offers, 2);
        assert_eq!(rule.negotiation_tone, NegotiationTone::Friendly);
        assert_eq!(rule.rule_type, RuleType::General);
        assert_eq!(rules[1].name, "42");
        assert_eq!(rules[1].description, "7");
    }

    #[test]
    fn open_ended_time_range() {
        let rule = NegotiationRule {
            rule_type: RuleType::TimeBased,
            time_range_start: 90,
            ..NegotiationRule::default()
        };
        assert_eq!(rule.time_range_text().as_deref(), Some("90+ Tage"));
        assert_eq!(NegotiationRule::default().time_range_text(), None);
    }

    #[test]
    fn active_rules_cannot_be_deleted() {
        let mut rule = NegotiationRule::default();
        assert!(rule.can_delete());
        rule.is_active = true;
        assert!(!rule.can_delete());
    }

    #[test]
    fn validation() {
        let mut rule = NegotiationRule::default();
        assert_eq!(rule.validate(), Err(ValidationError::EmptyRuleName));

        rule.name = "Standard".to_string();
        assert_eq!(rule.validate(), Ok(()));

        rule.auto_accept_percentage = 120.0;
        assert!(matches!(
            rule.validate(),
            Err(ValidationError::PercentageOutOfRange { field: "auto_accept_percentage", .. })
        ));

        rule.auto_accept_percentage = 80.0;
        rule.max_counter_offers = 0;
        assert_eq!(rule.validate(), Err(ValidationError::CounterLimitOutOfRange(0)));

        rule.max_counter_offers = 3;
        rule.rule_type = RuleType::TimeBased;
        rule.time_range_start = 50;
        rule.time_range_end = 10;
        assert_eq!(
            rule.validate(),
            Err(ValidationError::InvalidTimeRange { start: 50, end: 10 })
        );
    }

    #[test]
    fn draft_serializes_wire_names() {
        let body = serde_json::to_value(NegotiationRule::default()).unwrap();
        assert_eq!(body["rule_type"], "general");
        assert_eq!(body["negotiation_tone"], "friendly");
        assert!(body.get("id").is_none());
    }
}
