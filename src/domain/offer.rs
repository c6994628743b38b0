use crate::domain::money::percentage_of;
use crate::domain::wire;
use crate::domain::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an offer as reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "wire::WireText", into = "String")]
pub enum OfferStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Countered,
    Other(String),
}

impl OfferStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Countered => "countered",
            OfferStatus::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            OfferStatus::Pending => "Wartend",
            OfferStatus::Accepted => "Angenommen",
            OfferStatus::Rejected => "Abgelehnt",
            OfferStatus::Countered => "Gegenangebot",
            OfferStatus::Other(raw) => raw,
        }
    }
}

impl From<wire::WireText> for OfferStatus {
    fn from(text: wire::WireText) -> Self {
        OfferStatus::from(text.0)
    }
}

impl From<String> for OfferStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "" => OfferStatus::default(),
            "pending" => OfferStatus::Pending,
            "accepted" => OfferStatus::Accepted,
            // older backends report rejections as "declined"
            "rejected" | "declined" => OfferStatus::Rejected,
            "countered" => OfferStatus::Countered,
            _ => OfferStatus::Other(raw),
        }
    }
}

impl From<OfferStatus> for String {
    fn from(status: OfferStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AiRecommendation {
    #[serde(default)]
    pub recommendation: String,
    #[serde(default, deserialize_with = "wire::opt_price")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A buyer's price proposal against a listing.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Offer {
    #[serde(default, deserialize_with = "wire::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::string_or_number")]
    pub item_id: String,
    #[serde(default)]
    pub item_title: Option<String>,
    #[serde(default)]
    pub buyer_username: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_price")]
    pub original_price: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_price")]
    pub list_price: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_price")]
    pub offer_amount: Option<f64>,
    #[serde(default)]
    pub status: OfferStatus,
    #[serde(default)]
    pub offer_type: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_price")]
    pub counter_amount: Option<f64>,
    #[serde(default)]
    pub counter_message: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_price")]
    pub counter_price: Option<f64>,
    #[serde(default)]
    pub response_message: Option<String>,
    #[serde(default)]
    pub ai_recommendation: Option<AiRecommendation>,
    #[serde(default)]
    pub ai_decision: Option<String>,
    #[serde(default)]
    pub ai_reasoning: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_price")]
    pub ai_confidence: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub created_date: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub created_at: Option<String>,
}

impl Offer {
    /// Listing price: `original_price`, falling back to `list_price`.
    pub fn base_price(&self) -> Option<f64> {
        self.original_price
            .filter(|p| *p != 0.0)
            .or(self.list_price)
    }

    /// Offer as a share of the listing price, in percent with one decimal.
    /// Zero when there is no usable listing price.
    pub fn percentage(&self) -> f64 {
        percentage_of(self.offer_amount, self.base_price())
    }

    pub fn has_counter(&self) -> bool {
        self.counter_amount.is_some_and(|a| a != 0.0)
            || self.counter_message.as_deref().is_some_and(|m| !m.is_empty())
            || self.offer_type.as_deref() == Some("counter")
    }

    pub fn created(&self) -> Option<&str> {
        self.created_date.as_deref().or(self.created_at.as_deref())
    }

    pub fn title(&self) -> &str {
        self.item_title.as_deref().unwrap_or("")
    }

    pub fn buyer(&self) -> &str {
        self.buyer_username.as_deref().unwrap_or("")
    }

    pub fn type_label(&self) -> &'static str {
        if self.has_counter() {
            "Gegenvorschlag"
        } else {
            "Erstangebot"
        }
    }
}

/// Which offers the offers panel shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OfferFilter {
    #[default]
    All,
    Pending,
    Accepted,
    Rejected,
    Countered,
    WithCounters,
}

impl OfferFilter {
    pub const ALL: [OfferFilter; 6] = [
        OfferFilter::All,
        OfferFilter::Pending,
        OfferFilter::Accepted,
        OfferFilter::Rejected,
        OfferFilter::Countered,
        OfferFilter::WithCounters,
    ];

    /// Value for the `status` query parameter, if the backend filters.
    pub fn query_status(self) -> Option<&'static str> {
        match self {
            OfferFilter::All | OfferFilter::WithCounters => None,
            OfferFilter::Pending => Some("pending"),
            OfferFilter::Accepted => Some("accepted"),
            OfferFilter::Rejected => Some("rejected"),
            OfferFilter::Countered => Some("countered"),
        }
    }

    pub fn matches(self, offer: &Offer) -> bool {
        match self {
            OfferFilter::All => true,
            OfferFilter::Pending => offer.status == OfferStatus::Pending,
            OfferFilter::Accepted => offer.status == OfferStatus::Accepted,
            OfferFilter::Rejected => offer.status == OfferStatus::Rejected,
            OfferFilter::Countered => offer.status == OfferStatus::Countered,
            OfferFilter::WithCounters => offer.has_counter(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OfferFilter::All => "Alle",
            OfferFilter::Pending => "Wartend",
            OfferFilter::Accepted => "Angenommen",
            OfferFilter::Rejected => "Abgelehnt",
            OfferFilter::Countered => "Gegenangebote",
            OfferFilter::WithCounters => "Mit Gegenvorschlägen",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Seller decision sent to `/api/offers/:id/respond`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseAction {
    Accept,
    Reject,
    Counter,
}

impl ResponseAction {
    pub fn label(self) -> &'static str {
        match self {
            ResponseAction::Accept => "Annehmen",
            ResponseAction::Reject => "Ablehnen",
            ResponseAction::Counter => "Gegenangebot",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OfferResponse {
    pub action: ResponseAction,
    pub counter_price: Option<f64>,
    pub message: String,
    pub manual_override: bool,
}

impl OfferResponse {
    /// Build a manual response. A counter needs a positive price; the price
    /// is dropped for the other actions.
    pub fn manual(
        action: ResponseAction,
        counter_price: Option<f64>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let counter_price = match action {
            ResponseAction::Counter => match counter_price {
                Some(p) if p.is_finite() && p > 0.0 => Some(p),
                _ => return Err(ValidationError::CounterPriceRequired),
            },
            _ => None,
        };
        Ok(Self {
            action,
            counter_price,
            message: message.into(),
            manual_override: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(json: &str) -> Offer {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn decodes_string_prices_and_numeric_ids() {
        let o = offer(
            r#"{"id": 7, "item_id": 123456, "original_price": "60.00 EUR",
                "offer_amount": "40.00 EUR", "status": "pending"}"#,
        );
        assert_eq!(o.id, "7");
        assert_eq!(o.item_id, "123456");
        assert_eq!(o.percentage(), 66.7);
    }

    #[test]
    fn falls_back_to_list_price() {
        let o = offer(r#"{"id": "a", "list_price": 50, "offer_amount": 45}"#);
        assert_eq!(o.base_price(), Some(50.0));
        assert_eq!(o.percentage(), 90.0);
    }

    #[test]
    fn zero_or_missing_price_gives_zero_percentage() {
        let zero = offer(r#"{"id": "a", "original_price": 0, "offer_amount": 45}"#);
        assert_eq!(zero.percentage(), 0.0);
        let missing = offer(r#"{"id": "b", "offer_amount": 45}"#);
        assert_eq!(missing.percentage(), 0.0);
    }

    #[test]
    fn status_aliases_and_unknown_values() {
        assert_eq!(offer(r#"{"status": "declined"}"#).status, OfferStatus::Rejected);
        let odd = offer(r#"{"status": "expired"}"#).status;
        assert_eq!(odd, OfferStatus::Other("expired".to_string()));
        assert_eq!(odd.label(), "expired");
        assert_eq!(offer("{}").status, OfferStatus::Pending);
        assert_eq!(offer(r#"{"status": null}"#).status, OfferStatus::Pending);
    }

    #[test]
    fn counter_detection() {
        assert!(offer(r#"{"counter_amount": 42.0}"#).has_counter());
        assert!(offer(r#"{"counter_message": "Wie wäre 40?"}"#).has_counter());
        assert!(offer(r#"{"offer_type": "counter"}"#).has_counter());
        assert!(!offer(r#"{"counter_message": ""}"#).has_counter());
    }

    #[test]
    fn status_filter_matches_only_that_status() {
        let pending = offer(r#"{"status": "pending"}"#);
        let accepted = offer(r#"{"status": "accepted"}"#);
        assert!(OfferFilter::Pending.matches(&pending));
        assert!(!OfferFilter::Pending.matches(&accepted));
        assert_eq!(OfferFilter::Pending.query_status(), Some("pending"));
        assert_eq!(OfferFilter::WithCounters.query_status(), None);
        assert_eq!(OfferFilter::WithCounters.next(), OfferFilter::All);
    }

    #[test]
    fn counter_response_requires_a_price() {
        assert_eq!(
            OfferResponse::manual(ResponseAction::Counter, None, ""),
            Err(ValidationError::CounterPriceRequired)
        );
        let accept = OfferResponse::manual(ResponseAction::Accept, Some(10.0), "ok").unwrap();
        assert_eq!(accept.counter_price, None);

        let body = serde_json::to_value(
            OfferResponse::manual(ResponseAction::Counter, Some(42.5), "Gegenangebot").unwrap(),
        )
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "action": "counter",
                "counter_price": 42.5,
                "message": "Gegenangebot",
                "manual_override": true
            })
        );
    }
}
