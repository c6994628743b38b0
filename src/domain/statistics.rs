use crate::domain::money::round1;
use crate::domain::wire;
use serde::Deserialize;

/// Aggregate offer counts owned by the dashboard and handed to the panels.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub total_offers: u64,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub pending_offers: u64,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub accepted_offers: u64,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub rejected_offers: u64,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub countered_offers: u64,
    pub success_rate: f64,
    #[serde(deserialize_with = "wire::opt_price")]
    pub avg_offer_price: Option<f64>,
    #[serde(deserialize_with = "wire::opt_string_or_number")]
    pub last_sync: Option<String>,
    #[serde(deserialize_with = "wire::opt_string_or_number")]
    pub connection_status: Option<String>,
}

impl DashboardStats {
    fn rate(&self, count: u64) -> f64 {
        if self.total_offers == 0 {
            0.0
        } else {
            round1(count as f64 / self.total_offers as f64 * 100.0)
        }
    }

    pub fn acceptance_rate(&self) -> f64 {
        self.rate(self.accepted_offers)
    }

    pub fn rejection_rate(&self) -> f64 {
        self.rate(self.rejected_offers)
    }

    pub fn negotiation_rate(&self) -> f64 {
        self.rate(self.countered_offers)
    }

    /// Accepted plus countered.
    pub fn successful(&self) -> u64 {
        self.accepted_offers + self.countered_offers
    }

    /// Status counts in chart order.
    pub fn distribution(&self) -> [(&'static str, u64); 4] {
        [
            ("Wartend", self.pending_offers),
            ("Angenommen", self.accepted_offers),
            ("Abgelehnt", self.rejected_offers),
            ("Gegenangebote", self.countered_offers),
        ]
    }

    /// Share of each status among the four, whole percent.
    pub fn distribution_pct(&self) -> [(&'static str, u64); 4] {
        let dist = self.distribution();
        let sum: u64 = dist.iter().map(|(_, v)| v).sum();
        dist.map(|(name, v)| {
            let pct = if sum == 0 {
                0
            } else {
                (v as f64 / sum as f64 * 100.0).round() as u64
            };
            (name, pct)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_are_zero_without_offers() {
        let stats = DashboardStats::default();
        assert_eq!(stats.acceptance_rate(), 0.0);
        assert_eq!(stats.distribution_pct()[0].1, 0);
    }

    #[test]
    fn rates_and_distribution() {
        let stats: DashboardStats = serde_json::from_str(
            r#"{"total_offers": 6, "pending_offers": 2, "accepted_offers": 2,
                "rejected_offers": 1, "countered_offers": 1, "success_rate": 33.3,
                "last_sync": null}"#,
        )
        .unwrap();
        assert_eq!(stats.acceptance_rate(), 33.3);
        assert_eq!(stats.rejection_rate(), 16.7);
        assert_eq!(stats.negotiation_rate(), 16.7);
        assert_eq!(stats.successful(), 3);
        assert_eq!(stats.distribution_pct()[1], ("Angenommen", 33));
        assert_eq!(stats.avg_offer_price, None);
    }
}
