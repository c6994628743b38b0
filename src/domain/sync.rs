use crate::domain::wire;
use serde::Deserialize;

/// Progress snapshot of a server-side batch synchronization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchSyncStatus {
    #[serde(deserialize_with = "wire::lenient_bool")]
    pub active: bool,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub total_items: u64,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub processed_items: u64,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub current_batch: u64,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub found_offers: u64,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub errors: u64,
    #[serde(deserialize_with = "wire::string_or_number")]
    pub status_message: String,
}

impl BatchSyncStatus {
    /// Whole-number progress, 0 while the total is unknown.
    pub fn progress_pct(&self) -> u16 {
        if self.total_items == 0 {
            return 0;
        }
        let pct = (self.processed_items as f64 / self.total_items as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u16
    }

    /// Message shown once the job reports inactive.
    pub fn completion_message(&self) -> String {
        if self.found_offers > 0 {
            format!(
                "Batch-Sync abgeschlossen! {} Best Offers gefunden, {} Fehler",
                self.found_offers, self.errors
            )
        } else {
            format!("Batch-Sync abgeschlossen. {}", self.status_message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress() {
        let mut status = BatchSyncStatus {
            total_items: 3,
            processed_items: 1,
            ..BatchSyncStatus::default()
        };
        assert_eq!(status.progress_pct(), 33);
        status.processed_items = 2;
        assert_eq!(status.progress_pct(), 67);
        status.total_items = 0;
        assert_eq!(status.progress_pct(), 0);
    }

    #[test]
    fn completion_text_depends_on_found_offers() {
        let mut status: BatchSyncStatus = serde_json::from_str(
            r#"{"active": false, "found_offers": 4, "errors": 1, "status_message": "fertig"}"#,
        )
        .unwrap();
        assert_eq!(
            status.completion_message(),
            "Batch-Sync abgeschlossen! 4 Best Offers gefunden, 1 Fehler"
        );
        status.found_offers = 0;
        assert_eq!(status.completion_message(), "Batch-Sync abgeschlossen. fertig");
    }
}
