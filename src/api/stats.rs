use super::{ApiError, BotClient};
use crate::domain::DashboardStats;
use serde::Deserialize;

/// Reply of `GET /api/health`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Health {
    pub status: String,
    pub version: Option<String>,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}

impl BotClient {
    pub async fn get_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get(self.endpoint(&["stats"])).await
    }

    pub async fn health(&self) -> Result<Health, ApiError> {
        self.get(self.endpoint(&["health"])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_stats_and_health() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_offers": 10, "pending_offers": "4", "accepted_offers": 3,
                "rejected_offers": 2, "countered_offers": 1, "success_rate": 40.0,
                "last_sync": "2024-03-02T09:00:00", "connection_status": "connected"
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "healthy", "version": "1.0.0"})),
            )
            .mount(&mock_server)
            .await;

        let client = BotClient::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        let stats = client.get_stats().await.unwrap();
        assert_eq!(stats.pending_offers, 4);
        assert_eq!(stats.acceptance_rate(), 30.0);
        let health = client.health().await.unwrap();
        assert!(health.is_healthy());
        assert_eq!(health.version.as_deref(), Some("1.0.0"));
    }
}
