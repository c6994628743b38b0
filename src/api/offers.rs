use super::{rejection, ActionReply, ApiError, BotClient};
use crate::domain::{wire, BatchSyncStatus, Offer, OfferFilter, OfferResponse};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct OffersReply {
    #[serde(default)]
    offers: Option<Vec<Offer>>,
    #[serde(default)]
    error: Option<String>,
}

/// Result of `POST /api/offers/sync-simple`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncSimpleReport {
    #[serde(deserialize_with = "wire::lenient_bool")]
    pub success: bool,
    pub message: Option<String>,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub new_offers: u64,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub updated_offers: u64,
    pub error: Option<String>,
}

impl SyncSimpleReport {
    pub fn summary(&self) -> String {
        format!(
            "{} ({} neue, {} aktualisierte)",
            self.message.as_deref().unwrap_or("Synchronisation abgeschlossen"),
            self.new_offers,
            self.updated_offers
        )
    }
}

/// Result of `POST /api/offers/sync-working`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncWorkingReport {
    #[serde(deserialize_with = "wire::lenient_bool")]
    pub success: bool,
    pub message: Option<String>,
    #[serde(deserialize_with = "wire::lenient_u64")]
    pub new_offers: u64,
    #[serde(deserialize_with = "wire::opt_string_or_number")]
    pub processing_time: Option<String>,
    pub sources_used: Vec<String>,
    pub note: Option<String>,
    pub error: Option<String>,
}

impl SyncWorkingReport {
    pub fn summary(&self) -> String {
        let message = self.message.as_deref().unwrap_or("Synchronisation abgeschlossen");
        let time = self.processing_time.as_deref().unwrap_or("-");
        if self.new_offers > 0 {
            let sources = if self.sources_used.is_empty() {
                "eBay API".to_string()
            } else {
                self.sources_used.join(", ")
            };
            format!("{} ({}) - Quelle: {}", message, time, sources)
        } else {
            format!("{} ({}). {}", message, time, self.note.as_deref().unwrap_or(""))
                .trim_end()
                .to_string()
        }
    }
}

/// Result of `POST /api/offers/sync-batch`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchStart {
    #[serde(deserialize_with = "wire::lenient_bool")]
    pub success: bool,
    pub status: Option<BatchSyncStatus>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchStatusReply {
    #[serde(default)]
    status: Option<BatchSyncStatus>,
}

impl BotClient {
    /// `GET /api/offers[?status=]`. The backend filter is repeated locally so
    /// the result only holds offers matching `filter`.
    pub async fn list_offers(&self, filter: OfferFilter) -> Result<Vec<Offer>, ApiError> {
        let mut url = self.endpoint(&["offers"]);
        if let Some(status) = filter.query_status() {
            url.query_pairs_mut().append_pair("status", status);
        }
        let reply: OffersReply = self.get(url).await?;
        match reply {
            OffersReply { offers: Some(offers), .. } => {
                Ok(offers.into_iter().filter(|o| filter.matches(o)).collect())
            }
            OffersReply { error: Some(error), .. } => Err(ApiError::Rejected(error)),
            _ => Err(ApiError::MissingField("offers")),
        }
    }

    pub async fn analyze_offer(&self, offer_id: &str) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["offers", offer_id, "analyze"]);
        let reply: ActionReply = self.send::<Value, _>(Method::POST, url, None).await?;
        reply.into_result()
    }

    pub async fn respond_to_offer(
        &self,
        offer_id: &str,
        response: &OfferResponse,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["offers", offer_id, "respond"]);
        let reply: ActionReply = self.send(Method::POST, url, Some(response)).await?;
        reply.into_result()
    }

    pub async fn sync_simple(&self) -> Result<SyncSimpleReport, ApiError> {
        let url = self.endpoint(&["offers", "sync-simple"]);
        let report: SyncSimpleReport = self.send::<Value, _>(Method::POST, url, None).await?;
        if report.success {
            Ok(report)
        } else {
            Err(rejection(report.error, report.message))
        }
    }

    pub async fn sync_working(&self) -> Result<SyncWorkingReport, ApiError> {
        let url = self.endpoint(&["offers", "sync-working"]);
        let report: SyncWorkingReport = self.send::<Value, _>(Method::POST, url, None).await?;
        if report.success {
            Ok(report)
        } else {
            Err(rejection(report.error, report.message))
        }
    }

    pub async fn start_batch_sync(&self) -> Result<BatchStart, ApiError> {
        let url = self.endpoint(&["offers", "sync-batch"]);
        let start: BatchStart = self.send::<Value, _>(Method::POST, url, None).await?;
        if start.success {
            Ok(start)
        } else {
            Err(rejection(None, start.message))
        }
    }

    pub async fn batch_sync_status(&self) -> Result<BatchSyncStatus, ApiError> {
        let url = self.endpoint(&["offers", "sync-batch", "status"]);
        let reply: BatchStatusReply = self.get(url).await?;
        reply.status.ok_or(ApiError::MissingField("status"))
    }

    pub async fn stop_batch_sync(&self) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["offers", "sync-batch", "stop"]);
        let reply: ActionReply = self.send::<Value, _>(Method::POST, url, None).await?;
        reply.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OfferStatus, ResponseAction};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BotClient {
        BotClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_pending_filter_only_returns_pending_offers() {
        let mock_server = MockServer::start().await;

        // A backend that ignores the status parameter still gets filtered
        Mock::given(method("GET"))
            .and(path("/api/offers"))
            .and(query_param("status", "pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "offers": [
                    {"id": 1, "status": "pending", "offer_amount": 10},
                    {"id": 2, "status": "accepted", "offer_amount": 20},
                    {"id": 3, "status": "pending", "offer_amount": "30.00 EUR"}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let offers = client(&mock_server).list_offers(OfferFilter::Pending).await.unwrap();
        assert_eq!(offers.len(), 2);
        assert!(offers.iter().all(|o| o.status == OfferStatus::Pending));
    }

    #[tokio::test]
    async fn test_with_counters_filters_client_side() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/offers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "offers": [
                    {"id": 1, "status": "pending"},
                    {"id": 2, "status": "countered", "counter_amount": 25.0},
                    {"id": 3, "status": "pending", "offer_type": "counter"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let offers = client(&mock_server)
            .list_offers(OfferFilter::WithCounters)
            .await
            .unwrap();
        let ids: Vec<_> = offers.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["2", "3"]);
    }

    #[tokio::test]
    async fn test_list_offers_error_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/offers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Token abgelaufen"})))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).list_offers(OfferFilter::All).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "Token abgelaufen"));
    }

    #[tokio::test]
    async fn test_list_offers_unknown_shape() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/offers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).list_offers(OfferFilter::All).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingField("offers")));
    }

    #[tokio::test]
    async fn test_respond_sends_manual_override_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/offers/42/respond"))
            .and(body_json(json!({
                "action": "counter",
                "counter_price": 55.0,
                "message": "Mein Vorschlag",
                "manual_override": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Gegenangebot gesendet"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response =
            OfferResponse::manual(ResponseAction::Counter, Some(55.0), "Mein Vorschlag").unwrap();
        let message = client(&mock_server)
            .respond_to_offer("42", &response)
            .await
            .unwrap();
        assert_eq!(message.as_deref(), Some("Gegenangebot gesendet"));
    }

    #[tokio::test]
    async fn test_analyze_failure_surfaces_backend_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/offers/7/analyze"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"success": false, "error": "OpenAI nicht erreichbar"})),
            )
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).analyze_offer("7").await.unwrap_err();
        assert_eq!(err.to_string(), "OpenAI nicht erreichbar");
    }

    #[tokio::test]
    async fn test_sync_reports() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/offers/sync-simple"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "message": "Fertig", "new_offers": 3, "updated_offers": 1
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/offers/sync-working"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "message": "Sync ok", "new_offers": 2,
                "processing_time": "1.2s", "sources_used": ["Trading API", "Sell API"]
            })))
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let simple = client.sync_simple().await.unwrap();
        assert_eq!(simple.summary(), "Fertig (3 neue, 1 aktualisierte)");
        let working = client.sync_working().await.unwrap();
        assert_eq!(working.summary(), "Sync ok (1.2s) - Quelle: Trading API, Sell API");
    }

    #[tokio::test]
    async fn test_batch_start_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/offers/sync-batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "message": "läuft bereits"
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).start_batch_sync().await.unwrap_err();
        assert_eq!(err.to_string(), "läuft bereits");
    }

    #[test]
    fn working_summary_without_new_offers_uses_note() {
        let report = SyncWorkingReport {
            success: true,
            message: Some("Keine neuen Angebote".into()),
            processing_time: Some("0.4s".into()),
            note: Some("Später erneut versuchen".into()),
            ..SyncWorkingReport::default()
        };
        assert_eq!(
            report.summary(),
            "Keine neuen Angebote (0.4s). Später erneut versuchen"
        );
    }
}
