use super::{rejection, ApiError, BotClient};
use crate::domain::{wire, ConnectionTest, Service, Settings};
use log::warn;
use reqwest::Method;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsReply {
    #[serde(deserialize_with = "wire::lenient_bool")]
    success: bool,
    settings: Option<Settings>,
    message: Option<String>,
    error: Option<String>,
}

impl BotClient {
    pub async fn get_settings(&self) -> Result<Settings, ApiError> {
        let reply: SettingsReply = self.get(self.endpoint(&["settings"])).await?;
        match reply {
            SettingsReply { success: true, settings: Some(settings), .. } => Ok(settings),
            SettingsReply { success: true, .. } => Err(ApiError::MissingField("settings")),
            SettingsReply { error, message, .. } => Err(rejection(error, message)),
        }
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["settings"]);
        let reply: SettingsReply = self.send(Method::POST, url, Some(settings)).await?;
        if reply.success {
            Ok(reply.message)
        } else {
            Err(rejection(reply.error, reply.message))
        }
    }

    /// Check the stored credentials of `service`. Never fails: transport and
    /// decode problems are reported as a failed test.
    pub async fn test_connection(&self, service: Service, settings: &Settings) -> ConnectionTest {
        let url = self.endpoint(&[service.endpoint()]);
        match self.send::<_, ConnectionTest>(Method::POST, url, Some(settings)).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{} connection test failed: {}", service.label(), e);
                ConnectionTest::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BotClient {
        BotClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_load_and_save_round_trip() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "settings": {"ebay_app_id": "app", "auto_mode": "true", "region": "DE"}
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/settings"))
            .and(body_json(json!({
                "ebay_app_id": "app",
                "ebay_dev_id": "",
                "ebay_cert_id": "",
                "ebay_auth_token": "",
                "openai_api_key": "",
                "use_sandbox": "true",
                "auto_mode": "false",
                "region": "DE"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "message": "Gespeichert"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let mut settings = client.get_settings().await.unwrap();
        assert!(settings.flag("auto_mode"));
        settings.toggle_flag("auto_mode");
        let message = client.save_settings(&settings).await.unwrap();
        assert_eq!(message.as_deref(), Some("Gespeichert"));
    }

    #[tokio::test]
    async fn test_connection_reports_backend_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/test-openai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "message": "Ungültiger API Key"
            })))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .test_connection(Service::OpenAi, &Settings::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.message, "Ungültiger API Key");
    }

    #[tokio::test]
    async fn test_connection_transport_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/test-ebay"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .test_connection(Service::Ebay, &Settings::default())
            .await;
        assert_eq!(result, ConnectionTest::failed());
    }
}
