use super::{ActionReply, ApiError, BotClient};
use crate::domain::{NegotiationRule, ValidationError};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct RulesReply {
    #[serde(default)]
    rules: Option<Vec<NegotiationRule>>,
    #[serde(default)]
    error: Option<String>,
}

impl BotClient {
    pub async fn list_rules(&self) -> Result<Vec<NegotiationRule>, ApiError> {
        let reply: RulesReply = self.get(self.endpoint(&["negotiation-rules"])).await?;
        match reply {
            RulesReply { rules: Some(rules), .. } => Ok(rules),
            RulesReply { error: Some(error), .. } => Err(ApiError::Rejected(error)),
            _ => Err(ApiError::MissingField("rules")),
        }
    }

    pub async fn create_rule(&self, draft: &NegotiationRule) -> Result<Option<String>, ApiError> {
        draft.validate()?;
        let url = self.endpoint(&["negotiation-rules"]);
        let reply: ActionReply = self.send(Method::POST, url, Some(draft)).await?;
        reply.into_result()
    }

    /// Full update of an existing rule with the draft's values.
    pub async fn update_rule(
        &self,
        rule_id: &str,
        draft: &NegotiationRule,
    ) -> Result<Option<String>, ApiError> {
        draft.validate()?;
        let url = self.endpoint(&["negotiation-rules", rule_id]);
        let reply: ActionReply = self.send(Method::PUT, url, Some(draft)).await?;
        reply.into_result()
    }

    /// Partial update carrying only the activation flag.
    pub async fn set_rule_active(
        &self,
        rule_id: &str,
        is_active: bool,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["negotiation-rules", rule_id]);
        let body = json!({ "is_active": is_active });
        let reply: ActionReply = self.send(Method::PUT, url, Some(&body)).await?;
        reply.into_result()
    }

    /// Delete a rule. Active rules are refused without contacting the backend.
    pub async fn delete_rule(&self, rule: &NegotiationRule) -> Result<Option<String>, ApiError> {
        if !rule.can_delete() {
            return Err(ValidationError::RuleIsActive.into());
        }
        let id = rule.id.as_deref().ok_or(ApiError::MissingField("id"))?;
        let url = self.endpoint(&["negotiation-rules", id]);
        let reply: ActionReply = self.send::<Value, _>(Method::DELETE, url, None).await?;
        reply.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BotClient {
        BotClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_toggle_sends_only_the_flag() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/negotiation-rules/4"))
            .and(body_json(json!({"is_active": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let message = client(&mock_server).set_rule_active("4", false).await.unwrap();
        assert_eq!(message, None);
    }

    #[tokio::test]
    async fn test_active_rule_is_not_deleted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(0)
            .mount(&mock_server)
            .await;

        let rule = NegotiationRule {
            id: Some("9".into()),
            name: "Standard".into(),
            is_active: true,
            ..NegotiationRule::default()
        };
        let err = client(&mock_server).delete_rule(&rule).await.unwrap_err();
        assert_eq!(err.to_string(), ValidationError::RuleIsActive.to_string());
    }

    #[tokio::test]
    async fn test_inactive_rule_is_deleted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/negotiation-rules/9"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "message": "Regel gelöscht"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let rule = NegotiationRule {
            id: Some("9".into()),
            name: "Alt".into(),
            ..NegotiationRule::default()
        };
        let message = client(&mock_server).delete_rule(&rule).await.unwrap();
        assert_eq!(message.as_deref(), Some("Regel gelöscht"));
    }

    #[tokio::test]
    async fn test_create_posts_full_draft_without_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/negotiation-rules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let draft = NegotiationRule {
            name: "Wochenende".into(),
            ..NegotiationRule::default()
        };
        client(&mock_server).create_rule(&draft).await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["name"], "Wochenende");
        assert_eq!(body["rule_type"], "general");
        assert_eq!(body["max_counter_offers"], 2);
    }

    #[tokio::test]
    async fn test_invalid_draft_is_not_sent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .create_rule(&NegotiationRule::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Invalid(ValidationError::EmptyRuleName)));
    }

    #[tokio::test]
    async fn test_list_rules() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/negotiation-rules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rules": [{"id": 1, "name": "A", "is_active": true}, {"id": 2, "name": "B"}]
            })))
            .mount(&mock_server)
            .await;

        let rules = client(&mock_server).list_rules().await.unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].is_active);
        assert!(rules[1].can_delete());
    }
}
