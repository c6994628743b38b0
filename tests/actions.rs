use chrono::Utc;
use offerdesk::api::BotClient;
use offerdesk::batch::PollConfig;
use offerdesk::domain::{LogEntry, NegotiationRule, Offer, OfferResponse, ResponseAction};
use offerdesk::export;
use offerdesk::ui::state::{lock, BatchView, RespondDialog, ToastKind};
use offerdesk::ui::{ActionContext, ActionOptions, AppState, Command};
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context(server: &MockServer, export_dir: &Path) -> ActionContext {
    let client = BotClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    ActionContext {
        client,
        state: Arc::new(Mutex::new(AppState::new(server.uri(), Duration::from_secs(30)))),
        options: ActionOptions {
            poll: PollConfig {
                interval: Duration::from_millis(20),
                max_polls: 20,
            },
            progress_linger: Duration::from_secs(5),
            export_dir: export_dir.to_path_buf(),
        },
        shutdown: CancellationToken::new(),
    }
}

async fn mount_stats(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_offers": 4, "pending_offers": 1, "accepted_offers": 2,
            "rejected_offers": 1, "countered_offers": 0, "success_rate": 50.0
        })))
        .mount(server)
        .await;
}

fn toast_texts(ctx: &ActionContext, kind: ToastKind) -> Vec<String> {
    lock(&ctx.state)
        .toasts
        .iter()
        .filter(|t| t.kind == kind)
        .map(|t| t.text.clone())
        .collect()
}

#[tokio::test]
async fn toggling_a_rule_reloads_the_new_state() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_stats(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/negotiation-rules/4"))
        .and(body_json(json!({"is_active": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/negotiation-rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rules": [{"id": 4, "name": "Standard", "is_active": false}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server, dir.path());
    ctx.execute(Command::ToggleRule {
        rule_id: "4".to_string(),
        is_active: false,
    })
    .await;

    let state = lock(&ctx.state);
    assert_eq!(state.rules.rules.len(), 1);
    assert!(!state.rules.rules[0].is_active);
    assert_eq!(state.stats.total_offers, 4);
}

#[tokio::test]
async fn deleting_an_active_rule_sends_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = context(&server, dir.path());
    let rule = NegotiationRule {
        id: Some("9".to_string()),
        name: "Standard".to_string(),
        is_active: true,
        ..NegotiationRule::default()
    };
    ctx.execute(Command::DeleteRule(rule)).await;

    assert_eq!(
        toast_texts(&ctx, ToastKind::Error),
        ["Aktive Regeln können nicht gelöscht werden"]
    );
}

#[tokio::test]
async fn batch_sync_runs_to_completion() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_stats(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/offers/sync-batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Batch-Sync gestartet",
            "status": {"active": true, "total_items": 10, "processed_items": 0}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/offers/sync-batch/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"active": true, "total_items": 10, "processed_items": 5}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/offers/sync-batch/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"active": false, "total_items": 10, "processed_items": 10,
                       "found_offers": 2, "errors": 0}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/offers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "offers": [{"id": 1, "status": "pending"}, {"id": 2, "status": "pending"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server, dir.path());
    ctx.execute(Command::StartBatchSync).await;

    let status_polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/offers/sync-batch/status")
        .count();
    assert_eq!(status_polls, 2);

    let state = lock(&ctx.state);
    let batch = state.offers.batch.as_ref().unwrap();
    assert!(!batch.running);
    assert!(batch.hide_at.is_some());
    assert_eq!(batch.status.progress_pct(), 100);
    assert_eq!(state.offers.offers.len(), 2);
    assert!(state
        .toasts
        .iter()
        .any(|t| t.text == "Batch-Sync abgeschlossen! 2 Best Offers gefunden, 0 Fehler"));
}

#[tokio::test]
async fn second_batch_start_is_refused() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path("/api/offers/sync-batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = context(&server, dir.path());
    lock(&ctx.state).offers.batch = Some(BatchView {
        running: true,
        ..BatchView::default()
    });
    ctx.execute(Command::StartBatchSync).await;

    assert_eq!(toast_texts(&ctx, ToastKind::Info), ["Batch-Sync läuft bereits"]);
}

#[tokio::test]
async fn failed_batch_start_releases_the_slot() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path("/api/offers/sync-batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "message": "Kein Token"
        })))
        .mount(&server)
        .await;

    let ctx = context(&server, dir.path());
    ctx.execute(Command::StartBatchSync).await;

    let state = lock(&ctx.state);
    assert!(state.offers.batch.is_none());
    assert_eq!(state.toasts.len(), 1);
    assert!(state.toasts[0]
        .text
        .starts_with("Batch-Sync konnte nicht gestartet werden:"));
}

#[tokio::test]
async fn export_writes_header_and_one_line_per_entry() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&server, dir.path());

    let logs: Vec<LogEntry> = serde_json::from_value(json!([
        {"id": 1, "timestamp": "2024-03-01T10:00:00", "action": "received",
         "offer_title": "Lampe; Messing", "offer_price": 45.5},
        {"id": 2, "timestamp": "2024-03-02T09:00:00", "action": "ai_analyzed",
         "details": "Zeile eins\nZeile zwei"},
        {"id": 3, "timestamp": "2024-03-03T08:00:00", "action": "response_sent"}
    ]))
    .unwrap();
    lock(&ctx.state).logs.set_logs(logs);

    ctx.execute(Command::ExportLogs).await;

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(name, export::file_name(Utc::now().date_naive()));

    let contents = std::fs::read_to_string(&files[0]).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|l| l.split(';').count() == 7));
    assert_eq!(toast_texts(&ctx, ToastKind::Success).len(), 1);
}

#[tokio::test]
async fn answered_offer_closes_the_dialog() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_stats(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/offers/7/respond"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "message": "Gegenangebot gesendet"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/offers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"offers": []})))
        .mount(&server)
        .await;

    let ctx = context(&server, dir.path());
    let offer: Offer = serde_json::from_value(json!({"id": 7, "status": "pending"})).unwrap();
    lock(&ctx.state).offers.respond = Some(RespondDialog::for_offer(&offer));

    let response = OfferResponse::manual(ResponseAction::Counter, Some(42.0), "Wie wäre es mit 42?")
        .unwrap();
    ctx.execute(Command::RespondToOffer {
        offer_id: "7".to_string(),
        response,
    })
    .await;

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = requests
        .iter()
        .find(|r| r.url.path() == "/api/offers/7/respond")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(sent["counter_price"], json!(42.0));
    assert_eq!(sent["manual_override"], json!(true));

    let state = lock(&ctx.state);
    assert!(state.offers.respond.is_none());
    assert_eq!(state.toasts[0].text, "Gegenangebot gesendet");
}

#[tokio::test]
async fn slow_offer_load_does_not_overwrite_a_newer_one() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/api/offers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"offers": [{"id": 1, "status": "pending"}]}))
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/offers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "offers": [{"id": 2, "status": "pending"}, {"id": 3, "status": "pending"}]
        })))
        .mount(&server)
        .await;

    let ctx = context(&server, dir.path());
    let slow = {
        let ctx = ctx.clone();
        tokio::spawn(async move { ctx.execute(Command::LoadOffers).await })
    };
    while server.received_requests().await.unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    ctx.execute(Command::LoadOffers).await;
    slow.await.unwrap();

    let state = lock(&ctx.state);
    let ids: Vec<&str> = state.offers.offers.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["2", "3"]);
    assert!(!state.offers.loading);
}
