//! Commands issued by the TUI and their async execution.
//!
//! Each command runs in its own task and only writes the slice of
//! [`AppState`](crate::ui::AppState) that belongs to the panel issuing it,
//! plus toasts and the shared stats.

use chrono::Utc;
use crate::api::{ApiError, BotClient};
use crate::batch::{poll_until_idle, PollConfig, PollOutcome};
use crate::domain::timefmt::now_local;
use crate::domain::{LogEntry, NegotiationRule, OfferResponse, Service, Settings};
use crate::export;
use crate::ui::state::{lock, BatchView, SharedState};
use log::{info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    RefreshStats,
    CheckHealth,
    LoadOffers,
    AnalyzeOffer(String),
    RespondToOffer {
        offer_id: String,
        response: OfferResponse,
    },
    SyncSimple,
    SyncWorking,
    StartBatchSync,
    StopBatchSync,
    LoadLogs,
    ExportLogs,
    LoadRules,
    /// Create when the draft has no id, update otherwise.
    SaveRule(NegotiationRule),
    ToggleRule {
        rule_id: String,
        is_active: bool,
    },
    DeleteRule(NegotiationRule),
    LoadSettings,
    SaveSettings(Settings),
    TestConnection {
        service: Service,
        settings: Settings,
    },
}

#[derive(Clone, Debug)]
pub struct ActionOptions {
    pub poll: PollConfig,
    pub progress_linger: Duration,
    pub export_dir: PathBuf,
}

/// Everything a command needs. Cheap to clone into a task.
#[derive(Clone)]
pub struct ActionContext {
    pub client: BotClient,
    pub state: SharedState,
    pub options: ActionOptions,
    /// Cancelled on quit; batch pollers hang off a child token.
    pub shutdown: CancellationToken,
}

fn offers_error(err: &ApiError) -> String {
    match err {
        ApiError::MissingField(_) => "Unbekanntes Datenformat".to_string(),
        other => other.user_message("Fehler beim Laden der Angebote"),
    }
}

impl ActionContext {
    pub async fn execute(&self, command: Command) {
        match command {
            Command::RefreshStats => self.refresh_stats().await,
            Command::CheckHealth => self.check_health().await,
            Command::LoadOffers => self.load_offers().await,
            Command::AnalyzeOffer(offer_id) => self.analyze_offer(offer_id).await,
            Command::RespondToOffer { offer_id, response } => {
                self.respond_to_offer(offer_id, response).await
            }
            Command::SyncSimple => self.sync_simple().await,
            Command::SyncWorking => self.sync_working().await,
            Command::StartBatchSync => self.start_batch_sync().await,
            Command::StopBatchSync => self.stop_batch_sync().await,
            Command::LoadLogs => self.load_logs().await,
            Command::ExportLogs => self.export_logs().await,
            Command::LoadRules => self.load_rules().await,
            Command::SaveRule(draft) => self.save_rule(draft).await,
            Command::ToggleRule { rule_id, is_active } => {
                self.toggle_rule(rule_id, is_active).await
            }
            Command::DeleteRule(rule) => self.delete_rule(rule).await,
            Command::LoadSettings => self.load_settings().await,
            Command::SaveSettings(settings) => self.save_settings(settings).await,
            Command::TestConnection { service, settings } => {
                self.test_connection(service, settings).await
            }
        }
    }

    async fn refresh_stats(&self) {
        match self.client.get_stats().await {
            Ok(stats) => lock(&self.state).update_stats(stats),
            Err(e) => {
                warn!("Stats refresh failed: {}", e);
                lock(&self.state).stats_error = Some(e.to_string());
            }
        }
    }

    async fn check_health(&self) {
        let health = match self.client.health().await {
            Ok(health) => Some(health),
            Err(e) => {
                warn!("Health check failed: {}", e);
                None
            }
        };
        lock(&self.state).health = health;
    }

    // Offers

    async fn load_offers(&self) {
        let (filter, generation) = {
            let mut state = lock(&self.state);
            state.offers.loading = true;
            state.offers.load_generation += 1;
            (state.offers.filter, state.offers.load_generation)
        };
        let result = self.client.list_offers(filter).await;

        let mut state = lock(&self.state);
        // A newer load owns the table and the loading flag now
        if state.offers.load_generation != generation {
            return;
        }
        state.offers.loading = false;
        match result {
            Ok(offers) => state.offers.set_offers(offers),
            Err(e) => {
                warn!("Loading offers failed: {}", e);
                state.error(offers_error(&e));
            }
        }
    }

    async fn analyze_offer(&self, offer_id: String) {
        lock(&self.state).offers.analyzing = Some(offer_id.clone());
        let result = self.client.analyze_offer(&offer_id).await;
        {
            let mut state = lock(&self.state);
            state.offers.analyzing = None;
            match &result {
                Ok(message) => state.success(
                    message
                        .clone()
                        .unwrap_or_else(|| "KI-Analyse abgeschlossen".to_string()),
                ),
                Err(e) => state.error(e.user_message("Fehler bei der KI-Analyse")),
            }
        }
        if result.is_ok() {
            self.load_offers().await;
            self.refresh_stats().await;
        }
    }

    async fn respond_to_offer(&self, offer_id: String, response: OfferResponse) {
        let result = self.client.respond_to_offer(&offer_id, &response).await;
        {
            let mut state = lock(&self.state);
            let dialog_open = state
                .offers
                .respond
                .as_ref()
                .is_some_and(|d| d.offer_id == offer_id);
            match &result {
                Ok(message) => {
                    if dialog_open {
                        state.offers.respond = None;
                    }
                    state.success(
                        message
                            .clone()
                            .unwrap_or_else(|| "Antwort erfolgreich gesendet".to_string()),
                    );
                }
                Err(e) => {
                    let text = e.user_message("Fehler beim Senden der Antwort");
                    if let Some(dialog) = state.offers.respond.as_mut().filter(|_| dialog_open) {
                        dialog.submitting = false;
                        dialog.error = Some(text.clone());
                    }
                    state.error(text);
                }
            }
        }
        if result.is_ok() {
            self.load_offers().await;
            self.refresh_stats().await;
        }
    }

    async fn sync_simple(&self) {
        lock(&self.state).offers.syncing = true;
        let result = self.client.sync_simple().await;
        {
            let mut state = lock(&self.state);
            state.offers.syncing = false;
            match &result {
                Ok(report) => state.success(report.summary()),
                Err(e) => state.error(e.user_message("Fehler bei der Synchronisation")),
            }
        }
        if result.is_ok() {
            self.load_offers().await;
            self.refresh_stats().await;
        }
    }

    async fn sync_working(&self) {
        lock(&self.state).offers.syncing = true;
        let result = self.client.sync_working().await;
        {
            let mut state = lock(&self.state);
            state.offers.syncing = false;
            match &result {
                Ok(report) => state.success(report.summary()),
                Err(e) => state.error(e.user_message("Fehler bei der Synchronisation")),
            }
        }
        if result.is_ok() {
            self.load_offers().await;
            self.refresh_stats().await;
        }
    }

    async fn start_batch_sync(&self) {
        {
            let mut state = lock(&self.state);
            if state.offers.batch_running() {
                state.info("Batch-Sync läuft bereits");
                return;
            }
            // Claim the slot before the request so a second start is refused
            state.offers.batch = Some(BatchView {
                running: true,
                ..BatchView::default()
            });
        }

        let start = match self.client.start_batch_sync().await {
            Ok(start) => start,
            Err(e) => {
                let mut state = lock(&self.state);
                state.offers.batch = None;
                let reason = match &e {
                    ApiError::Rejected(msg) => msg.clone(),
                    other => other.to_string(),
                };
                state.error(format!("Batch-Sync konnte nicht gestartet werden: {}", reason));
                return;
            }
        };
        {
            let mut state = lock(&self.state);
            if let Some(batch) = state.offers.batch.as_mut() {
                batch.status = start.status.clone().unwrap_or_default();
            }
            state.info(
                start
                    .message
                    .clone()
                    .unwrap_or_else(|| "Batch-Sync gestartet".to_string()),
            );
        }

        let cancel = self.shutdown.child_token();
        let outcome = poll_until_idle(&self.client, self.options.poll, &cancel, |status| {
            if let Some(batch) = lock(&self.state).offers.batch.as_mut() {
                batch.status = status.clone();
            }
        })
        .await;

        let finished = {
            let mut state = lock(&self.state);
            let hide_at = Instant::now() + self.options.progress_linger;
            if let Some(batch) = state.offers.batch.as_mut() {
                batch.running = false;
                batch.hide_at = Some(hide_at);
            }
            match outcome {
                PollOutcome::Finished(status) => {
                    state.success(status.completion_message());
                    true
                }
                PollOutcome::Exhausted { polls } => {
                    state.error(format!(
                        "Batch-Sync Status nach {} Abfragen nicht abgeschlossen",
                        polls
                    ));
                    false
                }
                PollOutcome::Cancelled => false,
            }
        };
        if finished {
            self.load_offers().await;
            self.refresh_stats().await;
        }
    }

    async fn stop_batch_sync(&self) {
        let result = self.client.stop_batch_sync().await;
        let mut state = lock(&self.state);
        match result {
            // The poller keeps running until the backend reports inactive
            Ok(_) => state.info("Batch-Synchronisierung gestoppt"),
            Err(e) => state.error(e.user_message("Fehler beim Stoppen")),
        }
    }

    // Logs

    async fn load_logs(&self) {
        lock(&self.state).logs.loading = true;
        let result = self.client.list_logs().await;
        let mut state = lock(&self.state);
        state.logs.loading = false;
        match result {
            Ok(logs) => state.logs.set_logs(logs),
            Err(e) => {
                warn!("Loading logs failed: {}", e);
                state.error(e.user_message("Fehler beim Laden der Protokolle"));
            }
        }
    }

    async fn export_logs(&self) {
        let now = now_local();
        let rows: Vec<LogEntry> = {
            let state = lock(&self.state);
            state.logs.visible(now).into_iter().cloned().collect()
        };
        let dir = self.options.export_dir.clone();
        let count = rows.len();
        let date = Utc::now().date_naive();
        let result =
            tokio::task::spawn_blocking(move || export::write_csv(&dir, date, &rows)).await;

        let mut state = lock(&self.state);
        match result {
            Ok(Ok(path)) => {
                info!("Exported {} log entries to {}", count, path.display());
                state.success(format!("{} Einträge exportiert nach {}", count, path.display()));
            }
            Ok(Err(e)) => {
                warn!("Log export failed: {:#}", e);
                state.error(format!("{:#}", e));
            }
            Err(e) => state.error(format!("Export fehlgeschlagen: {}", e)),
        }
    }

    // Rules

    async fn load_rules(&self) {
        lock(&self.state).rules.loading = true;
        let result = self.client.list_rules().await;
        let mut state = lock(&self.state);
        state.rules.loading = false;
        match result {
            Ok(rules) => state.rules.set_rules(rules),
            Err(e) => {
                warn!("Loading rules failed: {}", e);
                state.error(e.user_message("Fehler beim Laden der Regeln"));
            }
        }
    }

    async fn save_rule(&self, draft: NegotiationRule) {
        let result = match draft.id.as_deref() {
            Some(id) => self.client.update_rule(id, &draft).await,
            None => self.client.create_rule(&draft).await,
        };
        {
            let mut state = lock(&self.state);
            match &result {
                Ok(message) => {
                    state.rules.editor = None;
                    let fallback = if draft.id.is_some() {
                        "Regel aktualisiert"
                    } else {
                        "Regel erstellt"
                    };
                    state.success(message.clone().unwrap_or_else(|| fallback.to_string()));
                }
                Err(e) => {
                    let text = e.user_message("Fehler beim Speichern der Regel");
                    if let Some(editor) = state.rules.editor.as_mut() {
                        editor.saving = false;
                        editor.error = Some(text.clone());
                    }
                    state.error(text);
                }
            }
        }
        if result.is_ok() {
            self.load_rules().await;
            self.refresh_stats().await;
        }
    }

    async fn toggle_rule(&self, rule_id: String, is_active: bool) {
        let result = self.client.set_rule_active(&rule_id, is_active).await;
        if let Err(e) = &result {
            lock(&self.state).error(e.user_message("Fehler beim Ändern der Regel"));
            return;
        }
        if let Ok(Some(message)) = result {
            lock(&self.state).success(message);
        }
        self.load_rules().await;
        self.refresh_stats().await;
    }

    async fn delete_rule(&self, rule: NegotiationRule) {
        let result = self.client.delete_rule(&rule).await;
        match result {
            Ok(message) => {
                lock(&self.state).success(message.unwrap_or_else(|| "Regel gelöscht".to_string()));
                self.load_rules().await;
                self.refresh_stats().await;
            }
            Err(e) => {
                lock(&self.state).error(e.user_message("Fehler beim Löschen der Regel"));
            }
        }
    }

    // Settings

    async fn load_settings(&self) {
        lock(&self.state).settings.loading = true;
        let result = self.client.get_settings().await;
        let mut state = lock(&self.state);
        state.settings.loading = false;
        match result {
            Ok(settings) => {
                state.settings.settings = settings;
                state.settings.loaded = true;
                state.settings.dirty = false;
            }
            Err(e) => {
                warn!("Loading settings failed: {}", e);
                state.error(e.user_message("Fehler beim Laden der Einstellungen"));
            }
        }
    }

    async fn save_settings(&self, settings: Settings) {
        lock(&self.state).settings.saving = true;
        let result = self.client.save_settings(&settings).await;
        let mut state = lock(&self.state);
        state.settings.saving = false;
        match result {
            Ok(message) => {
                // Edits made while the request ran stay dirty
                if state.settings.settings == settings {
                    state.settings.dirty = false;
                }
                state.success(message.unwrap_or_else(|| "Einstellungen gespeichert".to_string()));
            }
            Err(e) => state.error(e.user_message("Fehler beim Speichern der Einstellungen")),
        }
    }

    async fn test_connection(&self, service: Service, settings: Settings) {
        lock(&self.state).settings.testing = Some(service);
        let result = self.client.test_connection(service, &settings).await;
        let mut state = lock(&self.state);
        state.settings.testing = None;
        let text = format!("{}: {}", service.label(), result.message);
        if result.success {
            state.success(text);
        } else {
            state.error(text);
        }
        state.settings.tests.insert(service, result);
    }
}
