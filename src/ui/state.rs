use crate::api::Health;
use crate::domain::log_entry::LogFilter;
use crate::domain::money::parse_price;
use crate::domain::rule::OPEN_ENDED_DAYS;
use crate::domain::{
    BatchSyncStatus, ConnectionTest, DashboardStats, LogEntry, NegotiationRule, Offer,
    OfferFilter, ResponseAction, Service, Settings,
};
use crate::ui::input::TextInput;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Minimum history size to ensure some data is always available
const MIN_HISTORY_SIZE: usize = 60;

/// Toasts kept on screen at once; older ones are dropped.
const MAX_TOASTS: usize = 4;

pub type SharedState = Arc<Mutex<AppState>>;

/// Lock the shared state. A panic while holding the lock leaves the data
/// usable for rendering, so poisoning is ignored.
pub fn lock(state: &SharedState) -> MutexGuard<'_, AppState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Offers,
    Logs,
    Rules,
    Settings,
    Stats,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Offers, Tab::Logs, Tab::Rules, Tab::Settings, Tab::Stats];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Offers => "Angebote",
            Tab::Logs => "Protokoll",
            Tab::Rules => "Regeln",
            Tab::Settings => "Einstellungen",
            Tab::Stats => "Statistiken",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
    pub expires_at: Instant,
}

/// Move a selection index by `delta`, clamped to `len`.
pub fn step(selected: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = selected as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

// Offers

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RespondField {
    #[default]
    Action,
    Price,
    Message,
}

impl RespondField {
    pub fn next(self) -> Self {
        match self {
            RespondField::Action => RespondField::Price,
            RespondField::Price => RespondField::Message,
            RespondField::Message => RespondField::Action,
        }
    }
}

/// Manual accept/reject/counter form for one offer.
#[derive(Clone, Debug)]
pub struct RespondDialog {
    pub offer_id: String,
    pub offer_title: String,
    pub action: ResponseAction,
    pub price: TextInput,
    pub message: TextInput,
    pub focus: RespondField,
    pub submitting: bool,
    pub error: Option<String>,
}

impl RespondDialog {
    pub fn for_offer(offer: &Offer) -> Self {
        Self {
            offer_id: offer.id.clone(),
            offer_title: offer.title().to_string(),
            action: ResponseAction::Accept,
            price: TextInput::default(),
            message: TextInput::default(),
            focus: RespondField::Action,
            submitting: false,
            error: None,
        }
    }

    pub fn cycle_action(&mut self) {
        self.action = match self.action {
            ResponseAction::Accept => ResponseAction::Reject,
            ResponseAction::Reject => ResponseAction::Counter,
            ResponseAction::Counter => ResponseAction::Accept,
        };
    }

    pub fn counter_price(&self) -> Option<f64> {
        parse_price(self.price.value())
    }
}

/// Batch progress block under the offers table.
#[derive(Clone, Debug, Default)]
pub struct BatchView {
    pub status: BatchSyncStatus,
    /// A poller is attached; cleared when it finishes or gives up.
    pub running: bool,
    pub hide_at: Option<Instant>,
}

#[derive(Clone, Debug, Default)]
pub struct OffersState {
    pub filter: OfferFilter,
    pub offers: Vec<Offer>,
    pub selected: usize,
    pub loaded: bool,
    pub loading: bool,
    pub syncing: bool,
    /// Offer currently being analyzed.
    pub analyzing: Option<String>,
    pub show_detail: bool,
    pub respond: Option<RespondDialog>,
    pub batch: Option<BatchView>,
    /// Bumped by every offer load, only the latest one may store its result.
    pub load_generation: u64,
}

impl OffersState {
    pub fn selected_offer(&self) -> Option<&Offer> {
        self.offers.get(self.selected)
    }

    pub fn set_offers(&mut self, offers: Vec<Offer>) {
        self.offers = offers;
        self.selected = self.selected.min(self.offers.len().saturating_sub(1));
        self.loaded = true;
    }

    pub fn batch_running(&self) -> bool {
        self.batch.as_ref().is_some_and(|b| b.running)
    }
}

// Logs

#[derive(Clone, Debug, Default)]
pub struct LogsState {
    pub logs: Vec<LogEntry>,
    pub filter: LogFilter,
    pub selected: usize,
    pub loaded: bool,
    pub loading: bool,
    /// Search field while it has focus.
    pub search_input: Option<TextInput>,
    pub show_detail: bool,
}

impl LogsState {
    pub fn visible(&self, now: NaiveDateTime) -> Vec<&LogEntry> {
        self.filter.apply(&self.logs, now)
    }

    pub fn set_logs(&mut self, logs: Vec<LogEntry>) {
        self.logs = logs;
        self.selected = 0;
        self.loaded = true;
    }
}

// Rules

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleField {
    Name,
    Description,
    RuleType,
    TimeRangeStart,
    TimeRangeEnd,
    MinPrice,
    AutoAccept,
    AutoDecline,
    MaxCounters,
    Tone,
    CounterPercentage,
    AutoExecute,
    AutoCounter,
    Active,
}

impl RuleField {
    pub const ALL: [RuleField; 14] = [
        RuleField::Name,
        RuleField::Description,
        RuleField::RuleType,
        RuleField::TimeRangeStart,
        RuleField::TimeRangeEnd,
        RuleField::MinPrice,
        RuleField::AutoAccept,
        RuleField::AutoDecline,
        RuleField::MaxCounters,
        RuleField::Tone,
        RuleField::CounterPercentage,
        RuleField::AutoExecute,
        RuleField::AutoCounter,
        RuleField::Active,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RuleField::Name => "Name",
            RuleField::Description => "Beschreibung",
            RuleField::RuleType => "Regeltyp",
            RuleField::TimeRangeStart => "Ab Tag",
            RuleField::TimeRangeEnd => "Bis Tag (999 = offen)",
            RuleField::MinPrice => "Mindestpreis %",
            RuleField::AutoAccept => "Auto-Annahme ab %",
            RuleField::AutoDecline => "Auto-Ablehnung unter %",
            RuleField::MaxCounters => "Max. Gegenangebote",
            RuleField::Tone => "Verhandlungston",
            RuleField::CounterPercentage => "Gegenangebot %",
            RuleField::AutoExecute => "Automatisch ausführen",
            RuleField::AutoCounter => "Automatische Gegenangebote",
            RuleField::Active => "Aktiv",
        }
    }

    /// Fields edited through a text input; the rest cycle or toggle.
    pub fn is_text(self) -> bool {
        !matches!(
            self,
            RuleField::RuleType
                | RuleField::Tone
                | RuleField::AutoExecute
                | RuleField::AutoCounter
                | RuleField::Active
        )
    }

    pub fn value(self, rule: &NegotiationRule) -> String {
        let flag = |b: bool| (if b { "ja" } else { "nein" }).to_string();
        match self {
            RuleField::Name => rule.name.clone(),
            RuleField::Description => rule.description.clone(),
            RuleField::RuleType => rule.rule_type.label().to_string(),
            RuleField::TimeRangeStart => rule.time_range_start.to_string(),
            RuleField::TimeRangeEnd => rule.time_range_end.to_string(),
            RuleField::MinPrice => rule.min_price_percentage.to_string(),
            RuleField::AutoAccept => rule.auto_accept_percentage.to_string(),
            RuleField::AutoDecline => rule.auto_decline_percentage.to_string(),
            RuleField::MaxCounters => rule.max_counter_offers.to_string(),
            RuleField::Tone => rule.negotiation_tone.label().to_string(),
            RuleField::CounterPercentage => rule.counter_offer_percentage.to_string(),
            RuleField::AutoExecute => flag(rule.auto_execute_enabled),
            RuleField::AutoCounter => flag(rule.auto_counter_enabled),
            RuleField::Active => flag(rule.is_active),
        }
    }

    /// Cycle or toggle a non-text field.
    pub fn advance(self, rule: &mut NegotiationRule) {
        match self {
            RuleField::RuleType => rule.rule_type = rule.rule_type.next(),
            RuleField::Tone => rule.negotiation_tone = rule.negotiation_tone.next(),
            RuleField::AutoExecute => rule.auto_execute_enabled = !rule.auto_execute_enabled,
            RuleField::AutoCounter => rule.auto_counter_enabled = !rule.auto_counter_enabled,
            RuleField::Active => rule.is_active = !rule.is_active,
            _ => {}
        }
    }

    /// Store edited text into the draft.
    pub fn apply(self, rule: &mut NegotiationRule, text: &str) -> Result<(), String> {
        let text = text.trim();
        let percent = || -> Result<f64, String> {
            parse_price(text).ok_or_else(|| format!("{}: keine Zahl", self.label()))
        };
        let days = || -> Result<u32, String> {
            if text.is_empty() && self == RuleField::TimeRangeEnd {
                return Ok(OPEN_ENDED_DAYS);
            }
            text.parse::<u32>()
                .map_err(|_| format!("{}: keine ganze Zahl", self.label()))
        };
        match self {
            RuleField::Name => rule.name = text.to_string(),
            RuleField::Description => rule.description = text.to_string(),
            RuleField::TimeRangeStart => rule.time_range_start = days()?,
            RuleField::TimeRangeEnd => rule.time_range_end = days()?,
            RuleField::MinPrice => rule.min_price_percentage = percent()?,
            RuleField::AutoAccept => rule.auto_accept_percentage = percent()?,
            RuleField::AutoDecline => rule.auto_decline_percentage = percent()?,
            RuleField::CounterPercentage => rule.counter_offer_percentage = percent()?,
            RuleField::MaxCounters => {
                rule.max_counter_offers = text
                    .parse()
                    .map_err(|_| format!("{}: keine ganze Zahl", self.label()))?
            }
            RuleField::RuleType
            | RuleField::Tone
            | RuleField::AutoExecute
            | RuleField::AutoCounter
            | RuleField::Active => {}
        }
        Ok(())
    }
}

/// Create/edit form. `draft.id` is set when editing an existing rule.
#[derive(Clone, Debug)]
pub struct RuleEditor {
    pub draft: NegotiationRule,
    pub field: usize,
    pub input: Option<TextInput>,
    pub saving: bool,
    pub error: Option<String>,
}

impl RuleEditor {
    pub fn new_rule() -> Self {
        Self::edit(NegotiationRule::default())
    }

    pub fn edit(draft: NegotiationRule) -> Self {
        Self {
            draft,
            field: 0,
            input: None,
            saving: false,
            error: None,
        }
    }

    pub fn current_field(&self) -> RuleField {
        RuleField::ALL[self.field.min(RuleField::ALL.len() - 1)]
    }

    pub fn is_new(&self) -> bool {
        self.draft.id.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RulesState {
    pub rules: Vec<NegotiationRule>,
    pub selected: usize,
    pub loaded: bool,
    pub loading: bool,
    pub editor: Option<RuleEditor>,
    /// Rule waiting for delete confirmation.
    pub confirm_delete: Option<NegotiationRule>,
}

impl RulesState {
    pub fn selected_rule(&self) -> Option<&NegotiationRule> {
        self.rules.get(self.selected)
    }

    pub fn set_rules(&mut self, rules: Vec<NegotiationRule>) {
        self.rules = rules;
        self.selected = self.selected.min(self.rules.len().saturating_sub(1));
        self.loaded = true;
    }
}

// Settings

#[derive(Clone, Debug, Default)]
pub struct SettingsState {
    pub settings: Settings,
    pub selected: usize,
    pub loaded: bool,
    pub loading: bool,
    pub saving: bool,
    /// Unsaved local edits.
    pub dirty: bool,
    pub input: Option<TextInput>,
    pub reveal_secrets: bool,
    pub testing: Option<Service>,
    pub tests: BTreeMap<Service, ConnectionTest>,
}

impl SettingsState {
    pub fn selected_key(&self) -> Option<String> {
        self.settings.ordered_keys().into_iter().nth(self.selected)
    }
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub tab: Tab,
    pub base_url: String,
    pub stats: DashboardStats,
    pub stats_error: Option<String>,
    pub last_stats_update: Option<Instant>,
    pub health: Option<Health>,
    pub offers: OffersState,
    pub logs: LogsState,
    pub rules: RulesState,
    pub settings: SettingsState,
    pub toasts: Vec<Toast>,
    pub toast_ttl: Duration,
    pub should_quit: bool,

    // Dynamic history size based on terminal width
    history_size: usize,

    pub success_rate_history: VecDeque<u64>,
    pub pending_history: VecDeque<u64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            tab: Tab::default(),
            base_url: String::new(),
            stats: DashboardStats::default(),
            stats_error: None,
            last_stats_update: None,
            health: None,
            offers: OffersState::default(),
            logs: LogsState::default(),
            rules: RulesState::default(),
            settings: SettingsState::default(),
            toasts: Vec::new(),
            toast_ttl: Duration::from_secs(3),
            should_quit: false,
            history_size: MIN_HISTORY_SIZE,
            success_rate_history: VecDeque::new(),
            pending_history: VecDeque::new(),
        }
    }
}

impl AppState {
    pub fn new(base_url: impl Into<String>, toast_ttl: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            toast_ttl,
            ..Self::default()
        }
    }

    /// Update history size based on terminal width
    pub fn set_terminal_width(&mut self, width: u16) {
        self.history_size = (width as usize).max(MIN_HISTORY_SIZE);
    }

    fn trim_history<T>(history: &mut VecDeque<T>, max_size: usize) {
        while history.len() > max_size {
            history.pop_front();
        }
    }

    pub fn update_stats(&mut self, stats: DashboardStats) {
        let history_size = self.history_size;

        self.success_rate_history
            .push_back(stats.success_rate.max(0.0).round() as u64);
        Self::trim_history(&mut self.success_rate_history, history_size);

        self.pending_history.push_back(stats.pending_offers);
        Self::trim_history(&mut self.pending_history, history_size);

        self.stats = stats;
        self.stats_error = None;
        self.last_stats_update = Some(Instant::now());
    }

    pub fn toast(&mut self, kind: ToastKind, text: impl Into<String>) {
        self.toasts.push(Toast {
            kind,
            text: text.into(),
            expires_at: Instant::now() + self.toast_ttl,
        });
        if self.toasts.len() > MAX_TOASTS {
            let excess = self.toasts.len() - MAX_TOASTS;
            self.toasts.drain(..excess);
        }
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.toast(ToastKind::Success, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.toast(ToastKind::Error, text);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.toast(ToastKind::Info, text);
    }

    /// Drop expired toasts and hide a finished batch block.
    pub fn expire(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires_at > now);
        let hide = self
            .offers
            .batch
            .as_ref()
            .and_then(|b| b.hide_at)
            .is_some_and(|at| at <= now);
        if hide {
            self.offers.batch = None;
        }
    }

    /// A text field or modal currently owns the keyboard.
    pub fn modal_active(&self) -> bool {
        match self.tab {
            Tab::Offers => self.offers.respond.is_some(),
            Tab::Logs => self.logs.search_input.is_some(),
            Tab::Rules => self.rules.editor.is_some() || self.rules.confirm_delete.is_some(),
            Tab::Settings => self.settings.input.is_some(),
            Tab::Stats => false,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RuleType;

    #[test]
    fn toasts_expire_and_are_capped() {
        let mut state = AppState::new("http://localhost:5000", Duration::from_secs(3));
        for i in 0..6 {
            state.info(format!("t{}", i));
        }
        assert_eq!(state.toasts.len(), MAX_TOASTS);
        assert_eq!(state.toasts[0].text, "t2");

        state.expire(Instant::now() + Duration::from_secs(4));
        assert!(state.toasts.is_empty());
    }

    #[test]
    fn finished_batch_hides_after_linger() {
        let mut state = AppState::default();
        let now = Instant::now();
        state.offers.batch = Some(BatchView {
            running: false,
            hide_at: Some(now + Duration::from_secs(5)),
            ..BatchView::default()
        });
        state.expire(now);
        assert!(state.offers.batch.is_some());
        state.expire(now + Duration::from_secs(5));
        assert!(state.offers.batch.is_none());
    }

    #[test]
    fn stats_history_is_trimmed() {
        let mut state = AppState::default();
        state.set_terminal_width(10);
        for i in 0..70 {
            state.update_stats(DashboardStats {
                pending_offers: i,
                ..DashboardStats::default()
            });
        }
        assert_eq!(state.pending_history.len(), MIN_HISTORY_SIZE);
        assert_eq!(state.pending_history.back(), Some(&69));
    }

    #[test]
    fn rule_fields_apply_text() {
        let mut rule = NegotiationRule::default();
        RuleField::AutoAccept.apply(&mut rule, "82,5").unwrap();
        assert_eq!(rule.auto_accept_percentage, 82.5);
        RuleField::TimeRangeEnd.apply(&mut rule, "").unwrap();
        assert_eq!(rule.time_range_end, OPEN_ENDED_DAYS);
        assert!(RuleField::MaxCounters.apply(&mut rule, "zwei").is_err());
        RuleField::RuleType.advance(&mut rule);
        assert_eq!(rule.rule_type, RuleType::TimeBased);
    }

    #[test]
    fn negative_percentage_fails_validation() {
        let mut rule = NegotiationRule {
            name: "Standard".to_string(),
            ..NegotiationRule::default()
        };
        RuleField::AutoAccept.apply(&mut rule, "-10").unwrap();
        assert_eq!(rule.auto_accept_percentage, -10.0);
        assert!(matches!(
            rule.validate(),
            Err(crate::domain::ValidationError::PercentageOutOfRange {
                field: "auto_accept_percentage",
                ..
            })
        ));
    }

    #[test]
    fn selection_step_is_clamped() {
        assert_eq!(step(0, 0, 1), 0);
        assert_eq!(step(0, 3, -1), 0);
        assert_eq!(step(2, 3, 1), 2);
        assert_eq!(step(1, 3, 1), 2);
    }
}
