//! Key handling. Runs on the TUI thread; anything that needs the backend is
//! sent as a [`Command`].

use crate::domain::timefmt::now_local;
use crate::domain::{OfferResponse, ResponseAction, Service, Settings, ValidationError};
use crate::ui::actions::Command;
use crate::ui::input::{InputOutcome, TextInput};
use crate::ui::state::{
    step, AppState, RespondDialog, RespondField, RuleEditor, RuleField, Tab,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;

/// Outgoing commands collected while the state lock is held.
pub type Outbox = Vec<Command>;

/// Apply `key` to the state. Returns the commands to dispatch.
pub fn handle_key_event(key: KeyEvent, state: &mut AppState) -> Outbox {
    let mut out = Outbox::new();

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        state.quit();
        return out;
    }

    if state.modal_active() {
        match state.tab {
            Tab::Offers => respond_dialog_key(key, state, &mut out),
            Tab::Logs => search_key(key, state),
            Tab::Rules => rules_modal_key(key, state, &mut out),
            Tab::Settings => settings_input_key(key, state),
            Tab::Stats => {}
        }
        return out;
    }

    if key.code == KeyCode::Esc && close_detail(state) {
        return out;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            state.quit();
            return out;
        }
        KeyCode::Tab => {
            switch_tab(state, state.tab.next(), &mut out);
            return out;
        }
        KeyCode::BackTab => {
            switch_tab(state, state.tab.previous(), &mut out);
            return out;
        }
        KeyCode::Char(c @ '1'..='5') => {
            let idx = c as usize - '1' as usize;
            switch_tab(state, Tab::ALL[idx], &mut out);
            return out;
        }
        _ => {}
    }

    match state.tab {
        Tab::Offers => offers_key(key, state, &mut out),
        Tab::Logs => logs_key(key, state, &mut out),
        Tab::Rules => rules_key(key, state, &mut out),
        Tab::Settings => settings_key(key, state, &mut out),
        Tab::Stats => {
            if key.code == KeyCode::Char('r') {
                out.push(Command::RefreshStats);
                out.push(Command::CheckHealth);
            }
        }
    }
    out
}

/// Esc closes an open detail view before it quits.
fn close_detail(state: &mut AppState) -> bool {
    let detail = match state.tab {
        Tab::Offers => &mut state.offers.show_detail,
        Tab::Logs => &mut state.logs.show_detail,
        _ => return false,
    };
    std::mem::replace(detail, false)
}

/// Send collected commands. A closed channel means the runtime is going away.
pub fn dispatch(tx: &UnboundedSender<Command>, commands: Outbox) {
    for command in commands {
        if tx.send(command).is_err() {
            log::debug!("command channel closed");
            break;
        }
    }
}

/// The first visit of a panel loads its data.
pub fn switch_tab(state: &mut AppState, tab: Tab, out: &mut Outbox) {
    state.tab = tab;
    match tab {
        Tab::Offers if !state.offers.loaded && !state.offers.loading => {
            out.push(Command::LoadOffers)
        }
        Tab::Logs if !state.logs.loaded && !state.logs.loading => out.push(Command::LoadLogs),
        Tab::Rules if !state.rules.loaded && !state.rules.loading => out.push(Command::LoadRules),
        Tab::Settings if !state.settings.loaded && !state.settings.loading => {
            out.push(Command::LoadSettings)
        }
        _ => {}
    }
}

fn offers_key(key: KeyEvent, state: &mut AppState, out: &mut Outbox) {
    let offers = &mut state.offers;
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            offers.selected = step(offers.selected, offers.offers.len(), -1)
        }
        KeyCode::Down | KeyCode::Char('j') => {
            offers.selected = step(offers.selected, offers.offers.len(), 1)
        }
        KeyCode::Char('f') => {
            offers.filter = offers.filter.next();
            offers.selected = 0;
            out.push(Command::LoadOffers);
        }
        KeyCode::Char('r') => out.push(Command::LoadOffers),
        KeyCode::Char('d') => offers.show_detail = !offers.show_detail,
        KeyCode::Char('a') => {
            if let Some(offer) = offers.selected_offer() {
                if offers.analyzing.is_none() {
                    out.push(Command::AnalyzeOffer(offer.id.clone()));
                }
            }
        }
        KeyCode::Enter | KeyCode::Char('o') => {
            if let Some(offer) = offers.selected_offer() {
                offers.respond = Some(RespondDialog::for_offer(offer));
            }
        }
        KeyCode::Char('s') if !offers.syncing => out.push(Command::SyncSimple),
        KeyCode::Char('w') if !offers.syncing => out.push(Command::SyncWorking),
        KeyCode::Char('b') => {
            if offers.batch_running() {
                state.info("Batch-Sync läuft bereits");
            } else {
                out.push(Command::StartBatchSync);
            }
        }
        KeyCode::Char('x') => {
            if offers.batch_running() {
                out.push(Command::StopBatchSync);
            }
        }
        _ => {}
    }
}

fn respond_dialog_key(key: KeyEvent, state: &mut AppState, out: &mut Outbox) {
    let Some(dialog) = state.offers.respond.as_mut() else {
        return;
    };
    if dialog.submitting {
        if key.code == KeyCode::Esc {
            state.offers.respond = None;
        }
        return;
    }
    match key.code {
        KeyCode::Esc => {
            state.offers.respond = None;
            return;
        }
        KeyCode::Tab | KeyCode::Down => {
            dialog.focus = dialog.focus.next();
            // The price field only exists for counter offers
            if dialog.focus == RespondField::Price && dialog.action != ResponseAction::Counter {
                dialog.focus = dialog.focus.next();
            }
            return;
        }
        KeyCode::Enter => {
            let price = dialog.counter_price();
            match OfferResponse::manual(dialog.action, price, dialog.message.value().trim()) {
                Ok(response) => {
                    dialog.submitting = true;
                    dialog.error = None;
                    out.push(Command::RespondToOffer {
                        offer_id: dialog.offer_id.clone(),
                        response,
                    });
                }
                Err(e) => {
                    if e == ValidationError::CounterPriceRequired {
                        dialog.focus = RespondField::Price;
                    }
                    dialog.error = Some(e.to_string());
                }
            }
            return;
        }
        _ => {}
    }
    match dialog.focus {
        RespondField::Action => {
            if matches!(key.code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                dialog.cycle_action();
            }
        }
        RespondField::Price => {
            dialog.price.handle_key(key);
        }
        RespondField::Message => {
            dialog.message.handle_key(key);
        }
    }
}

fn logs_key(key: KeyEvent, state: &mut AppState, out: &mut Outbox) {
    let logs = &mut state.logs;
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            logs.selected = logs.selected.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let len = logs.visible(now_local()).len();
            logs.selected = step(logs.selected, len, 1);
        }
        KeyCode::Char('/') => logs.search_input = Some(TextInput::new(logs.filter.search.clone())),
        KeyCode::Char('a') => {
            logs.filter.action = logs.filter.action.next();
            logs.selected = 0;
        }
        KeyCode::Char('t') => {
            logs.filter.date = logs.filter.date.next();
            logs.selected = 0;
        }
        KeyCode::Char('c') => {
            logs.filter = Default::default();
            logs.selected = 0;
        }
        KeyCode::Enter | KeyCode::Char('d') => logs.show_detail = !logs.show_detail,
        KeyCode::Char('r') => out.push(Command::LoadLogs),
        KeyCode::Char('e') => out.push(Command::ExportLogs),
        _ => {}
    }
}

/// Live search: the filter follows every keystroke.
fn search_key(key: KeyEvent, state: &mut AppState) {
    let logs = &mut state.logs;
    let Some(input) = logs.search_input.as_mut() else {
        return;
    };
    match input.handle_key(key) {
        InputOutcome::Edited => {
            logs.filter.search = input.value().to_string();
            logs.selected = 0;
        }
        InputOutcome::Submit => logs.search_input = None,
        InputOutcome::Cancel => {
            logs.filter.search.clear();
            logs.search_input = None;
        }
        InputOutcome::Ignored => {}
    }
}

fn rules_key(key: KeyEvent, state: &mut AppState, out: &mut Outbox) {
    let rules = &mut state.rules;
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            rules.selected = step(rules.selected, rules.rules.len(), -1)
        }
        KeyCode::Down | KeyCode::Char('j') => {
            rules.selected = step(rules.selected, rules.rules.len(), 1)
        }
        KeyCode::Char('r') => out.push(Command::LoadRules),
        KeyCode::Char('n') => rules.editor = Some(RuleEditor::new_rule()),
        KeyCode::Enter | KeyCode::Char('e') => {
            if let Some(rule) = rules.selected_rule() {
                rules.editor = Some(RuleEditor::edit(rule.clone()));
            }
        }
        KeyCode::Char(' ') => {
            if let Some(rule) = rules.selected_rule() {
                if let Some(id) = rule.id.clone() {
                    out.push(Command::ToggleRule {
                        rule_id: id,
                        is_active: !rule.is_active,
                    });
                }
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            let Some(rule) = rules.selected_rule().cloned() else {
                return;
            };
            if rule.can_delete() {
                rules.confirm_delete = Some(rule);
            } else {
                state.error(ValidationError::RuleIsActive.to_string());
            }
        }
        _ => {}
    }
}

fn rules_modal_key(key: KeyEvent, state: &mut AppState, out: &mut Outbox) {
    if let Some(rule) = state.rules.confirm_delete.take() {
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('j')) {
            out.push(Command::DeleteRule(rule));
        }
        return;
    }
    let Some(editor) = state.rules.editor.as_mut() else {
        return;
    };

    if let Some(input) = editor.input.as_mut() {
        match input.handle_key(key) {
            InputOutcome::Submit => {
                let text = input.value().to_string();
                match editor.current_field().apply(&mut editor.draft, &text) {
                    Ok(()) => {
                        editor.input = None;
                        editor.error = None;
                    }
                    Err(e) => editor.error = Some(e),
                }
            }
            InputOutcome::Cancel => editor.input = None,
            InputOutcome::Edited | InputOutcome::Ignored => {}
        }
        return;
    }

    if editor.saving {
        return;
    }
    let field = editor.current_field();
    match key.code {
        KeyCode::Esc => state.rules.editor = None,
        KeyCode::Up | KeyCode::Char('k') => {
            editor.field = step(editor.field, RuleField::ALL.len(), -1)
        }
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
            editor.field = step(editor.field, RuleField::ALL.len(), 1)
        }
        KeyCode::Enter if field.is_text() => {
            editor.input = Some(TextInput::new(field.value(&editor.draft)));
        }
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => {
            field.advance(&mut editor.draft)
        }
        KeyCode::Char('s') => match editor.draft.validate() {
            Ok(()) => {
                editor.saving = true;
                editor.error = None;
                out.push(Command::SaveRule(editor.draft.clone()));
            }
            Err(e) => editor.error = Some(e.to_string()),
        },
        _ => {}
    }
}

fn settings_key(key: KeyEvent, state: &mut AppState, out: &mut Outbox) {
    let settings = &mut state.settings;
    let count = settings.settings.ordered_keys().len();
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => settings.selected = step(settings.selected, count, -1),
        KeyCode::Down | KeyCode::Char('j') => settings.selected = step(settings.selected, count, 1),
        KeyCode::Enter | KeyCode::Char(' ') => {
            let Some(name) = settings.selected_key() else {
                return;
            };
            if Settings::is_flag(&name) {
                settings.settings.toggle_flag(&name);
                settings.dirty = true;
            } else {
                settings.input = Some(TextInput::new(settings.settings.get(&name)));
            }
        }
        KeyCode::Char('m') => settings.reveal_secrets = !settings.reveal_secrets,
        KeyCode::Char('r') => out.push(Command::LoadSettings),
        KeyCode::Char('s') if !settings.saving => {
            out.push(Command::SaveSettings(settings.settings.clone()))
        }
        KeyCode::Char('e') if settings.testing.is_none() => out.push(Command::TestConnection {
            service: Service::Ebay,
            settings: settings.settings.clone(),
        }),
        KeyCode::Char('o') if settings.testing.is_none() => out.push(Command::TestConnection {
            service: Service::OpenAi,
            settings: settings.settings.clone(),
        }),
        _ => {}
    }
}

fn settings_input_key(key: KeyEvent, state: &mut AppState) {
    let settings = &mut state.settings;
    let Some(input) = settings.input.as_mut() else {
        return;
    };
    match input.handle_key(key) {
        InputOutcome::Submit => {
            let value = input.value().trim().to_string();
            if let Some(name) = settings.selected_key() {
                if settings.settings.get(&name) != value {
                    settings.settings.set(&name, value);
                    settings.dirty = true;
                }
            }
            settings.input = None;
        }
        InputOutcome::Cancel => settings.input = None,
        InputOutcome::Edited | InputOutcome::Ignored => {}
    }
}
