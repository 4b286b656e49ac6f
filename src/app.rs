use std::collections::HashMap;
use std::io;

use crossterm::event::KeyCode;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use ratatui::widgets::TableState;
use throbber_widgets_tui::ThrobberState;
use tracing::{debug, info, warn};

use crate::form::{FormOutcome, SaveRequest, SecretForm};
use crate::model::{AppConfig, AppMode, AppScreen, Element, FormMode, PendingDelete, Secret, ViewMode};
use crate::query::{OptimisticRemoval, QueryCache, SECRETS_QUERY_KEY};

pub const SKELETON_ROWS: usize = 3;

/// Opens a URL in the user's default browser.
pub type UrlOpener = fn(&str) -> io::Result<()>;

fn open_in_browser(url: &str) -> io::Result<()> {
    open::that(url)
}

/// Work the main loop has to dispatch after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    DeleteSecret(String),
    SaveSecret(SaveRequest),
}

pub struct App {
    pub screen: AppScreen,
    pub config: Option<AppConfig>,
    pub providers: Vec<String>,
    pub secrets: QueryCache<Vec<Secret>>,
    pub view: ViewMode,
    pub pending_delete: PendingDelete,
    removals: HashMap<String, OptimisticRemoval>,
    pub selected: usize,
    pub table_state: TableState,
    pub message: Option<String>,
    pub search_mode: bool,
    pub search_query: String,
    pub throbber_state: ThrobberState,
    pub integrations_url: String,
    pub opener: UrlOpener,
}

impl App {
    pub fn new(integrations_url: String) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        Self {
            screen: AppScreen::Secrets,
            config: None,
            providers: Vec::new(),
            secrets: QueryCache::new(),
            view: ViewMode::List,
            pending_delete: PendingDelete::None,
            removals: HashMap::new(),
            selected: 0,
            table_state,
            message: None,
            search_mode: false,
            search_query: String::new(),
            throbber_state: ThrobberState::default(),
            integrations_url,
            opener: open_in_browser,
        }
    }

    pub fn is_saas(&self) -> bool {
        self.config
            .as_ref()
            .is_some_and(|c| c.app_mode == AppMode::Saas)
    }

    pub fn has_provider_set(&self) -> bool {
        !self.providers.is_empty()
    }

    pub fn should_render_connect_to_git_button(&self) -> bool {
        self.is_saas() && !self.has_provider_set()
    }

    pub fn is_loading_secrets(&self) -> bool {
        self.secrets.is_loading(SECRETS_QUERY_KEY)
    }

    /// Anything in flight that deserves a spinner.
    pub fn is_busy(&self) -> bool {
        self.secrets.is_fetching(SECRETS_QUERY_KEY)
            || matches!(self.pending_delete, PendingDelete::InFlight(_))
            || self.form().is_some_and(|f| f.submitting)
    }

    pub fn cached_secrets(&self) -> &[Secret] {
        self.secrets
            .data(SECRETS_QUERY_KEY)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Cached secrets narrowed by the fuzzy filter, best match first.
    pub fn visible_secrets(&self) -> Vec<&Secret> {
        let secrets = self.cached_secrets();
        if self.search_query.is_empty() {
            return secrets.iter().collect();
        }
        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(i64, &Secret)> = secrets
            .iter()
            .filter_map(|s| {
                matcher
                    .fuzzy_match(&s.name, &self.search_query)
                    .map(|score| (score, s))
            })
            .collect();
        results.sort_by(|a, b| b.0.cmp(&a.0));
        results.into_iter().map(|(_, s)| s).collect()
    }

    pub fn selected_row_name(&self) -> Option<String> {
        self.visible_secrets()
            .get(self.selected)
            .map(|s| s.name.clone())
    }

    /// The secret targeted by the edit form or the delete modal.
    pub fn selected_secret(&self) -> Option<&str> {
        match &self.view {
            ViewMode::EditSecretForm { selected, .. } => Some(selected),
            _ => self.pending_delete.target(),
        }
    }

    pub fn form(&self) -> Option<&SecretForm> {
        match &self.view {
            ViewMode::AddSecretForm(form) | ViewMode::EditSecretForm { form, .. } => Some(form),
            ViewMode::List => None,
        }
    }

    fn form_mut(&mut self) -> Option<&mut SecretForm> {
        match &mut self.view {
            ViewMode::AddSecretForm(form) | ViewMode::EditSecretForm { form, .. } => Some(form),
            ViewMode::List => None,
        }
    }

    /// What the secrets screen draws, in order. Each guard is independent.
    pub fn elements(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let loading = self.is_loading_secrets();
        let list = self.view.is_list();
        let connect = self.should_render_connect_to_git_button();

        if loading && list {
            out.push(Element::SkeletonRows(SKELETON_ROWS));
        }
        if connect {
            out.push(Element::ConnectGitButton);
        }
        let loaded_empty = self
            .secrets
            .data(SECRETS_QUERY_KEY)
            .is_some_and(|s| s.is_empty());
        if !connect && loaded_empty && list {
            out.push(Element::NoSecretsMessage);
        }
        if !connect && list {
            out.push(Element::AddSecretButton { disabled: loading });
        }
        match &self.view {
            ViewMode::List => out.push(Element::SecretsTable),
            ViewMode::AddSecretForm(_) => out.push(Element::SecretForm(FormMode::Add)),
            ViewMode::EditSecretForm { .. } => out.push(Element::SecretForm(FormMode::Edit)),
        }
        if self.pending_delete.is_visible() {
            out.push(Element::ConfirmationModal);
        }
        out
    }

    pub fn start_add(&mut self) {
        self.view = ViewMode::AddSecretForm(SecretForm::add());
    }

    pub fn start_edit(&mut self, name: &str) {
        let cached = self.cached_secrets().iter().find(|s| s.name == name);
        let form = SecretForm::edit(name, cached);
        self.view = ViewMode::EditSecretForm {
            selected: name.to_string(),
            form,
        };
    }

    pub fn request_delete(&mut self, name: &str) {
        self.pending_delete = PendingDelete::Confirming(name.to_string());
    }

    /// Removes the target from the cache right away and returns the name the
    /// caller must send to the server.
    pub fn confirm_delete(&mut self) -> Option<String> {
        let PendingDelete::Confirming(name) = &self.pending_delete else {
            return None;
        };
        let name = name.clone();
        let removal =
            OptimisticRemoval::begin(&mut self.secrets, SECRETS_QUERY_KEY, |s: &Secret| {
                s.name == name
            });
        if self.removals.insert(name.clone(), removal).is_some() {
            debug!("Replacing unsettled removal for '{}'", name);
        }
        self.pending_delete = PendingDelete::InFlight(name.clone());
        self.clamp_selection();
        info!("Deleting secret '{}'", name);
        Some(name)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = PendingDelete::None;
    }

    pub fn cancel_form(&mut self) {
        self.view = ViewMode::List;
    }

    /// Returns true when the failure invalidated the secrets cache.
    pub fn on_delete_settled(&mut self, name: &str, result: &Result<(), String>) -> bool {
        self.pending_delete = PendingDelete::None;
        let invalidated = match self.removals.remove(name) {
            Some(removal) => removal.settle(&mut self.secrets, result),
            None => {
                if result.is_err() {
                    self.secrets.invalidate(SECRETS_QUERY_KEY);
                }
                result.is_err()
            }
        };
        if invalidated {
            debug!("Delete of '{}' failed, refetching secrets", name);
        }
        invalidated
    }

    pub fn on_secrets_loaded(&mut self, secrets: Vec<Secret>) {
        self.secrets.set_data(SECRETS_QUERY_KEY, secrets);
        self.clamp_selection();
    }

    /// True while the open form is the one waiting on a save. A form opened
    /// after the submitting one was cancelled never has `submitting` set.
    fn awaiting_save(&self) -> bool {
        self.form().is_some_and(|f| f.submitting)
    }

    pub fn on_secret_saved(&mut self, name: &str) {
        self.secrets.invalidate(SECRETS_QUERY_KEY);
        if self.awaiting_save() {
            self.view = ViewMode::List;
        }
        self.message = Some(format!("Secret '{}' saved", name));
    }

    pub fn on_secret_save_failed(&mut self, error: String) {
        if self.awaiting_save() {
            if let Some(form) = self.form_mut() {
                form.save_failed(error);
            }
        } else {
            self.message = Some(error);
        }
    }

    /// Follows the connect-provider link to the integrations settings page.
    pub fn open_integrations(&mut self) {
        let url = self.integrations_url.clone();
        match (self.opener)(&url) {
            Ok(()) => {
                info!("Opened {}", url);
                self.message = Some(format!("Opened {} in your browser", url));
            }
            Err(e) => {
                warn!("Failed to open {}: {}", url, e);
                self.message = Some(format!("Failed to open {}: {}", url, e));
            }
        }
    }

    pub fn refresh(&mut self) {
        self.secrets.invalidate(SECRETS_QUERY_KEY);
    }

    pub fn clamp_selection(&mut self) {
        let len = self.visible_secrets().len();
        if len == 0 {
            self.selected = 0;
            self.table_state.select(None);
        } else {
            self.selected = self.selected.min(len - 1);
            self.table_state.select(Some(self.selected));
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Option<Command> {
        if self.screen == AppScreen::Secrets && self.pending_delete.is_visible() {
            return self.handle_modal_key(code);
        }
        if self.screen == AppScreen::Secrets && !self.view.is_list() {
            return self.handle_form_key(code);
        }
        if self.search_mode {
            match code {
                KeyCode::Esc => {
                    self.search_mode = false;
                    self.search_query.clear();
                }
                KeyCode::Enter => self.search_mode = false,
                KeyCode::Backspace => {
                    self.search_query.pop();
                }
                KeyCode::Char(c) => self.search_query.push(c),
                _ => {}
            }
            self.selected = 0;
            self.clamp_selection();
            return None;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(Command::Quit),
            KeyCode::Tab => {
                self.screen = match self.screen {
                    AppScreen::Secrets => AppScreen::Microagents,
                    AppScreen::Microagents => AppScreen::Secrets,
                };
                return None;
            }
            _ => {}
        }
        if self.screen == AppScreen::Microagents {
            return None;
        }

        match code {
            KeyCode::Char('j') | KeyCode::Down => {
                let len = self.visible_secrets().len();
                if len > 0 {
                    self.selected = (self.selected + 1).min(len - 1);
                    self.table_state.select(Some(self.selected));
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.table_state.select(Some(self.selected));
                }
            }
            KeyCode::Char('a') => {
                if self
                    .elements()
                    .contains(&Element::AddSecretButton { disabled: false })
                {
                    self.start_add();
                }
            }
            KeyCode::Char('e') => {
                if let Some(name) = self.selected_row_name() {
                    self.start_edit(&name);
                }
            }
            KeyCode::Char('d') => {
                if let Some(name) = self.selected_row_name() {
                    self.request_delete(&name);
                }
            }
            KeyCode::Char('c') => {
                if self.should_render_connect_to_git_button() {
                    self.open_integrations();
                }
            }
            KeyCode::Char('r') => {
                self.message = Some("Refreshing secrets...".into());
                self.refresh();
            }
            KeyCode::Char('/') => {
                self.search_mode = true;
                self.search_query.clear();
            }
            _ => {}
        }
        None
    }

    fn handle_modal_key(&mut self, code: KeyCode) -> Option<Command> {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.confirm_delete().map(Command::DeleteSecret)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.cancel_delete();
                None
            }
            _ => None,
        }
    }

    fn handle_form_key(&mut self, code: KeyCode) -> Option<Command> {
        let existing = self.cached_secrets().to_vec();
        let outcome = self.form_mut()?.handle_key(code, &existing);
        match outcome {
            FormOutcome::Editing => None,
            FormOutcome::Cancel => {
                self.cancel_form();
                None
            }
            FormOutcome::Submit(req) => Some(Command::SaveSecret(req)),
        }
    }
}
