use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Position, Rect};
use std::time::Instant;

use crate::api::{ApiClient, ApiError, Capability};
use crate::config::AppConfig;

/// Seconds a transient banner stays visible. Fixed, not cancellable; a newer
/// message simply overwrites the older one's window.
const MESSAGE_TIMEOUT_SECS: u64 = 5;

pub const LOAD_ERROR_TEXT: &str = "Failed to load capabilities. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Capabilities,
    Consultants, // roster of the selected capability
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Register,
    Confirm,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

/// Unregister target stashed while the confirm popup is open
#[derive(Debug, Clone)]
pub struct PendingUnregister {
    pub capability: String,
    pub email: String,
}

pub struct App {
    pub section: Section,
    pub popup: Popup,

    // Capability board state
    pub capabilities: Vec<(String, Capability)>,
    pub selected: usize,
    pub selected_consultant: usize,
    pub load_error: Option<String>,

    // Registration modal state
    pub email_input: String,
    pub selected_capability: String,
    pub modal_field: usize, // 0 = email input, 1 = cancel button

    // Transient banner (auto-clears, see tick)
    pub message: Option<(String, MessageKind)>,
    pub message_time: Option<Instant>,

    pub pending_unregister: Option<PendingUnregister>,

    pub config: AppConfig,
    client: ApiClient,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = ApiClient::new(&config.server_url)?;

        Ok(Self {
            section: Section::Capabilities,
            popup: Popup::None,

            capabilities: Vec::new(),
            selected: 0,
            selected_consultant: 0,
            load_error: None,

            email_input: String::new(),
            selected_capability: String::new(),
            modal_field: 0,

            message: None,
            message_time: None,

            pending_unregister: None,

            config,
            client,
        })
    }

    /// Set a transient banner message
    pub fn set_message(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.message = Some((text.into(), kind));
        self.message_time = Some(Instant::now());
    }

    pub fn selected_entry(&self) -> Option<&(String, Capability)> {
        self.capabilities.get(self.selected)
    }

    /// Fetch the capability list and replace the board with it.
    /// On failure the board is cleared (no partial list) and a static error
    /// text is shown in its place. Never fatal, never retried.
    pub async fn load_capabilities(&mut self) -> Result<()> {
        match self.client.fetch_capabilities().await {
            Ok(map) => {
                self.capabilities = map.into_iter().collect();
                self.load_error = None;

                if self.selected >= self.capabilities.len() {
                    self.selected = self.capabilities.len().saturating_sub(1);
                }
                let roster_len = self
                    .selected_entry()
                    .map(|(_, c)| c.consultants.len())
                    .unwrap_or(0);
                if self.selected_consultant >= roster_len {
                    self.selected_consultant = roster_len.saturating_sub(1);
                }
            }
            Err(e) => {
                tracing::error!("Error fetching capabilities: {}", e);
                self.capabilities.clear();
                self.selected = 0;
                self.selected_consultant = 0;
                self.load_error = Some(LOAD_ERROR_TEXT.to_string());
            }
        }
        Ok(())
    }

    /// Open the registration modal for the selected capability
    pub fn open_registration(&mut self) {
        if self.popup != Popup::None {
            return;
        }
        let Some(name) = self.selected_entry().map(|(n, _)| n.clone()) else {
            return;
        };

        self.selected_capability = name;
        self.email_input.clear();
        self.modal_field = 0; // focus the email input
        self.popup = Popup::Register;
    }

    /// The single reset routine every modal close path converges on
    pub fn close_registration(&mut self) {
        self.popup = Popup::None;
        self.email_input.clear();
        self.selected_capability.clear();
        self.modal_field = 0;
    }

    /// Submit the registration form. Guards run before any network call.
    pub async fn submit_registration(&mut self) -> Result<()> {
        if self.selected_capability.is_empty() {
            self.set_message("Please select a capability", MessageKind::Error);
            return Ok(());
        }
        if self.email_input.trim().is_empty() {
            self.set_message("Please enter an email address", MessageKind::Error);
            return Ok(());
        }

        let capability = self.selected_capability.clone();
        let email = self.email_input.trim().to_string();

        match self.client.register(&capability, &email).await {
            Ok(message) => {
                self.set_message(message, MessageKind::Success);
                self.close_registration();
                self.load_capabilities().await?;
            }
            Err(e) => {
                // Modal stays open so the form can be corrected
                let text = failure_text(e, "Failed to register. Please try again.");
                self.set_message(text, MessageKind::Error);
            }
        }
        Ok(())
    }

    /// Ask for confirmation before unregistering the selected consultant
    pub fn request_unregister(&mut self) {
        if self.popup != Popup::None {
            return;
        }
        let Some(target) = self.selected_entry().and_then(|(name, capability)| {
            capability
                .consultants
                .get(self.selected_consultant)
                .map(|email| PendingUnregister {
                    capability: name.clone(),
                    email: email.clone(),
                })
        }) else {
            return;
        };

        self.pending_unregister = Some(target);
        self.popup = Popup::Confirm;
    }

    /// Issue the DELETE after the confirm popup was accepted
    pub async fn confirm_unregister(&mut self) -> Result<()> {
        let Some(pending) = self.pending_unregister.take() else {
            return Ok(());
        };

        match self
            .client
            .unregister(&pending.capability, &pending.email)
            .await
        {
            Ok(message) => {
                self.set_message(message, MessageKind::Success);
                self.load_capabilities().await?;
            }
            Err(e) => {
                let text = failure_text(e, "Failed to unregister. Please try again.");
                self.set_message(text, MessageKind::Error);
            }
        }
        Ok(())
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            return self.handle_popup_key(key).await;
        }

        self.handle_normal_key(key).await
    }

    async fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            // Switch between the capability list and the roster
            KeyCode::Tab | KeyCode::BackTab => {
                self.section = match self.section {
                    Section::Capabilities => Section::Consultants,
                    Section::Consultants => Section::Capabilities,
                };
            }

            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            // Register expertise for the selected capability
            KeyCode::Char('r') | KeyCode::Enter => {
                if self.section == Section::Capabilities {
                    self.open_registration();
                }
            }

            // Unregister the selected consultant
            KeyCode::Char('d') | KeyCode::Delete => {
                if self.section == Section::Consultants {
                    self.request_unregister();
                }
            }

            // Re-fetch the board
            KeyCode::Char('R') => self.load_capabilities().await?,

            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    async fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::Register => self.handle_register_key(key).await,
            Popup::Confirm => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Enter => {
                        self.popup = Popup::None;
                        self.confirm_unregister().await?;
                    }
                    KeyCode::Char('n') | KeyCode::Esc => {
                        self.pending_unregister = None;
                        self.popup = Popup::None;
                    }
                    _ => {}
                }
                Ok(())
            }
            Popup::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc
                        | KeyCode::Char('?')
                        | KeyCode::Char('h')
                        | KeyCode::Char('q')
                        | KeyCode::Enter
                ) {
                    self.popup = Popup::None;
                }
                Ok(())
            }
            Popup::None => Ok(()),
        }
    }

    async fn handle_register_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.close_registration(),
            KeyCode::Tab | KeyCode::BackTab => {
                // Toggle between email input (0) and cancel button (1)
                self.modal_field = if self.modal_field == 0 { 1 } else { 0 };
            }
            KeyCode::Enter => {
                if self.modal_field == 0 {
                    self.submit_registration().await?;
                } else {
                    self.close_registration();
                }
            }
            KeyCode::Backspace => {
                if self.modal_field == 0 {
                    self.email_input.pop();
                }
            }
            KeyCode::Char(c) => {
                if self.modal_field == 0 && !c.is_whitespace() && !c.is_control() {
                    self.email_input.push(c);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// A click outside the registration modal closes it, like clicking the
    /// backdrop of the original dialog. Clicks inside are ignored.
    pub fn handle_click(&mut self, column: u16, row: u16, area: Rect) {
        if self.popup != Popup::Register {
            return;
        }

        let modal = crate::ui::registration_area(area);
        if !modal.contains(Position::new(column, row)) {
            self.close_registration();
        }
    }

    fn move_down(&mut self) {
        match self.section {
            Section::Capabilities => {
                if !self.capabilities.is_empty() {
                    self.selected = (self.selected + 1) % self.capabilities.len();
                    self.selected_consultant = 0;
                }
            }
            Section::Consultants => {
                let len = self
                    .selected_entry()
                    .map(|(_, c)| c.consultants.len())
                    .unwrap_or(0);
                if len > 0 {
                    self.selected_consultant = (self.selected_consultant + 1) % len;
                }
            }
        }
    }

    fn move_up(&mut self) {
        match self.section {
            Section::Capabilities => {
                if !self.capabilities.is_empty() {
                    self.selected = self
                        .selected
                        .checked_sub(1)
                        .unwrap_or(self.capabilities.len() - 1);
                    self.selected_consultant = 0;
                }
            }
            Section::Consultants => {
                let len = self
                    .selected_entry()
                    .map(|(_, c)| c.consultants.len())
                    .unwrap_or(0);
                if len > 0 {
                    self.selected_consultant =
                        self.selected_consultant.checked_sub(1).unwrap_or(len - 1);
                }
            }
        }
    }

    /// Clear the banner once its window has passed
    pub fn tick(&mut self) {
        if let Some(time) = self.message_time {
            if time.elapsed().as_secs() >= MESSAGE_TIMEOUT_SECS {
                self.message = None;
                self.message_time = None;
            }
        }
    }
}

/// User-visible text for a failed mutation: the server's detail when it sent
/// one, otherwise the operation's generic fallback.
fn failure_text(err: ApiError, fallback: &str) -> String {
    match err {
        ApiError::Server { status, detail } => {
            tracing::warn!("Server rejected request ({}): {}", status, detail);
            detail
        }
        other => {
            tracing::error!("{} {}", fallback, other);
            fallback.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::time::Duration;

    // Port 1 is unassigned; requests fail fast with connection refused
    fn test_app() -> App {
        let config = AppConfig {
            server_url: "http://127.0.0.1:1".to_string(),
            notifications: false,
        };
        let mut app = App::new(config).unwrap();
        app.capabilities = vec![(
            "Cloud".to_string(),
            Capability {
                description: "x".to_string(),
                practice_area: None,
                industry_verticals: Vec::new(),
                capacity: 10.0,
                consultants: vec!["a@x.com".to_string()],
            },
        )];
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_open_registration_targets_selected_capability() {
        let mut app = test_app();
        app.open_registration();

        assert_eq!(app.popup, Popup::Register);
        assert_eq!(app.selected_capability, "Cloud");
        assert!(app.email_input.is_empty());
        assert_eq!(app.modal_field, 0);
    }

    #[test]
    fn test_open_registration_guarded_while_popup_open() {
        let mut app = test_app();
        app.popup = Popup::Help;
        app.open_registration();
        assert_eq!(app.popup, Popup::Help);
        assert!(app.selected_capability.is_empty());
    }

    #[tokio::test]
    async fn test_escape_closes_and_resets_modal() {
        let mut app = test_app();
        app.open_registration();
        app.email_input = "a@x.com".to_string();

        app.handle_key(key(KeyCode::Esc)).await.unwrap();

        assert_eq!(app.popup, Popup::None);
        assert!(app.email_input.is_empty());
        assert!(app.selected_capability.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_button_closes_and_resets_modal() {
        let mut app = test_app();
        app.open_registration();
        app.email_input = "a@x.com".to_string();

        app.handle_key(key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.modal_field, 1);
        app.handle_key(key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.popup, Popup::None);
        assert!(app.email_input.is_empty());
        assert!(app.selected_capability.is_empty());
    }

    #[test]
    fn test_outside_click_closes_modal() {
        let area = Rect::new(0, 0, 120, 40);
        let mut app = test_app();
        app.open_registration();

        // Inside the modal: stays open
        let modal = crate::ui::registration_area(area);
        app.handle_click(modal.x + 1, modal.y + 1, area);
        assert_eq!(app.popup, Popup::Register);

        // On the backdrop: closes and resets
        app.handle_click(0, 0, area);
        assert_eq!(app.popup, Popup::None);
        assert!(app.selected_capability.is_empty());
    }

    #[tokio::test]
    async fn test_submit_without_capability_is_guarded() {
        let mut app = test_app();
        app.popup = Popup::Register;
        app.email_input = "a@x.com".to_string();
        // selected_capability left empty: no request may be issued

        app.submit_registration().await.unwrap();

        let (text, kind) = app.message.clone().unwrap();
        assert_eq!(text, "Please select a capability");
        assert_eq!(kind, MessageKind::Error);
        assert_eq!(app.popup, Popup::Register);
    }

    #[tokio::test]
    async fn test_submit_without_email_is_guarded() {
        let mut app = test_app();
        app.open_registration();

        app.submit_registration().await.unwrap();

        let (text, kind) = app.message.clone().unwrap();
        assert_eq!(text, "Please enter an email address");
        assert_eq!(kind, MessageKind::Error);
    }

    #[tokio::test]
    async fn test_submit_transport_failure_keeps_modal_open() {
        let mut app = test_app();
        app.open_registration();
        app.email_input = "a@x.com".to_string();

        app.submit_registration().await.unwrap();

        let (text, kind) = app.message.clone().unwrap();
        assert_eq!(text, "Failed to register. Please try again.");
        assert_eq!(kind, MessageKind::Error);
        assert_eq!(app.popup, Popup::Register);
        assert_eq!(app.selected_capability, "Cloud");
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_no_partial_list() {
        let mut app = test_app();
        assert_eq!(app.capabilities.len(), 1);

        app.load_capabilities().await.unwrap();

        assert!(app.capabilities.is_empty());
        assert_eq!(app.load_error.as_deref(), Some(LOAD_ERROR_TEXT));
    }

    #[tokio::test]
    async fn test_confirm_popup_declines_cleanly() {
        let mut app = test_app();
        app.section = Section::Consultants;
        app.request_unregister();

        assert_eq!(app.popup, Popup::Confirm);
        let pending = app.pending_unregister.clone().unwrap();
        assert_eq!(pending.capability, "Cloud");
        assert_eq!(pending.email, "a@x.com");

        app.handle_key(key(KeyCode::Char('n'))).await.unwrap();
        assert_eq!(app.popup, Popup::None);
        assert!(app.pending_unregister.is_none());
    }

    #[test]
    fn test_failure_text_prefers_server_detail() {
        let err = ApiError::Server {
            status: reqwest::StatusCode::BAD_REQUEST,
            detail: "Email already registered".to_string(),
        };
        assert_eq!(
            failure_text(err, "Failed to register. Please try again."),
            "Email already registered"
        );
    }

    #[test]
    fn test_message_clears_after_timeout() {
        let mut app = test_app();
        app.set_message("done", MessageKind::Success);

        app.tick();
        assert!(app.message.is_some());

        app.message_time = Some(Instant::now() - Duration::from_secs(MESSAGE_TIMEOUT_SECS + 1));
        app.tick();
        assert!(app.message.is_none());
        assert!(app.message_time.is_none());
    }

    #[test]
    fn test_newer_message_overwrites_older() {
        let mut app = test_app();
        app.set_message("first", MessageKind::Error);
        app.set_message("second", MessageKind::Success);

        let (text, kind) = app.message.clone().unwrap();
        assert_eq!(text, "second");
        assert_eq!(kind, MessageKind::Success);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = test_app();
        app.capabilities.push((
            "Security".to_string(),
            Capability {
                description: "y".to_string(),
                practice_area: Some("Cyber".to_string()),
                industry_verticals: vec!["Finance".to_string()],
                capacity: 20.0,
                consultants: Vec::new(),
            },
        ));

        app.move_up();
        assert_eq!(app.selected, 1);
        app.move_down();
        assert_eq!(app.selected, 0);
    }
}
