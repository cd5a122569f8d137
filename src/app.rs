use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent};
use std::time::Instant;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::form::{self, FormState, FIELD_COUNT};
use crate::predict::{PredictClient, PredictError};
use crate::theme::Theme;

/// How long a status message stays on the info line
const STATUS_SECONDS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// Outcome of the most recent submission shown to the user
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    Score(f64),
    Error(String),
}

/// A finished prediction request, tagged with the submission it belongs to
#[derive(Debug)]
pub struct Completion {
    pub ticket: u64,
    pub outcome: Result<f64, PredictError>,
}

pub struct App {
    pub popup: Popup,
    pub theme: Theme,
    pub config: AppConfig,

    // Form values and which input has focus (FIELD_COUNT = submit button)
    pub form: FormState,
    pub focus: usize,

    pub result: Option<PredictionResult>,
    pub in_flight: usize,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    client: PredictClient,
    last_ticket: u64,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = PredictClient::new(&config.endpoint)?;
        let theme = Theme::from_config(&config.theme);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Ok(Self {
            popup: Popup::None,
            theme,
            config,

            form: FormState::new(),
            focus: 0,

            result: None,
            in_flight: 0,

            status_message: None,
            status_message_time: None,

            client,
            last_ticket: 0,
            completions_tx,
            completions_rx,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Set a status message (auto-clears after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Key of the focused field, or `None` when the submit button has focus
    pub fn focused_key(&self) -> Option<&'static str> {
        form::display_order().nth(self.focus)
    }

    pub fn is_focused(&self, key: &str) -> bool {
        self.focused_key() == Some(key)
    }

    /// Apply a `key=value` override from the command line
    pub fn apply_override(&mut self, spec: &str) -> Result<()> {
        let (key, value) = spec
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{}'", spec))?;
        self.form.set(key.trim(), value.trim())?;
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            return self.handle_popup_key(key);
        }

        self.handle_normal_key(key)
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        let focused = self.focused_key().and_then(form::field);

        match key.code {
            // Numeric input goes to the focused number field before anything else
            KeyCode::Char(c) if focused.is_some_and(|f| f.is_numeric()) && is_numeric_char(c) => {
                if let Some(f) = focused {
                    self.edit_number(f.key, |value| value.push(c))?;
                }
            }
            KeyCode::Backspace => {
                if let Some(f) = focused.filter(|f| f.is_numeric()) {
                    self.edit_number(f.key, |value| {
                        value.pop();
                    })?;
                }
            }
            KeyCode::Delete => {
                if let Some(f) = focused.filter(|f| f.is_numeric()) {
                    self.edit_number(f.key, String::clear)?;
                }
            }

            // Navigation between inputs
            KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => self.move_focus(1),
            KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => self.move_focus(-1),

            // Cycle select options
            KeyCode::Right => {
                if let Some(f) = focused.filter(|f| !f.is_numeric()) {
                    self.cycle_choice(f.key, 1)?;
                }
            }
            KeyCode::Left => {
                if let Some(f) = focused.filter(|f| !f.is_numeric()) {
                    self.cycle_choice(f.key, -1)?;
                }
            }
            KeyCode::Char(' ') => match focused {
                Some(f) if !f.is_numeric() => self.cycle_choice(f.key, 1)?,
                Some(_) => {}
                None => self.submit(),
            },

            // Enter submits from anywhere, like a browser form
            KeyCode::Enter => self.submit(),

            // Help (? or h)
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q')) {
                    self.popup = Popup::None;
                }
                Ok(())
            }
            Popup::None => Ok(()),
        }
    }

    fn move_focus(&mut self, delta: isize) {
        // Fields plus the submit button
        let stops = (FIELD_COUNT + 1) as isize;
        self.focus = (self.focus as isize + delta).rem_euclid(stops) as usize;
    }

    /// Edit the raw value of a number field in place
    pub fn edit_number(&mut self, key: &str, edit: impl FnOnce(&mut String)) -> Result<()> {
        let mut value = self.form.get(key).unwrap_or_default().to_string();
        edit(&mut value);
        self.form.set(key, value)?;
        Ok(())
    }

    /// Step a select field through its options, wrapping at either end
    pub fn cycle_choice(&mut self, key: &str, delta: isize) -> Result<()> {
        let field = form::field(key).with_context(|| format!("Unknown field {}", key))?;
        let options = field.options();
        if options.is_empty() {
            return Ok(());
        }

        let current = self
            .form
            .get(key)
            .and_then(|v| options.iter().position(|o| *o == v))
            .unwrap_or(0);
        let next = (current as isize + delta).rem_euclid(options.len() as isize) as usize;
        self.form.set(key, options[next])?;
        Ok(())
    }

    /// Clear the previous outcome and send the form in the background
    pub fn submit(&mut self) {
        self.result = None;
        self.last_ticket += 1;
        self.in_flight += 1;

        let ticket = self.last_ticket;
        let features = self.form.features();
        let client = self.client.clone();
        let tx = self.completions_tx.clone();

        tracing::info!(ticket, endpoint = %self.client.endpoint(), "Submitting prediction request");
        tokio::spawn(async move {
            let outcome = client.predict(&features).await;
            // Receiver lives as long as the App
            let _ = tx.send(Completion { ticket, outcome });
        });
    }

    fn apply_completion(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);

        if self.config.discard_stale_responses && completion.ticket != self.last_ticket {
            tracing::debug!(
                ticket = completion.ticket,
                latest = self.last_ticket,
                "Discarding stale prediction response"
            );
            return;
        }

        tracing::debug!(ticket = completion.ticket, outcome = ?completion.outcome, "Prediction request finished");
        self.result = Some(match completion.outcome {
            Ok(score) => PredictionResult::Score(score),
            Err(e) => PredictionResult::Error(e.to_string()),
        });
    }

    /// Wait for the next in-flight request to finish and apply it.
    /// Returns false if nothing was in flight.
    pub async fn settle(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.completions_rx.recv().await {
            Some(completion) => {
                self.apply_completion(completion);
                true
            }
            None => false,
        }
    }

    pub fn tick(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion);
        }

        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_SECONDS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }
}

/// Characters a number input accepts
fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
    }

    fn app_for(server: &MockServer, discard_stale: bool) -> App {
        App::new(AppConfig {
            endpoint: format!("{}/predict", server.uri()),
            discard_stale_responses: discard_stale,
            ..Default::default()
        })
        .unwrap()
    }

    fn features_with_age(age: u32) -> serde_json::Value {
        serde_json::json!({
            "features": [age, 5, 80, 7, "self-study", "b.sc", "male", "medium", "average", "moderate", "yes"]
        })
    }

    #[test]
    fn test_focus_wraps_through_fields_and_button() {
        let mut app = App::new(AppConfig::default()).unwrap();
        assert_eq!(app.focused_key(), Some("age"));

        press(&mut app, KeyCode::Up);
        assert_eq!(app.focused_key(), None);

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focused_key(), Some("study_hours"));

        for _ in 0..4 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.focused_key(), Some("study_method"));
    }

    #[test]
    fn test_typing_into_number_field() {
        let mut app = App::new(AppConfig::default()).unwrap();

        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('5'));
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.form.get("age"), Some("25"));

        press(&mut app, KeyCode::Delete);
        assert_eq!(app.form.get("age"), Some(""));
    }

    #[test]
    fn test_cycling_select_field() {
        let mut app = App::new(AppConfig::default()).unwrap();
        app.focus = 4;
        assert_eq!(app.focused_key(), Some("gender"));

        press(&mut app, KeyCode::Right);
        assert_eq!(app.form.get("gender"), Some("female"));

        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.form.get("gender"), Some("other"));

        // Digits do nothing on a select
        press(&mut app, KeyCode::Char('7'));
        assert_eq!(app.form.get("gender"), Some("other"));
    }

    #[test]
    fn test_help_popup_swallows_keys() {
        let mut app = App::new(AppConfig::default()).unwrap();

        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.popup, Popup::Help);

        press(&mut app, KeyCode::Down);
        assert_eq!(app.focus, 0);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.popup, Popup::None);
    }

    #[test]
    fn test_apply_override() {
        let mut app = App::new(AppConfig::default()).unwrap();

        app.apply_override("age=25").unwrap();
        app.apply_override("course = b.tech").unwrap();
        assert_eq!(app.form.get("age"), Some("25"));
        assert_eq!(app.form.get("course"), Some("b.tech"));

        assert!(app.apply_override("age").is_err());
        assert!(app.apply_override("height=180").is_err());
        assert!(app.apply_override("course=mba").is_err());
    }

    #[tokio::test]
    async fn enter_submits_and_shows_score() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"prediction": 87.456})))
            .mount(&server)
            .await;

        let mut app = app_for(&server, false);
        app.result = Some(PredictionResult::Error("old".into()));

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.result, None);
        assert_eq!(app.in_flight, 1);

        assert!(app.settle().await);
        assert_eq!(app.result, Some(PredictionResult::Score(87.456)));
        assert_eq!(app.in_flight, 0);
        assert!(!app.settle().await);
    }

    #[tokio::test]
    async fn server_error_is_shown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "bad input"})))
            .mount(&server)
            .await;

        let mut app = app_for(&server, false);
        app.submit();
        app.settle().await;

        assert_eq!(app.result, Some(PredictionResult::Error("bad input".into())));
        // Shown once, in the panel, not repeated on the info line
        assert_eq!(app.status_message, None);
    }

    #[tokio::test]
    async fn unreachable_server_is_shown() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut app = App::new(AppConfig {
            endpoint: format!("http://127.0.0.1:{port}/predict"),
            ..Default::default()
        })
        .unwrap();
        app.submit();
        app.settle().await;

        assert_eq!(app.result, Some(PredictionResult::Error("Failed to connect to server".into())));
    }

    async fn mount_race(server: &MockServer) {
        // First submission answers slowly, second answers at once
        Mock::given(method("POST"))
            .and(body_json(features_with_age(20)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"prediction": 10.0}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(body_json(features_with_age(21)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"prediction": 20.0})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn double_submit_last_arrival_wins() {
        let server = MockServer::start().await;
        mount_race(&server).await;

        let mut app = app_for(&server, false);
        app.submit();
        app.apply_override("age=21").unwrap();
        app.submit();
        assert_eq!(app.in_flight, 2);

        app.settle().await;
        assert_eq!(app.result, Some(PredictionResult::Score(20.0)));
        app.settle().await;
        assert_eq!(app.result, Some(PredictionResult::Score(10.0)));
        assert_eq!(app.in_flight, 0);
    }

    #[tokio::test]
    async fn double_submit_with_stale_discard() {
        let server = MockServer::start().await;
        mount_race(&server).await;

        let mut app = app_for(&server, true);
        app.submit();
        app.apply_override("age=21").unwrap();
        app.submit();

        app.settle().await;
        app.settle().await;
        assert_eq!(app.result, Some(PredictionResult::Score(20.0)));
        assert_eq!(app.in_flight, 0);
    }

    #[tokio::test]
    async fn tick_applies_finished_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"prediction": 55.0})))
            .mount(&server)
            .await;

        let mut app = app_for(&server, false);
        app.submit();

        for _ in 0..50 {
            app.tick();
            if app.in_flight == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(app.result, Some(PredictionResult::Score(55.0)));
    }
}
