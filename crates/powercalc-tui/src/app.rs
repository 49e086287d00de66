//! Application state management for powercalc.
//!
//! This module contains the core `App` struct that manages the calculator
//! form (selected calculator, field text, result line) and coordinates the
//! background asset worker that keeps the offline cache current.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use powercalc_core::assets::{
    AssetCacheManager, AssetWorker, DiskCacheStore, HttpFetcher, LifecycleState, ServedFrom,
    WorkerEvent, DEFAULT_ASSETS,
};
use powercalc_core::calculators::{self, Calculator, InputField};
use powercalc_core::config::Config;
use powercalc_core::utils::age_display;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Maximum length for a numeric input field.
/// 24 chars fits any realistic value with separators and an exponent.
const MAX_FIELD_LENGTH: usize = 24;

/// Asset whose `name` becomes the title bar text
const MANIFEST_PATH: &str = "/manifest.json";

/// Title used until the manifest has been read
pub const DEFAULT_TITLE: &str = "PowerCalc";

// ============================================================================
// UI State Types
// ============================================================================

/// Which form element has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Selector,
    Field(usize),
    Compute,
    Clear,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    SelectingCalculator,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// What the result area shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLine {
    Value(String),
    Error(String),
}

impl ResultLine {
    pub fn text(&self) -> &str {
        match self {
            ResultLine::Value(s) | ResultLine::Error(s) => s,
        }
    }
}

/// Asset cache state shown in the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub state: LifecycleState,
    /// When the version answering fetches was cached
    pub cached_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for CacheStatus {
    fn default() -> Self {
        Self {
            state: LifecycleState::Uninstalled,
            cached_at: None,
            last_error: None,
        }
    }
}

impl CacheStatus {
    pub fn summary(&self) -> String {
        let ready = match self.cached_at {
            Some(cached_at) => format!("Offline ready (cached {})", age_display(cached_at)),
            None => "Offline ready".to_string(),
        };

        match self.state {
            LifecycleState::Active if self.last_error.is_some() => {
                format!("{} - update failed", ready)
            }
            LifecycleState::Active => ready,
            LifecycleState::Installing | LifecycleState::Installed => {
                if self.cached_at.is_some() {
                    format!("{} - updating...", ready)
                } else {
                    "Caching assets...".to_string()
                }
            }
            LifecycleState::Uninstalled if self.last_error.is_some() => {
                "Online only (cache failed)".to_string()
            }
            LifecycleState::Uninstalled => "Online only".to_string(),
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from tasks spawned by the app.
enum BackgroundResult {
    /// Manifest read through the asset cache (title, where it came from)
    Manifest(String, ServedFrom),
    /// Manifest could not be fetched or parsed
    ManifestFailed(String),
}

#[derive(Debug, Deserialize)]
struct Manifest {
    name: Option<String>,
    short_name: Option<String>,
}

/// Pull a display title out of a web app manifest.
fn manifest_title(body: &[u8]) -> Option<String> {
    let manifest: Manifest = serde_json::from_slice(body).ok()?;
    manifest
        .name
        .or(manifest.short_name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Build the disk-backed asset cache manager described by the config.
pub fn build_asset_manager(config: &Config) -> Result<AssetCacheManager<DiskCacheStore, HttpFetcher>> {
    let store = DiskCacheStore::new(config.assets_dir()?)?;
    let fetcher = HttpFetcher::new(&config.asset_origin())?;
    Ok(AssetCacheManager::with_assets(
        store,
        fetcher,
        config.cache_prefix(),
        DEFAULT_ASSETS.iter().map(|a| a.to_string()).collect(),
    ))
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    pub config: Config,

    // UI State
    pub state: AppState,
    pub focus: Focus,
    pub calculator: Calculator,
    pub dropdown_selection: usize,
    pub field_values: Vec<String>,
    pub result: Option<ResultLine>,
    pub title: String,

    // Status
    pub status_message: Option<String>,
    pub cache_status: CacheStatus,

    // Asset worker
    worker: Option<AssetWorker>,
    worker_rx: Option<mpsc::Receiver<WorkerEvent>>,

    // Background task channel
    background_rx: mpsc::Receiver<BackgroundResult>,
    background_tx: mpsc::Sender<BackgroundResult>,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let calculator = Calculator::ALL[0];

        Self {
            config,

            state: AppState::Normal,
            focus: Focus::Field(0),
            calculator,
            dropdown_selection: 0,
            field_values: vec![String::new(); calculator.inputs().len()],
            result: None,
            title: DEFAULT_TITLE.to_string(),

            status_message: None,
            cache_status: CacheStatus::default(),

            worker: None,
            worker_rx: None,

            background_rx: rx,
            background_tx: tx,
        }
    }

    // =========================================================================
    // Calculator Form
    // =========================================================================

    pub fn inputs(&self) -> &'static [InputField] {
        self.calculator.inputs()
    }

    /// Open the calculator dropdown on the current selection
    pub fn open_selector(&mut self) {
        self.dropdown_selection = Calculator::ALL
            .iter()
            .position(|c| *c == self.calculator)
            .unwrap_or(0);
        self.state = AppState::SelectingCalculator;
    }

    /// Switch to another calculator. The form starts empty.
    pub fn select_calculator(&mut self, index: usize) {
        let Some(&calculator) = Calculator::ALL.get(index) else {
            return;
        };
        debug!(calculator = calculator.name(), "Calculator selected");
        self.calculator = calculator;
        self.field_values = vec![String::new(); calculator.inputs().len()];
        self.result = None;
        self.focus = Focus::Field(0);
        self.state = AppState::Normal;
    }

    /// Run the selected calculator on the current field text
    pub fn compute(&mut self) {
        let raw: HashMap<String, String> = self
            .inputs()
            .iter()
            .zip(&self.field_values)
            .map(|(field, value)| (field.key.to_string(), value.clone()))
            .collect();

        let name = self.calculator.name();
        let outcome = calculators::compute(name, &raw)
            .and_then(|result| calculators::format_result(name, &result));

        self.result = Some(match outcome {
            Ok(text) => ResultLine::Value(text),
            Err(e) => {
                debug!(calculator = name, error = %e, "Computation rejected");
                ResultLine::Error(e.display())
            }
        });
    }

    /// Empty every field and the result
    pub fn clear(&mut self) {
        for value in &mut self.field_values {
            value.clear();
        }
        self.result = None;
        self.focus = Focus::Field(0);
    }

    pub fn focus_next(&mut self) {
        let fields = self.field_values.len();
        self.focus = match self.focus {
            Focus::Selector if fields > 0 => Focus::Field(0),
            Focus::Selector => Focus::Compute,
            Focus::Field(i) if i + 1 < fields => Focus::Field(i + 1),
            Focus::Field(_) => Focus::Compute,
            Focus::Compute => Focus::Clear,
            Focus::Clear => Focus::Selector,
        };
    }

    pub fn focus_prev(&mut self) {
        let fields = self.field_values.len();
        self.focus = match self.focus {
            Focus::Selector => Focus::Clear,
            Focus::Field(0) => Focus::Selector,
            Focus::Field(i) => Focus::Field(i - 1),
            Focus::Compute if fields > 0 => Focus::Field(fields - 1),
            Focus::Compute => Focus::Selector,
            Focus::Clear => Focus::Compute,
        };
    }

    /// Type a character into the focused field. Returns false if rejected.
    pub fn push_char(&mut self, c: char) -> bool {
        let Focus::Field(i) = self.focus else {
            return false;
        };
        match self.field_values.get_mut(i) {
            Some(value) if can_add_field_char(value.len(), c) => {
                value.push(c);
                true
            }
            _ => false,
        }
    }

    pub fn pop_char(&mut self) {
        if let Focus::Field(i) = self.focus {
            if let Some(value) = self.field_values.get_mut(i) {
                value.pop();
            }
        }
    }

    // =========================================================================
    // Asset Cache
    // =========================================================================

    /// Start the asset worker and queue the start-up lifecycle:
    /// restore the previous version and install a new one. Activation
    /// follows once the install has succeeded.
    pub async fn start_asset_worker(&mut self) {
        let manager = match build_asset_manager(&self.config) {
            Ok(manager) => manager,
            Err(e) => {
                warn!(error = %e, "Asset cache unavailable");
                self.cache_status.last_error = Some(e.to_string());
                return;
            }
        };

        info!(origin = %self.config.asset_origin(), "Starting asset worker");
        let (worker, events) = AssetWorker::spawn(manager);
        self.attach_worker(worker, events).await;
    }

    async fn attach_worker(&mut self, worker: AssetWorker, events: mpsc::Receiver<WorkerEvent>) {
        for (event, sent) in [
            ("restore", worker.restore().await),
            ("install", worker.install().await),
        ] {
            if let Err(e) = sent {
                error!(event, error = %e, "Failed to queue asset lifecycle event");
            }
        }

        self.cache_status.state = LifecycleState::Installing;
        self.worker = Some(worker);
        self.worker_rx = Some(events);
    }

    /// Read the manifest through the cache in the background
    fn load_manifest(&self) {
        let Some(worker) = self.worker.clone() else {
            return;
        };
        let tx = self.background_tx.clone();

        tokio::spawn(async move {
            let result = match worker.fetch(MANIFEST_PATH).await {
                Ok(served) => match manifest_title(&served.response.body) {
                    Some(title) => BackgroundResult::Manifest(title, served.from),
                    None => BackgroundResult::ManifestFailed("manifest has no name".to_string()),
                },
                Err(e) => BackgroundResult::ManifestFailed(e.to_string()),
            };
            if let Err(e) = tx.send(result).await {
                error!(error = %e, "Failed to send manifest result - channel closed");
            }
        });
    }

    /// Check for completed background work
    pub async fn check_background_tasks(&mut self) {
        let mut events = Vec::new();
        if let Some(ref mut rx) = self.worker_rx {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        for event in events {
            self.process_worker_event(event).await;
        }

        while let Ok(result) = self.background_rx.try_recv() {
            self.process_background_result(result);
        }
    }

    async fn process_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Restored(Some(restoration)) => {
                debug!(version = %restoration.version, "Assets restored");
                self.cache_status.state = LifecycleState::Active;
                self.cache_status.cached_at = restoration.cached_at;
                self.load_manifest();
            }
            WorkerEvent::Restored(None) => {}
            WorkerEvent::Installed(installation) => {
                debug!(version = %installation.version, "Assets installed");
                self.cache_status.state = LifecycleState::Installed;
                if let Some(ref worker) = self.worker {
                    if let Err(e) = worker.activate().await {
                        error!(error = %e, "Failed to queue asset activation");
                    }
                }
            }
            WorkerEvent::Activated(activation) => {
                debug!(version = %activation.version, "Assets activated");
                self.cache_status.state = LifecycleState::Active;
                self.cache_status.cached_at = activation.cached_at;
                self.cache_status.last_error = None;
                if !activation.purged.is_empty() {
                    self.status_message = Some(format!(
                        "Assets updated ({} old version(s) removed)",
                        activation.purged.len()
                    ));
                }
                self.load_manifest();
            }
            WorkerEvent::Failed {
                event,
                error,
                state,
            } => {
                warn!(event, %error, "Asset lifecycle event failed");
                self.cache_status.state = state;
                self.cache_status.last_error = Some(error);
            }
        }
    }

    fn process_background_result(&mut self, result: BackgroundResult) {
        match result {
            BackgroundResult::Manifest(title, from) => {
                debug!(%title, ?from, "Manifest loaded");
                self.title = title;
            }
            BackgroundResult::ManifestFailed(e) => {
                debug!(error = %e, "Manifest unavailable");
            }
        }
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character may appear in a numeric field
fn is_numeric_input_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+' | 'e' | 'E')
}

/// Check if a field character should be accepted
pub fn can_add_field_char(current_len: usize, c: char) -> bool {
    current_len < MAX_FIELD_LENGTH && is_numeric_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use powercalc_core::assets::{
        Activation, AssetError, AssetResponse, Fetcher, Installation, MemoryCacheStore,
        Restoration,
    };

    fn app() -> App {
        App::new(Config::default())
    }

    fn type_into(app: &mut App, field: usize, text: &str) {
        app.focus = Focus::Field(field);
        for c in text.chars() {
            assert!(app.push_char(c), "rejected {:?}", c);
        }
    }

    // -------------------------------------------------------------------------
    // Form Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_new_app_starts_on_first_calculator() {
        let app = app();
        assert_eq!(app.calculator, Calculator::PowerFactor);
        assert_eq!(app.field_values.len(), 2);
        assert_eq!(app.focus, Focus::Field(0));
        assert_eq!(app.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_compute_power_factor() {
        let mut app = app();
        type_into(&mut app, 0, "80");
        type_into(&mut app, 1, "100");
        app.compute();
        assert_eq!(app.result, Some(ResultLine::Value("PF = 0.8000".to_string())));
    }

    #[test]
    fn test_compute_shows_validation_error() {
        let mut app = app();
        type_into(&mut app, 0, "120");
        type_into(&mut app, 1, "100");
        app.compute();
        assert_eq!(
            app.result,
            Some(ResultLine::Error("[error] kW cannot exceed kVA".to_string()))
        );

        // Still usable after an error
        app.focus = Focus::Field(0);
        app.pop_char();
        app.pop_char();
        app.pop_char();
        type_into(&mut app, 0, "60");
        app.compute();
        assert_eq!(app.result, Some(ResultLine::Value("PF = 0.6000".to_string())));
    }

    #[test]
    fn test_compute_blank_required_field_is_unexpected() {
        let mut app = app();
        type_into(&mut app, 1, "100");
        app.compute();
        let result = app.result.unwrap();
        assert!(result.text().starts_with("[unexpected] "));
    }

    #[test]
    fn test_select_calculator_resets_form() {
        let mut app = app();
        type_into(&mut app, 0, "80");
        app.compute();

        app.open_selector();
        assert_eq!(app.state, AppState::SelectingCalculator);
        app.select_calculator(3);

        assert_eq!(app.calculator, Calculator::OhmsLaw);
        assert_eq!(app.field_values, vec![String::new(); 3]);
        assert_eq!(app.result, None);
        assert_eq!(app.state, AppState::Normal);

        type_into(&mut app, 0, "120");
        type_into(&mut app, 1, "10");
        app.compute();
        assert_eq!(
            app.result.as_ref().map(ResultLine::text),
            Some("V=120.000 V, I=10.000 A, R=12.000 Ω")
        );
    }

    #[test]
    fn test_select_calculator_out_of_range_ignored() {
        let mut app = app();
        app.select_calculator(99);
        assert_eq!(app.calculator, Calculator::PowerFactor);
    }

    #[test]
    fn test_clear_empties_fields_and_result() {
        let mut app = app();
        type_into(&mut app, 0, "80");
        type_into(&mut app, 1, "100");
        app.compute();
        app.clear();
        assert!(app.field_values.iter().all(String::is_empty));
        assert_eq!(app.result, None);
        assert_eq!(app.focus, Focus::Field(0));
    }

    #[test]
    fn test_focus_cycle() {
        let mut app = app();
        app.focus = Focus::Selector;
        let expected = [
            Focus::Field(0),
            Focus::Field(1),
            Focus::Compute,
            Focus::Clear,
            Focus::Selector,
        ];
        for focus in expected {
            app.focus_next();
            assert_eq!(app.focus, focus);
        }
        for focus in expected.iter().rev().skip(1) {
            app.focus_prev();
            assert_eq!(app.focus, *focus);
        }
    }

    #[test]
    fn test_push_char_outside_field_rejected() {
        let mut app = app();
        app.focus = Focus::Compute;
        assert!(!app.push_char('1'));
        app.focus = Focus::Field(0);
        assert!(!app.push_char('q'));
        assert!(app.push_char('1'));
    }

    // -------------------------------------------------------------------------
    // Asset Status Tests
    // -------------------------------------------------------------------------

    /// Drain worker events until `done` holds.
    async fn settle(app: &mut App, done: impl Fn(&App) -> bool) {
        for _ in 0..1000 {
            app.check_background_tasks().await;
            if done(app) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("asset worker never settled: {:?}", app.cache_status);
    }

    /// Serves every asset, or answers 503 for everything when `down`.
    struct Origin {
        down: bool,
    }

    #[async_trait]
    impl Fetcher for Origin {
        async fn fetch(&self, path: &str) -> Result<AssetResponse, AssetError> {
            if self.down {
                return Ok(AssetResponse {
                    status: 503,
                    content_type: None,
                    body: Vec::new(),
                });
            }
            Ok(AssetResponse::ok("text/plain", path.as_bytes().to_vec()))
        }
    }

    fn spawn_worker(down: bool) -> (AssetWorker, mpsc::Receiver<WorkerEvent>) {
        AssetWorker::spawn(AssetCacheManager::new(
            MemoryCacheStore::new(),
            Origin { down },
        ))
    }

    #[tokio::test]
    async fn test_worker_events_update_cache_status() {
        let mut app = app();
        app.process_worker_event(WorkerEvent::Failed {
            event: "install",
            error: "Network error: connection refused".to_string(),
            state: LifecycleState::Uninstalled,
        })
        .await;
        assert_eq!(app.cache_status.summary(), "Online only (cache failed)");

        app.process_worker_event(WorkerEvent::Activated(Activation {
            version: "powercalc-assets-1".to_string(),
            purged: vec!["powercalc-assets-0".to_string()],
            cached_at: Some(Utc::now() - Duration::hours(2)),
        }))
        .await;
        assert_eq!(app.cache_status.state, LifecycleState::Active);
        assert_eq!(app.cache_status.summary(), "Offline ready (cached 2h ago)");
        assert_eq!(
            app.status_message.as_deref(),
            Some("Assets updated (1 old version(s) removed)")
        );
    }

    #[tokio::test]
    async fn test_restored_version_is_ready_while_updating() {
        let mut app = app();
        app.cache_status.state = LifecycleState::Installing;

        app.process_worker_event(WorkerEvent::Restored(Some(Restoration {
            version: "powercalc-assets-1".to_string(),
            cached_at: Some(Utc::now() - Duration::minutes(5)),
        })))
        .await;
        assert_eq!(app.cache_status.state, LifecycleState::Active);
        assert_eq!(app.cache_status.summary(), "Offline ready (cached 5m ago)");

        app.process_worker_event(WorkerEvent::Installed(Installation {
            version: "powercalc-assets-2".to_string(),
            cached: 8,
        }))
        .await;
        assert_eq!(
            app.cache_status.summary(),
            "Offline ready (cached 5m ago) - updating..."
        );
    }

    #[tokio::test]
    async fn test_activation_follows_successful_install() {
        let mut app = app();
        let (worker, events) = spawn_worker(false);
        app.attach_worker(worker, events).await;

        settle(&mut app, |app| app.cache_status.state == LifecycleState::Active).await;
        assert_eq!(app.cache_status.last_error, None);
        assert_eq!(app.cache_status.summary(), "Offline ready (cached just now)");
    }

    #[tokio::test]
    async fn test_failed_install_keeps_its_error() {
        let mut app = app();
        let (worker, events) = spawn_worker(true);
        app.attach_worker(worker, events).await;

        settle(&mut app, |app| app.cache_status.last_error.is_some()).await;

        // Give a stray activation every chance to report
        for _ in 0..50 {
            tokio::task::yield_now().await;
            app.check_background_tasks().await;
        }
        assert_eq!(app.cache_status.state, LifecycleState::Uninstalled);
        let error = app.cache_status.last_error.clone().unwrap_or_default();
        assert!(error.contains("returned status 503"), "{}", error);
        assert_eq!(app.cache_status.summary(), "Online only (cache failed)");
    }

    #[test]
    fn test_manifest_title() {
        assert_eq!(
            manifest_title(br#"{"name": "EE Calculators", "short_name": "EE"}"#),
            Some("EE Calculators".to_string())
        );
        assert_eq!(manifest_title(br#"{"short_name": "EE"}"#), Some("EE".to_string()));
        assert_eq!(manifest_title(br#"{"name": "  "}"#), None);
        assert_eq!(manifest_title(b"<html>"), None);
    }

    // -------------------------------------------------------------------------
    // Input Validation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_can_add_field_char() {
        assert!(can_add_field_char(0, '4'));
        assert!(can_add_field_char(0, '.'));
        assert!(can_add_field_char(0, ','));
        assert!(can_add_field_char(0, '-'));
        assert!(can_add_field_char(23, 'e'));
        // Exceeds max length
        assert!(!can_add_field_char(24, '1'));
        // Letters and control characters rejected
        assert!(!can_add_field_char(0, 'q'));
        assert!(!can_add_field_char(0, '?'));
        assert!(!can_add_field_char(0, '\n'));
    }
}
