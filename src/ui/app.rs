use crate::engine::ControlPlane;
use crate::fingerprint::{self, Technologies};
use crate::scan::events::{EventSender, ScanEvent};
use crate::scan::models::{ScanResult, ScanState, Stats};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Rows reserved for everything around the results list.
const CHROME_ROWS: u16 = 15;
const MIN_RESULT_ROWS: usize = 5;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
    Scan(ScanEvent),
}

/// Front-end state machine. Each event triggers at most one control operation.
pub struct App {
    plane: ControlPlane,
    events: EventSender,
    state: ScanState,
    results: Vec<ScanResult>,
    stats: Stats,
    scroll: usize,
    status_filter: Option<u16>,
    show_help: bool,
    show_tech: bool,
    technologies: Option<Technologies>,
    tech_requested: bool,
    height: u16,
    notice: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(plane: ControlPlane, events: EventSender) -> Self {
        let state = plane.state();
        Self {
            plane,
            events,
            state,
            results: Vec::new(),
            stats: Stats::default(),
            scroll: 0,
            status_filter: None,
            show_help: false,
            show_tech: false,
            technologies: None,
            tech_requested: false,
            height: 24,
            notice: None,
            should_quit: false,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Resize(_, height) => {
                self.height = height;
                self.clamp_scroll();
            }
            AppEvent::Tick => {}
            AppEvent::Scan(event) => self.handle_scan_event(event),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('s') => {
                if self.plane.state() == ScanState::Ready {
                    self.apply(ControlPlane::start);
                }
            }
            KeyCode::Char('p') => match self.plane.state() {
                ScanState::Scanning => self.apply(ControlPlane::pause),
                ScanState::Paused => self.apply(ControlPlane::resume),
                _ => {}
            },
            KeyCode::Char('r') => {
                if matches!(self.plane.state(), ScanState::Completed | ScanState::Paused) {
                    self.apply(ControlPlane::restart);
                }
            }
            KeyCode::Char('h') => self.show_help = !self.show_help,
            KeyCode::Char('t') => self.show_tech = !self.show_tech,
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.scroll < self.max_scroll() {
                    self.scroll += 1;
                }
            }
            KeyCode::Char(c @ '1'..='5') => {
                // 1..4 select 2xx..5xx, 5 shows everything
                self.status_filter = match c {
                    '5' => None,
                    c => c.to_digit(10).map(|d| d as u16 + 1),
                };
                self.scroll = 0;
            }
            _ => {}
        }
    }

    fn apply(&mut self, op: fn(&ControlPlane) -> Result<(), crate::scan::errors::ScanError>) {
        match op(&self.plane) {
            Ok(()) => {
                self.notice = None;
                self.state = self.plane.state();
            }
            Err(e) => {
                tracing::warn!("Control operation failed: {}", e);
                self.notice = Some(e.to_string());
            }
        }
    }

    fn quit(&mut self) {
        self.plane.quit();
        self.state = self.plane.state();
        self.should_quit = true;
    }

    fn handle_scan_event(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Result(result) => self.results.push(result),
            ScanEvent::Stats(stats) => self.stats = stats,
            ScanEvent::StateChanged(state) => {
                self.state = state;
                match state {
                    // every event of a discarded run precedes this one
                    ScanState::Ready => {
                        self.results.clear();
                        self.stats = Stats::default();
                        self.scroll = 0;
                    }
                    ScanState::Paused => self.request_technologies(),
                    _ => {}
                }
            }
            ScanEvent::Completed => {
                self.state = ScanState::Completed;
                self.request_technologies();
            }
            ScanEvent::Technologies(technologies) => self.technologies = Some(technologies),
        }
    }

    /// Fingerprint the target once per session, on completion or first pause.
    fn request_technologies(&mut self) {
        if !self.plane.config().tech_detect || self.tech_requested || self.should_quit {
            return;
        }
        self.tech_requested = true;
        fingerprint::spawn_detection(self.plane.transport(), self.plane.config().base_url(), self.events.clone());
    }

    pub fn filtered_results(&self) -> Vec<&ScanResult> {
        self.results
            .iter()
            .filter(|r| self.status_filter.is_none_or(|class| r.class() == class))
            .collect()
    }

    pub fn visible_rows(&self) -> usize {
        (self.height.saturating_sub(CHROME_ROWS) as usize).max(MIN_RESULT_ROWS)
    }

    fn max_scroll(&self) -> usize {
        self.filtered_results().len().saturating_sub(self.visible_rows())
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.min(self.max_scroll());
    }

    pub fn plane(&self) -> &ControlPlane {
        &self.plane
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn results(&self) -> &[ScanResult] {
        &self.results
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn status_filter(&self) -> Option<u16> {
        self.status_filter
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn show_tech(&self) -> bool {
        self.show_tech
    }

    pub fn technologies(&self) -> Option<&Technologies> {
        self.technologies.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::engine::testing::{wordlist_file, MockTransport};
    use crate::scan::events;
    use std::sync::Arc;

    fn key(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn result(path: &str, status: u16) -> AppEvent {
        AppEvent::Scan(ScanEvent::Result(ScanResult {
            path: path.to_string(),
            status,
            size: 0,
            lines: 0,
        }))
    }

    fn app(words: &tempfile::NamedTempFile) -> App {
        let (tx, _rx) = events::channel();
        let plane = ControlPlane::new(
            ScanConfig {
                target: "http://x".to_string(),
                wordlist: words.path().to_path_buf(),
                threads: 1,
                ..Default::default()
            },
            Arc::new(MockTransport::new().with_default_status(200)),
            None,
        );
        App::new(plane, tx)
    }

    #[tokio::test]
    async fn test_keys_without_effect_in_ready() {
        let words = wordlist_file(&["a"]);
        let mut app = app(&words);
        app.handle_event(key('p'));
        app.handle_event(key('r'));
        assert_eq!(app.plane().state(), ScanState::Ready);
        assert!(app.notice().is_none());
    }

    #[tokio::test]
    async fn test_start_then_pause_toggles() {
        let words = wordlist_file(&["a", "b", "c"]);
        let mut app = app(&words);
        app.handle_event(key('s'));
        assert_eq!(app.state(), ScanState::Scanning);
        app.handle_event(key('p'));
        assert_eq!(app.state(), ScanState::Paused);
        app.handle_event(key('p'));
        assert_eq!(app.state(), ScanState::Scanning);
    }

    #[tokio::test]
    async fn test_missing_wordlist_reported_as_notice() {
        let words = wordlist_file(&[]);
        let path = words.path().to_path_buf();
        let mut app = app(&words);
        drop(words);
        assert!(!path.exists());

        app.handle_event(key('s'));
        assert_eq!(app.state(), ScanState::Ready);
        assert!(app.notice().is_some());
    }

    #[tokio::test]
    async fn test_status_filter_and_scroll() {
        let words = wordlist_file(&["a"]);
        let mut app = app(&words);
        app.handle_event(AppEvent::Resize(80, 20));
        for i in 0..8 {
            app.handle_event(result(&format!("http://x/ok{}", i), 200));
        }
        app.handle_event(result("http://x/moved", 301));
        app.handle_event(result("http://x/denied", 403));

        assert_eq!(app.visible_rows(), 5);
        for _ in 0..10 {
            app.handle_event(key('j'));
        }
        assert_eq!(app.scroll(), 5);

        app.handle_event(key('2'));
        assert_eq!(app.status_filter(), Some(3));
        assert_eq!(app.scroll(), 0);
        let filtered: Vec<&str> = app.filtered_results().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(filtered, vec!["http://x/moved"]);

        app.handle_event(key('5'));
        assert_eq!(app.filtered_results().len(), 10);

        app.handle_event(key('k'));
        assert_eq!(app.scroll(), 0);
    }

    #[tokio::test]
    async fn test_ready_event_clears_view() {
        let words = wordlist_file(&["a"]);
        let mut app = app(&words);
        app.handle_event(result("http://x/a", 200));
        app.handle_event(AppEvent::Scan(ScanEvent::StateChanged(ScanState::Ready)));
        assert!(app.results().is_empty());
        assert_eq!(app.stats(), &Stats::default());
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let words = wordlist_file(&["a"]);
        let mut app = app(&words);
        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(app.should_quit());

        let mut app = self::app(&words);
        app.handle_event(key('h'));
        assert!(app.show_help());
        app.handle_event(key('q'));
        assert!(app.should_quit());
    }
}
