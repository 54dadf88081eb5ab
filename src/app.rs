use std::{
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use chrono::Local;
use color_eyre::Result;
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    style::Stylize,
};
use tokio::{select, sync::mpsc};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    pipeline::{Category, EventPipeline, LogWatcher, PipelineError},
    tui::{self, AppViewModel, Event, TerminalGuard, Theme},
    ui::feed::{self, FeedLine, FeedScroll, FilterState, StyleTag},
};

pub struct KillfeedApp {
    tick_rate: Duration,
    pipeline: EventPipeline,
    watcher: LogWatcher,
    filters: FilterState,
    theme: Theme,
    scroll: FeedScroll,
    feed_height: usize,
    status: String,
    notification: Option<String>,
    last_failure: Option<String>,
    prompt: Option<String>,
    show_help: bool,
    refresh_requested: bool,
}

impl KillfeedApp {
    pub fn bootstrap(config: &Config) -> Self {
        // stands in for the file dialog when the default log is not around
        let prompt = (!config.log_file.exists()).then(|| config.log_file.display().to_string());

        Self {
            tick_rate: config.poll_interval(),
            pipeline: EventPipeline::new(),
            watcher: LogWatcher::new(config.log_file.clone()),
            filters: config.initial_filters(),
            theme: if config.light {
                Theme::Light
            } else {
                Theme::Dark
            },
            scroll: FeedScroll::default(),
            feed_height: 0,
            status: "waiting for first read".to_string(),
            notification: None,
            last_failure: None,
            prompt,
            show_help: false,
            refresh_requested: true,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!(path = %self.watcher.path().display(), "starting kill feed");

        let mut terminal = TerminalGuard::new()?;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let event_handle = tui::spawn_event_loop(tx, self.tick_rate);

        loop {
            if std::mem::take(&mut self.refresh_requested) && self.prompt.is_none() {
                self.poll_log().await;
            }

            self.feed_height = tui::feed_viewport_height(terminal.size()?);
            let view_model = self.build_view_model();
            terminal.draw(|frame| tui::render_app(frame, &view_model))?;

            let exit_requested = select! {
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_event(event),
                        None => true,
                    }
                }
                ctrl_c = tokio::signal::ctrl_c() => {
                    if let Err(err) = ctrl_c {
                        warn!(?err, "failed to listen for ctrl+c");
                    } else {
                        info!("received ctrl+c");
                    }
                    true
                }
            };

            if exit_requested {
                break;
            }
        }

        drop(terminal);
        drop(rx);

        if let Err(err) = event_handle.await {
            warn!(?err, "terminal event loop task ended unexpectedly");
        }

        info!("kill feed shutting down");
        Ok(())
    }

    /// One tick: re-read the log if its modification time moved.
    async fn poll_log(&mut self) {
        match self.watcher.poll().await {
            Ok(false) => {}
            Ok(true) => self.refresh().await,
            Err(err) => self.report_failure(err),
        }
    }

    async fn refresh(&mut self) {
        let path = self.watcher.path().to_path_buf();

        match self.pipeline.refresh(&path).await {
            Ok(summary) => {
                self.last_failure = None;
                self.status = format!(
                    "{} events · updated {}",
                    self.pipeline.records().len(),
                    Local::now().format("%H:%M:%S")
                );
                debug!(
                    total = summary.total,
                    rebuilt = summary.rebuilt,
                    "feed refreshed"
                );
            }
            Err(err) => self.report_failure(err),
        }
    }

    fn report_failure(&mut self, err: PipelineError) {
        self.watcher.invalidate();
        self.status = "read failed, retrying".to_string();

        let message = err.to_string();
        if self.last_failure.as_deref() == Some(message.as_str()) {
            return;
        }

        warn!(error = %message, "log refresh failed");
        self.notification = Some(message.clone());
        self.last_failure = Some(message);
    }

    fn open(&mut self, path: PathBuf) {
        info!(path = %path.display(), "log file selected");
        self.watcher = LogWatcher::new(path);
        self.pipeline.rewind();
        self.last_failure = None;
        self.refresh_requested = true;
    }

    fn feed_lines(&self) -> Vec<FeedLine> {
        feed::apply_filters(self.pipeline.records(), &self.filters)
    }

    fn build_view_model(&mut self) -> AppViewModel {
        let lines = self.feed_lines();
        self.scroll = feed::apply_scroll(
            feed::plan_scroll(&self.scroll),
            &lines,
            self.pipeline.generation(),
            self.feed_height,
        );

        let visible = lines
            .into_iter()
            .skip(self.scroll.offset)
            .take(self.feed_height)
            .collect();

        AppViewModel {
            player: self.pipeline.session().current_player().to_string(),
            log_path: self.watcher.path().display().to_string(),
            status: self.status.clone(),
            tally: feed::tally(self.pipeline.records()),
            filters: self.filters,
            visible,
            scroll: self.scroll,
            theme: self.theme,
            prompt: self.prompt.clone(),
            notification: self.notification.clone(),
            show_help: self.show_help,
        }
    }

    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Input(key) => self.handle_key(key),
            Event::Tick => {
                self.refresh_requested = true;
                false
            }
            Event::Resize(width, height) => {
                debug!(%width, %height, "terminal resized");
                false
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        if self.notification.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.notification = None;
            }
            return false;
        }

        if let Some(input) = self.prompt.as_mut() {
            match key.code {
                KeyCode::Char(ch) => input.push(ch),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Esc => self.prompt = None,
                KeyCode::Enter => {
                    let path = input.trim().to_string();
                    self.prompt = None;
                    if !path.is_empty() {
                        self.open(PathBuf::from(path));
                    }
                }
                _ => {}
            }
            return false;
        }

        if self.show_help {
            if matches!(
                key.code,
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return false;
        }

        let page = self.feed_height.max(1) as isize;

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return true,
            KeyCode::Char('1') => self.filters.toggle(Category::PlayerKill),
            KeyCode::Char('2') => self.filters.toggle(Category::PlayerDeath),
            KeyCode::Char('3') => self.filters.toggle(Category::OtherKill),
            KeyCode::Char('t') | KeyCode::Char('T') => self.theme = self.theme.toggled(),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('o') | KeyCode::Char('O') => {
                self.prompt = Some(self.watcher.path().display().to_string());
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.pipeline.rewind();
                self.watcher.invalidate();
                self.refresh_requested = true;
            }
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::PageUp => self.scroll_by(-page),
            KeyCode::PageDown => self.scroll_by(page),
            KeyCode::Home => {
                let lines = self.feed_lines();
                self.scroll.scroll_to(0, &lines);
            }
            KeyCode::End => {
                let lines = self.feed_lines();
                self.scroll.scroll_to(usize::MAX, &lines);
            }
            _ => {}
        }

        false
    }

    fn scroll_by(&mut self, delta: isize) {
        let lines = self.feed_lines();
        self.scroll.scroll_by(delta, &lines);
    }
}

/// Non-interactive mode: read the log once and print the filtered feed.
pub async fn print_once(config: &Config) -> Result<()> {
    let mut pipeline = EventPipeline::new();
    pipeline.refresh(&config.log_file).await?;

    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "Player Name: {}",
        pipeline.session().current_player()
    )?;

    for line in feed::apply_filters(pipeline.records(), &config.initial_filters()) {
        let text = line.text.as_str();
        let styled = match line.style {
            StyleTag::PlayerKill => text.green(),
            StyleTag::PlayerDeath => text.yellow(),
            StyleTag::OtherKill => text.red(),
        };
        writeln!(stdout, "{styled}")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const LOGIN: &str = "<2024-03-09T20:01:12.004Z> [Notice] <AccountLoginCharacterStatus_Character> Character: accountId 4 - name JohnDoe - state STATE_CURRENT";
    const KILL: &str = "<2024-03-09T20:14:55.120Z> [Notice] <Actor Death> CActor::Kill: 'NPC_Pilot' [123] in zone 'x' killed by 'JohnDoe' [456] using 'rifle' [Class unknown] with damage type 'Bullet' from direction x: 0";
    const OTHER: &str = "<2024-03-09T20:30:00.000Z> [Notice] <Actor Death> CActor::Kill: 'Alice' [1] in zone 'x' killed by 'Bob' [2] using 'rifle' [Class unknown] with damage type 'Crash' from direction x: 0";

    fn app_for(path: &std::path::Path) -> KillfeedApp {
        let arg = path.display().to_string();
        let config =
            Config::try_parse_from(["killfeed", arg.as_str()]).expect("config should parse");
        KillfeedApp::bootstrap(&config)
    }

    fn press(app: &mut KillfeedApp, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn missing_default_log_opens_prompt() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = app_for(&dir.path().join("game.log"));
        assert!(app.prompt.is_some());
    }

    #[tokio::test]
    async fn tick_refresh_populates_feed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("game.log");
        std::fs::write(&path, format!("{LOGIN}\n{KILL}\n{OTHER}\n")).expect("write log");

        let mut app = app_for(&path);
        app.feed_height = 10;
        app.poll_log().await;

        let view = app.build_view_model();
        assert_eq!(view.player, "JohnDoe");
        assert_eq!(view.visible.len(), 2);
        assert_eq!(view.tally.player_kills, 1);
        assert!(view.notification.is_none());

        press(&mut app, KeyCode::Char('3'));
        let view = app.build_view_model();
        assert_eq!(view.visible.len(), 1);
        assert_eq!(view.visible[0].style, StyleTag::PlayerKill);

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.build_view_model().visible.len(), 2);
    }

    #[tokio::test]
    async fn read_failure_notifies_once_and_keeps_feed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("game.log");
        std::fs::write(&path, format!("{LOGIN}\n{KILL}\n")).expect("write log");

        let mut app = app_for(&path);
        app.poll_log().await;
        assert_eq!(app.pipeline.records().len(), 1);

        std::fs::remove_file(&path).expect("remove log");
        app.poll_log().await;
        assert!(app.notification.is_some());
        assert_eq!(app.pipeline.records().len(), 1);

        press(&mut app, KeyCode::Enter);
        assert!(app.notification.is_none());

        app.poll_log().await;
        assert!(
            app.notification.is_none(),
            "same failure is not re-reported"
        );

        std::fs::write(&path, format!("{LOGIN}\n{KILL}\n{KILL}\n")).expect("rewrite log");
        app.poll_log().await;
        assert_eq!(app.pipeline.records().len(), 2);
        assert!(app.last_failure.is_none());
    }

    #[test]
    fn prompt_switches_log_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = dir.path().join("first.log");
        std::fs::write(&first, "").expect("write log");
        let mut app = app_for(&first);
        app.refresh_requested = false;

        press(&mut app, KeyCode::Char('o'));
        let current = app.prompt.clone().expect("prompt open");
        for _ in 0..current.chars().count() {
            press(&mut app, KeyCode::Backspace);
        }
        for ch in "other.log".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        press(&mut app, KeyCode::Enter);

        assert!(app.prompt.is_none());
        assert_eq!(app.watcher.path(), std::path::Path::new("other.log"));
        assert!(app.refresh_requested);
    }

    #[tokio::test]
    async fn reopening_same_path_reads_replaced_log() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("game.log");
        std::fs::write(&path, format!("{LOGIN}\n{KILL}\n")).expect("write log");

        let mut app = app_for(&path);
        app.poll_log().await;
        let generation = app.pipeline.generation();

        press(&mut app, KeyCode::Char('o'));
        std::fs::write(&path, format!("{OTHER}\n").repeat(4)).expect("replace log");
        press(&mut app, KeyCode::Enter);
        assert!(app.refresh_requested);

        app.poll_log().await;
        assert_eq!(app.pipeline.generation(), generation + 1);
        assert_eq!(app.pipeline.records().len(), 4);
        assert_eq!(app.pipeline.session().current_player(), "JohnDoe");
        assert_eq!(feed::tally(app.pipeline.records()).other_kills, 4);
    }

    #[test]
    fn quit_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("game.log");
        std::fs::write(&path, "").expect("write log");
        let mut app = app_for(&path);

        assert!(!press(&mut app, KeyCode::Char('?')));
        assert!(!press(&mut app, KeyCode::Char('q')), "q closes help first");
        assert!(press(&mut app, KeyCode::Char('q')));
        assert!(app.handle_key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
    }
}
