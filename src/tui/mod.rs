use std::{
    io::{self, Stdout},
    rc::Rc,
    time::{Duration, Instant},
};

use crate::ui::feed::{FeedLine, FeedScroll, FilterState, StyleTag, Tally};
use color_eyre::Result;
use crossterm::{
    event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use tokio::{sync::mpsc, task};
use tracing::{debug, error};

#[derive(Debug)]
pub enum Event {
    Input(KeyEvent),
    Tick,
    Resize(u16, u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: Color::Reset,
                text: Color::Gray,
                accent: Color::Cyan,
                muted: Color::DarkGray,
                player_kill: Color::Green,
                player_death: Color::Yellow,
                other_kill: Color::Red,
            },
            Theme::Light => Palette {
                background: Color::White,
                text: Color::Black,
                accent: Color::Blue,
                muted: Color::Rgb(110, 110, 110),
                player_kill: Color::Rgb(0, 120, 0),
                player_death: Color::Rgb(160, 100, 0),
                other_kill: Color::Rgb(170, 0, 0),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    background: Color,
    text: Color,
    accent: Color,
    muted: Color,
    player_kill: Color,
    player_death: Color,
    other_kill: Color,
}

impl Palette {
    fn style_for(&self, tag: StyleTag) -> Style {
        let color = match tag {
            StyleTag::PlayerKill => self.player_kill,
            StyleTag::PlayerDeath => self.player_death,
            StyleTag::OtherKill => self.other_kill,
        };
        Style::default().fg(color)
    }
}

#[derive(Debug, Clone)]
pub struct AppViewModel {
    pub player: String,
    pub log_path: String,
    pub status: String,
    pub tally: Tally,
    pub filters: FilterState,
    /// Only the lines inside the viewport.
    pub visible: Vec<FeedLine>,
    pub scroll: FeedScroll,
    pub theme: Theme,
    pub prompt: Option<String>,
    pub notification: Option<String>,
    pub show_help: bool,
}

pub struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;

        Ok(Self { terminal })
    }

    pub fn size(&self) -> Result<Rect> {
        Ok(self.terminal.size()?)
    }

    pub fn draw<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Frame<'_>),
    {
        self.terminal.draw(f)?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            error!(?err, "failed to disable raw mode");
        }

        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, LeaveAlternateScreen) {
            error!(?err, "failed to leave alternate screen");
        }

        if let Err(err) = self.terminal.show_cursor() {
            error!(?err, "failed to show cursor");
        }
    }
}

/// Forwards key presses and resizes, and emits a `Tick` every `tick_rate`.
/// The tick is what drives log polling.
pub fn spawn_event_loop(
    tx: mpsc::UnboundedSender<Event>,
    tick_rate: Duration,
) -> task::JoinHandle<()> {
    task::spawn_blocking(move || {
        let mut last_tick = Instant::now();

        loop {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            match event::poll(timeout) {
                Ok(true) => match event::read() {
                    Ok(CrosstermEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                        if tx.send(Event::Input(key)).is_err() {
                            break;
                        }
                    }
                    Ok(CrosstermEvent::Resize(w, h)) => {
                        if tx.send(Event::Resize(w, h)).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        error!(?err, "failed to read terminal event");
                        break;
                    }
                },
                Ok(false) => {}
                Err(err) => {
                    error!(?err, "failed to poll terminal events");
                    break;
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if tx.send(Event::Tick).is_err() {
                    break;
                }
                last_tick = Instant::now();
            }
        }

        debug!("terminal event loop terminated");
    })
}

fn split(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(area)
}

/// Number of feed rows visible for a terminal of size `area`.
pub fn feed_viewport_height(area: Rect) -> usize {
    inner(split(area)[2]).height as usize
}

pub fn render_app(frame: &mut Frame<'_>, view_model: &AppViewModel) {
    let palette = view_model.theme.palette();
    let area = frame.size();

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
        area,
    );

    let layout = split(area);
    render_header(frame, layout[0], view_model, &palette);
    render_filters(frame, layout[1], view_model, &palette);
    render_feed(frame, layout[2], view_model, &palette);
    render_footer(frame, layout[3], &palette);

    if view_model.show_help {
        render_help(frame, area, &palette);
    }

    if let Some(input) = &view_model.prompt {
        render_prompt(frame, area, input, &palette);
    }

    if let Some(message) = &view_model.notification {
        render_notification(frame, area, message, &palette);
    }
}

fn render_header(frame: &mut Frame<'_>, area: Rect, view_model: &AppViewModel, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .title(Span::styled(
            format!("Player Name: {}", view_model.player),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(palette.muted));

    let details = Line::from(vec![
        Span::styled(view_model.log_path.clone(), Style::default().fg(palette.text)),
        Span::styled(
            format!(" · {}", view_model.status),
            Style::default().fg(palette.muted),
        ),
    ]);

    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(details),
        Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(2),
            ..area
        },
    );
}

fn render_filters(frame: &mut Frame<'_>, area: Rect, view_model: &AppViewModel, palette: &Palette) {
    let toggle = |key: char, label: &str, enabled: bool, count: usize, tag: StyleTag| {
        let mark = if enabled { "x" } else { " " };
        let style = if enabled {
            palette.style_for(tag)
        } else {
            Style::default().fg(palette.muted)
        };
        Span::styled(format!("[{mark}] {key} {label} ({count})  "), style)
    };

    let filters = &view_model.filters;
    let tally = &view_model.tally;
    let line = Line::from(vec![
        toggle(
            '1',
            "Player kills",
            filters.show_player_kills,
            tally.player_kills,
            StyleTag::PlayerKill,
        ),
        toggle(
            '2',
            "Player deaths",
            filters.show_player_deaths,
            tally.player_deaths,
            StyleTag::PlayerDeath,
        ),
        toggle(
            '3',
            "Other kills",
            filters.show_other_kills,
            tally.other_kills,
            StyleTag::OtherKill,
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn render_feed(frame: &mut Frame<'_>, area: Rect, view_model: &AppViewModel, palette: &Palette) {
    let scroll = &view_model.scroll;
    let title = if scroll.total == 0 {
        "Feed".to_string()
    } else {
        let first = scroll.offset + 1;
        let last = (scroll.offset + view_model.visible.len()).min(scroll.total);
        let follow = if scroll.at_bottom() { " · live" } else { "" };
        format!("Feed {first}-{last} of {}{follow}", scroll.total)
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .title_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(block, area);

    if view_model.visible.is_empty() {
        let content = Paragraph::new(
            "No kill events to show yet.\n\nPress `o` to pick a different log, `1`/`2`/`3` to toggle filters, `q` to exit.",
        )
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(palette.muted));

        frame.render_widget(content, inner(area));
        return;
    }

    let items: Vec<ListItem> = view_model
        .visible
        .iter()
        .map(|line| ListItem::new(line.text.clone()).style(palette.style_for(line.style)))
        .collect();

    frame.render_widget(List::new(items), inner(area));
}

fn render_footer(frame: &mut Frame<'_>, area: Rect, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(palette.muted));

    let content = Paragraph::new(
        "q quit · 1/2/3 filters · ↑/↓ PgUp/PgDn Home/End scroll · o open log · r reload · t theme · ? help",
    )
    .style(Style::default().fg(palette.muted));

    frame.render_widget(block, area);
    frame.render_widget(
        content,
        Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(1),
            ..area
        },
    );
}

fn render_help(frame: &mut Frame<'_>, area: Rect, palette: &Palette) {
    let popup = centered(area, 60, 14);
    let lines = vec![
        Line::from("1 / 2 / 3   toggle player kills / deaths / other kills"),
        Line::from("↑ ↓ j k     scroll one line"),
        Line::from("PgUp PgDn   scroll one page"),
        Line::from("Home End    jump to oldest / follow newest"),
        Line::from("o           open a different log file"),
        Line::from("r           re-read the log from the start"),
        Line::from("t           switch dark / light theme"),
        Line::from("q  Ctrl+C   quit"),
        Line::default(),
        Line::from(Span::styled(
            "Enter, Esc or ? closes this window",
            Style::default().fg(palette.muted),
        )),
    ];

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .block(popup_block("Help", palette.accent, palette))
            .style(Style::default().fg(palette.text)),
        popup,
    );
}

fn render_prompt(frame: &mut Frame<'_>, area: Rect, input: &str, palette: &Palette) {
    let popup = centered(area, 70, 5);
    let lines = vec![
        Line::from(vec![
            Span::styled(input.to_string(), Style::default().fg(palette.text)),
            Span::styled("▏", Style::default().fg(palette.accent)),
        ]),
        Line::from(Span::styled(
            "Enter to open · Esc to cancel",
            Style::default().fg(palette.muted),
        )),
    ];

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(popup_block("Locate your game log", palette.accent, palette)),
        popup,
    );
}

fn render_notification(frame: &mut Frame<'_>, area: Rect, message: &str, palette: &Palette) {
    let popup = centered(area, 70, 7);
    let lines = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(palette.text),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Showing the last successful read. Enter or Esc to dismiss.",
            Style::default().fg(palette.muted),
        )),
    ];

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(popup_block("Error", palette.other_kill, palette)),
        popup,
    );
}

fn popup_block<'a>(title: &'a str, border: Color, palette: &Palette) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title_style(Style::default().fg(border).add_modifier(Modifier::BOLD))
        .style(Style::default().bg(palette.background))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn inner(area: Rect) -> Rect {
    Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}
