pub mod watch;

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use chrono::{Local, TimeZone};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::{
    state::SessionState,
    telemetry::{
        self, ActorDeath, DisplayTime, LineClass, VehicleDestruction, sanitize_entity_name,
    },
};

pub use watch::LogWatcher;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not inspect {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Attribution bucket used for both filtering and colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    PlayerKill,
    PlayerDeath,
    OtherKill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillLevel {
    Soft,
    Hard,
    Unknown { from: u8, to: u8 },
}

impl KillLevel {
    pub fn from_levels(from: u8, to: u8) -> Self {
        match (from, to) {
            (0, 1) => KillLevel::Soft,
            (1, 2) | (0, 2) => KillLevel::Hard,
            (from, to) => KillLevel::Unknown { from, to },
        }
    }
}

impl fmt::Display for KillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillLevel::Soft => f.write_str("Soft Kill"),
            KillLevel::Hard => f.write_str("Hard Kill"),
            KillLevel::Unknown { from, to } => write!(f, "Unknown Kill Type ({from}->{to})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ActorDeath(ActorDeath),
    VehicleDestruction(VehicleDestruction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp: DisplayTime,
    pub kind: EventKind,
}

impl Event {
    /// Renders the event and decides its category against `session`.
    ///
    /// Vehicle records never produce [`Category::PlayerDeath`]; only the
    /// causer is compared with the player.
    pub fn describe(&self, session: &SessionState) -> (String, Category) {
        match &self.kind {
            EventKind::ActorDeath(death) => {
                let category = if session.is_player(&death.killer) {
                    Category::PlayerKill
                } else if session.is_player(&death.killed) {
                    Category::PlayerDeath
                } else {
                    Category::OtherKill
                };
                let text = format!(
                    "{} - {} >> {} with {}",
                    self.timestamp, death.killer, death.killed, death.damage_type
                );
                (text, category)
            }
            EventKind::VehicleDestruction(destruction) => {
                let category = if session.is_player(&destruction.causer) {
                    Category::PlayerKill
                } else {
                    Category::OtherKill
                };
                let vehicle = sanitize_entity_name(&destruction.vehicle);
                let text = if destruction.is_collision() {
                    format!(
                        "{} - {} collided with {}",
                        self.timestamp,
                        vehicle,
                        sanitize_entity_name(&destruction.causer)
                    )
                } else {
                    let level =
                        KillLevel::from_levels(destruction.from_level, destruction.to_level);
                    format!(
                        "{} - {} >> {} ({})",
                        self.timestamp, destruction.causer, level, vehicle
                    )
                };
                (text, category)
            }
        }
    }
}

/// One rendered feed entry. `seq` is the event's position in the file and
/// stays the same while a generation's file only grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRecord {
    pub seq: u64,
    pub text: String,
    pub category: Category,
}

/// Classifies one line, applying login side effects to `session`.
fn process_line<Tz>(line: &str, session: &mut SessionState, tz: &Tz) -> Option<Event>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let kind = match telemetry::classify(line) {
        LineClass::Login(name) => {
            session.observe_login(&name);
            return None;
        }
        LineClass::ActorDeath(death) => EventKind::ActorDeath(death),
        LineClass::VehicleDestruction(destruction) => EventKind::VehicleDestruction(destruction),
        LineClass::NoEvent => return None,
    };

    Some(Event {
        timestamp: telemetry::normalize_in(line, tz),
        kind,
    })
}

/// Parses a whole log in one pass, in file order.
///
/// Login lines update `session` as they are reached, so each event is
/// attributed against whoever is the player at that point of the pass.
/// `session` is not reset first: lines ahead of the first login see the
/// identity left over from the previous pass.
pub fn parse_log<Tz>(content: &str, session: &mut SessionState, tz: &Tz) -> Vec<DisplayRecord>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut records = Vec::new();

    for line in content.lines() {
        if let Some(event) = process_line(line, session, tz) {
            let (text, category) = event.describe(session);
            records.push(DisplayRecord {
                seq: records.len() as u64,
                text,
                category,
            });
        }
    }

    records
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub total: usize,
    pub rebuilt: bool,
}

/// Follows one log file, reparsing it in full on every refresh.
///
/// The session state lives as long as the pipeline, across refreshes and
/// file switches. A record's `seq` is its position among the file's events,
/// so it stays put while the file only grows. A shrinking file or a
/// different path starts a new generation.
#[derive(Debug)]
pub struct EventPipeline<Tz: TimeZone = Local> {
    tz: Tz,
    source: Option<PathBuf>,
    len: u64,
    session: SessionState,
    records: Vec<DisplayRecord>,
    generation: u64,
}

impl EventPipeline<Local> {
    pub fn new() -> Self {
        Self::with_timezone(Local)
    }
}

impl Default for EventPipeline<Local> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tz> EventPipeline<Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    pub fn with_timezone(tz: Tz) -> Self {
        Self {
            tz,
            source: None,
            len: 0,
            session: SessionState::default(),
            records: Vec::new(),
            generation: 0,
        }
    }

    pub fn records(&self) -> &[DisplayRecord] {
        &self.records
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Makes the next refresh start a new generation. Records stay visible
    /// until that refresh succeeds.
    pub fn rewind(&mut self) {
        self.source = None;
    }

    pub async fn refresh(&mut self, path: &Path) -> Result<RefreshSummary, PipelineError> {
        let bytes = fs::read(path).await.map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // nothing below can fail, so a read error leaves the previous view intact
        let len = bytes.len() as u64;
        let same_source = self.source.as_deref() == Some(path);
        let rebuilt = !same_source || len < self.len;

        if rebuilt {
            if same_source {
                info!(path = %path.display(), len, "log shrank; new generation");
            } else {
                info!(path = %path.display(), "following log file");
            }
            self.source = Some(path.to_path_buf());
            self.generation += 1;
        }

        let content = String::from_utf8_lossy(&bytes);
        self.records = parse_log(&content, &mut self.session, &self.tz);
        self.len = len;

        debug!(
            total = self.records.len(),
            len,
            player = self.session.current_player(),
            "log parsed"
        );

        Ok(RefreshSummary {
            total: self.records.len(),
            rebuilt,
        })
    }
}
