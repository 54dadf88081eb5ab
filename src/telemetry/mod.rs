pub mod names;
pub mod timestamp;

use once_cell::sync::Lazy;
use regex::Regex;

pub use names::sanitize_entity_name;
pub use timestamp::{DisplayTime, normalize_in};

const LOGIN_MARKER: &str = "<AccountLoginCharacterStatus_Character>";
const ACTOR_DEATH_MARKER: &str = "<Actor Death>";
const VEHICLE_DESTRUCTION_MARKER: &str = "<Vehicle Destruction>";

const HUMAN_PILOT_PREFIX: &str = "PU_Pilots-Human";
const HUMAN_PILOT_LABEL: &str = "Human NPC";

static LOGIN_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"name (?P<name>\w+)").unwrap());
static ACTOR_DEATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"'(?P<killed>[^']+)' \[\d+\].*?killed by '(?P<killer>[^']+)' \[\d+\].*?with damage type '(?P<damage>[^']+)'",
    )
    .unwrap()
});
static VEHICLE_DESTRUCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Vehicle '(?P<vehicle>[^']+)'.*?destroy level (?P<from>\d) to (?P<to>\d).*?caused by '(?P<causer>[^']+)'.*?with '(?P<damage>[^']+)'",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorDeath {
    pub killed: String,
    pub killer: String,
    pub damage_type: String,
}

/// Vehicle and causer are kept exactly as logged; display code decides
/// where the sanitized forms are used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleDestruction {
    pub vehicle: String,
    pub causer: String,
    pub damage_type: String,
    pub from_level: u8,
    pub to_level: u8,
}

impl VehicleDestruction {
    pub fn is_collision(&self) -> bool {
        self.damage_type == "Collision"
    }
}

/// Outcome of classifying one raw telemetry line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Login(String),
    ActorDeath(ActorDeath),
    VehicleDestruction(VehicleDestruction),
    NoEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Login,
    ActorDeath,
    VehicleDestruction,
}

impl RecordKind {
    fn detect(line: &str) -> Option<Self> {
        if line.contains(LOGIN_MARKER) {
            Some(Self::Login)
        } else if line.contains(ACTOR_DEATH_MARKER) {
            Some(Self::ActorDeath)
        } else if line.contains(VEHICLE_DESTRUCTION_MARKER) {
            Some(Self::VehicleDestruction)
        } else {
            None
        }
    }
}

/// Classifies a single line. Lines that carry a marker but do not match
/// the full pattern are reported as [`LineClass::NoEvent`].
pub fn classify(line: &str) -> LineClass {
    let parsed = match RecordKind::detect(line) {
        Some(RecordKind::Login) => extract_login(line),
        Some(RecordKind::ActorDeath) => extract_actor_death(line),
        Some(RecordKind::VehicleDestruction) => extract_vehicle_destruction(line),
        None => None,
    };

    parsed.unwrap_or(LineClass::NoEvent)
}

fn extract_login(line: &str) -> Option<LineClass> {
    let caps = LOGIN_NAME_RE.captures(line)?;
    Some(LineClass::Login(caps["name"].to_string()))
}

fn extract_actor_death(line: &str) -> Option<LineClass> {
    let caps = ACTOR_DEATH_RE.captures(line)?;

    let killed = &caps["killed"];
    let killed = if killed.starts_with(HUMAN_PILOT_PREFIX) {
        HUMAN_PILOT_LABEL.to_string()
    } else {
        killed.to_string()
    };

    Some(LineClass::ActorDeath(ActorDeath {
        killed,
        killer: caps["killer"].to_string(),
        damage_type: caps["damage"].to_string(),
    }))
}

fn extract_vehicle_destruction(line: &str) -> Option<LineClass> {
    let caps = VEHICLE_DESTRUCTION_RE.captures(line)?;

    Some(LineClass::VehicleDestruction(VehicleDestruction {
        vehicle: caps["vehicle"].to_string(),
        causer: caps["causer"].to_string(),
        damage_type: caps["damage"].to_string(),
        from_level: caps["from"].parse().ok()?,
        to_level: caps["to"].parse().ok()?,
    }))
}
