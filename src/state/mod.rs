use tracing::info;

pub const UNKNOWN_PLAYER: &str = "Unknown";

/// Identity of the local player as of the last login line seen.
///
/// Only the current value is kept. The pipeline owns the single instance
/// and advances it in file order, so every event is attributed against
/// the identity established by the lines before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    player: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            player: UNKNOWN_PLAYER.to_string(),
        }
    }
}

impl SessionState {
    /// Returns `true` when the identity actually changed.
    pub fn observe_login(&mut self, name: &str) -> bool {
        if self.player == name {
            return false;
        }

        info!(previous = %self.player, player = %name, "player identity updated");
        self.player = name.to_string();
        true
    }

    pub fn current_player(&self) -> &str {
        &self.player
    }

    pub fn is_player(&self, name: &str) -> bool {
        self.player == name
    }
}
