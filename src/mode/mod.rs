use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Assistance mode sent with every turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    /// Answers tuned for a user who cannot see the scene
    Blind,
}

impl Mode {
    /// Token used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Blind => "blind",
        }
    }

    pub fn toggled(self) -> Mode {
        match self {
            Mode::Normal => Mode::Blind,
            Mode::Blind => Mode::Normal,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Mode::Normal),
            "blind" | "accessibility" => Ok(Mode::Blind),
            other => anyhow::bail!("Unknown mode: {}", other),
        }
    }
}

/// Holds the current mode
///
/// Shared between the UI and the capture orchestrator. The orchestrator reads
/// it once when recording starts; toggling afterwards does not change a turn
/// already being built.
#[derive(Debug, Default)]
pub struct ModeController {
    blind: AtomicBool,
}

impl ModeController {
    pub fn new(initial: Mode) -> Self {
        Self {
            blind: AtomicBool::new(initial == Mode::Blind),
        }
    }

    pub fn current(&self) -> Mode {
        if self.blind.load(Ordering::SeqCst) {
            Mode::Blind
        } else {
            Mode::Normal
        }
    }

    /// Flip the mode, returning the new value
    pub fn toggle(&self) -> Mode {
        let was_blind = self.blind.fetch_xor(true, Ordering::SeqCst);
        if was_blind {
            Mode::Normal
        } else {
            Mode::Blind
        }
    }
}
