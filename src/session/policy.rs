use serde::{Deserialize, Serialize};

/// Tab switches answered with a warning; the next one ends the session.
pub const MAX_TAB_SWITCH_WARNINGS: u32 = 2;

/// Instruction for the presentation layer produced by a proctoring event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    Warning { count: u32 },
    Terminate { count: u32, signed_out: bool },
    ReturnToFullscreen,
    FullscreenRestored,
}

pub fn exceeds_strike_limit(tab_switches: u32) -> bool {
    tab_switches > MAX_TAB_SWITCH_WARNINGS
}

pub fn fullscreen_signal(is_fullscreen: bool) -> Signal {
    if is_fullscreen {
        Signal::FullscreenRestored
    } else {
        Signal::ReturnToFullscreen
    }
}
