//! Greeting cooldown and time-of-day greeting text.

use chrono::Timelike;
use rollcall_core::Identity;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Last announcement time per identity.
///
/// Entries are never removed; the table is bounded by the gallery size.
pub struct Cooldown {
    window: Duration,
    last_seen: HashMap<String, Instant>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: HashMap::new(),
        }
    }

    /// Whether to greet `key` now. Records `now` when it returns true.
    ///
    /// Greets on first sight, then only once strictly more than the window has passed.
    pub fn on_identified(&mut self, key: &str, now: Instant) -> bool {
        let due = match self.last_seen.get(key) {
            None => true,
            Some(&last) => now.saturating_duration_since(last) > self.window,
        };
        if due {
            self.last_seen.insert(key.to_string(), now);
        }
        due
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    /// `[5,12)` morning, `[12,18)` afternoon, anything else evening.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayPart::Morning,
            12..=17 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }
}

pub fn greeting_text(identity: &Identity, hour: u32) -> String {
    let name = identity.display_name();
    match DayPart::from_hour(hour) {
        DayPart::Morning => format!("Good morning, {name}."),
        DayPart::Afternoon => format!("Good afternoon, {name}."),
        DayPart::Evening => format!("Good evening, {name}. Thank you for your hard work."),
    }
}

/// Greeting for the current local hour.
pub fn greeting_now(identity: &Identity) -> String {
    greeting_text(identity, chrono::Local::now().hour())
}
