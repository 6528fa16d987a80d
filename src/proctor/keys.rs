// src/proctor/keys.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A key press as reported by the editing surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Keys that would drop the surface out of fullscreen.
    pub fn is_fullscreen_exit(&self) -> bool {
        self.key == "Escape" || self.key == "F11"
    }

    /// Ctrl/Cmd + C or V.
    pub fn is_copy_or_paste(&self) -> bool {
        (self.ctrl || self.meta)
            && (self.key.eq_ignore_ascii_case("c") || self.key.eq_ignore_ascii_case("v"))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChordError {
    #[error("chord is empty")]
    Empty,
    #[error("chord '{0}' has no modifier; a bare key cannot be an override")]
    NoModifier(String),
    #[error("chord '{0}' must name exactly one non-modifier key")]
    KeyCount(String),
}

/// A fixed key combination, written like `ctrl+shift+x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    ctrl: bool,
    shift: bool,
    alt: bool,
    meta: bool,
    key: String,
}

impl Chord {
    /// Modifiers must match exactly; the key is compared case-insensitively
    /// since Shift changes the reported character.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.ctrl == event.ctrl
            && self.shift == event.shift
            && self.alt == event.alt
            && self.meta == event.meta
            && self.key.eq_ignore_ascii_case(&event.key)
    }
}

impl FromStr for Chord {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ChordError::Empty);
        }
        let mut chord = Chord {
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
            key: String::new(),
        };
        let mut keys = 0;
        for part in s.split('+').map(|p| p.trim().to_ascii_lowercase()) {
            match part.as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "shift" => chord.shift = true,
                "alt" | "option" => chord.alt = true,
                "meta" | "cmd" | "super" => chord.meta = true,
                "" => return Err(ChordError::KeyCount(s.to_string())),
                _ => {
                    keys += 1;
                    chord.key = part;
                }
            }
        }
        if keys != 1 {
            return Err(ChordError::KeyCount(s.to_string()));
        }
        if !(chord.ctrl || chord.shift || chord.alt || chord.meta) {
            return Err(ChordError::NoModifier(s.to_string()));
        }
        Ok(chord)
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("ctrl+")?;
        }
        if self.alt {
            f.write_str("alt+")?;
        }
        if self.shift {
            f.write_str("shift+")?;
        }
        if self.meta {
            f.write_str("meta+")?;
        }
        f.write_str(&self.key)
    }
}
