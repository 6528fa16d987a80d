// src/proctor/session.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use super::keys::{Chord, KeyEvent};
use super::surface::{Listeners, Surface, SurfaceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Inactive,
    Active,
    /// Active, with at least one violation observed.
    Violating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TabSwitch,
    CopyPaste,
    FullscreenExit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProctorState {
    pub fullscreen_active: bool,
    pub violation_count: u32,
    pub last_violation: Option<Violation>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Non-fatal notices for the user. None of these end the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Warning {
    FullscreenDenied { reason: String },
    SetupFailed { reason: String },
    TabSwitch,
    CopyPaste,
    FullscreenExit,
}

impl Warning {
    pub fn message(&self) -> String {
        match self {
            Warning::FullscreenDenied { .. } => {
                "Fullscreen is required to start the test. Allow fullscreen and try again."
                    .to_string()
            }
            Warning::SetupFailed { .. } => {
                "The test session could not be started. Reload the page and try again.".to_string()
            }
            Warning::TabSwitch => "Tab switching is not allowed during the test.".to_string(),
            Warning::CopyPaste => "Copy-paste is not allowed during the test.".to_string(),
            Warning::FullscreenExit => "Return to fullscreen to continue the test.".to_string(),
        }
    }
}

/// What the surface should do with an intercepted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disposition {
    pub prevent_default: bool,
    pub warning: Option<Warning>,
}

impl Disposition {
    pub fn allow() -> Self {
        Self {
            prevent_default: false,
            warning: None,
        }
    }

    pub fn prevent() -> Self {
        Self {
            prevent_default: true,
            warning: None,
        }
    }

    fn warn(prevent_default: bool, warning: Warning) -> Self {
        Self {
            prevent_default,
            warning: Some(warning),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnterOutcome {
    Entered,
    AlreadyActive,
    /// The session stayed inactive.
    Denied(Warning),
}

/// Proctoring controller for one editing session.
///
/// Owns its [`ProctorState`]; nothing is shared between sessions. Listeners are
/// attached on [`enter`](Self::enter) and released on [`leave`](Self::leave), on the
/// override chord, or when the session is dropped.
pub struct ProctorSession<S: Surface> {
    surface: S,
    override_chord: Option<Chord>,
    phase: Phase,
    state: ProctorState,
    listeners: Option<Listeners>,
    hidden: bool,
}

impl<S: Surface> ProctorSession<S> {
    pub fn new(surface: S, override_chord: Option<Chord>) -> Self {
        Self {
            surface,
            override_chord,
            phase: Phase::Inactive,
            state: ProctorState::default(),
            listeners: None,
            hidden: false,
        }
    }

    pub fn enter(&mut self) -> EnterOutcome {
        if self.is_active() {
            return EnterOutcome::AlreadyActive;
        }

        if let Err(e) = self.surface.request_fullscreen() {
            log::warn!("Proctor session not started: {}", e);
            let reason = match e {
                SurfaceError::FullscreenDenied(reason) => reason,
                other => other.to_string(),
            };
            return EnterOutcome::Denied(Warning::FullscreenDenied { reason });
        }

        match Listeners::attach_all(&mut self.surface) {
            Ok(listeners) => self.listeners = Some(listeners),
            Err(e) => {
                log::warn!("Proctor session not started: {}", e);
                self.surface.exit_fullscreen();
                return EnterOutcome::Denied(Warning::SetupFailed {
                    reason: e.to_string(),
                });
            }
        }

        self.state = ProctorState {
            fullscreen_active: true,
            violation_count: 0,
            last_violation: None,
            started_at: Some(Utc::now()),
        };
        self.hidden = false;
        self.phase = Phase::Active;
        log::info!("Proctor session started");
        EnterOutcome::Entered
    }

    /// Counts one violation per transition to hidden.
    pub fn on_visibility_change(&mut self, hidden: bool) -> Disposition {
        let became_hidden = hidden && !self.hidden;
        self.hidden = hidden;
        if !self.is_active() || !became_hidden {
            return Disposition::allow();
        }
        self.record(ViolationKind::TabSwitch);
        Disposition::warn(false, Warning::TabSwitch)
    }

    pub fn on_key_event(&mut self, event: &KeyEvent) -> Disposition {
        if self.override_chord.as_ref().is_some_and(|c| c.matches(event)) {
            log::warn!("Proctor override chord used; ending session");
            self.leave();
            return Disposition::prevent();
        }
        if !self.is_active() {
            return Disposition::allow();
        }
        if event.is_fullscreen_exit() {
            return Disposition::prevent();
        }
        if event.is_copy_or_paste() {
            self.record(ViolationKind::CopyPaste);
            return Disposition::warn(true, Warning::CopyPaste);
        }
        Disposition::allow()
    }

    pub fn on_context_menu(&mut self) -> Disposition {
        if self.is_active() {
            Disposition::prevent()
        } else {
            Disposition::allow()
        }
    }

    /// The platform left fullscreen by a path that could not be intercepted.
    pub fn on_fullscreen_change(&mut self, fullscreen: bool) -> Disposition {
        if !self.is_active() || fullscreen == self.state.fullscreen_active {
            return Disposition::allow();
        }
        self.state.fullscreen_active = fullscreen;
        if fullscreen {
            return Disposition::allow();
        }
        self.record(ViolationKind::FullscreenExit);
        Disposition::warn(false, Warning::FullscreenExit)
    }

    /// Ends the session from any phase and returns the final state.
    pub fn leave(&mut self) -> ProctorState {
        if let Some(listeners) = self.listeners.take() {
            listeners.release(&mut self.surface);
        }
        if self.state.fullscreen_active {
            self.surface.exit_fullscreen();
            self.state.fullscreen_active = false;
        }
        if self.phase != Phase::Inactive {
            log::info!(
                "Proctor session ended after {} with {} violation(s)",
                self.elapsed_display().unwrap_or_default(),
                self.state.violation_count
            );
        }
        self.phase = Phase::Inactive;
        self.state.clone()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Inactive
    }

    pub fn state(&self) -> &ProctorState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn elapsed(&self) -> Option<Duration> {
        let started = self.state.started_at?;
        (Utc::now() - started).to_std().ok()
    }

    /// Elapsed session time as `m:ss`.
    pub fn elapsed_display(&self) -> Option<String> {
        self.elapsed().map(format_elapsed)
    }

    fn record(&mut self, kind: ViolationKind) {
        self.state.violation_count += 1;
        self.state.last_violation = Some(Violation { kind, at: Utc::now() });
        self.phase = Phase::Violating;
        log::warn!(
            "Proctor violation {:?} (total {})",
            kind,
            self.state.violation_count
        );
    }
}

impl<S: Surface> Drop for ProctorSession<S> {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.take() {
            listeners.release(&mut self.surface);
        }
    }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
