// src/proctor/mod.rs

//! Proctoring for timed coding sessions: fullscreen enforcement and interception
//! of tab switches, copy/paste and the context menu.

pub mod keys;
pub mod session;
pub mod surface;

pub use keys::{Chord, ChordError, KeyEvent};
pub use session::{
    Disposition, EnterOutcome, Phase, ProctorSession, ProctorState, Violation, ViolationKind,
    Warning,
};
pub use surface::{Interception, ReportedSurface, Surface, SurfaceError};
