// src/proctor/surface.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event streams the controller intercepts while a session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interception {
    Visibility,
    KeyDown,
    ContextMenu,
}

impl Interception {
    pub const ALL: [Interception; 3] = [
        Interception::Visibility,
        Interception::KeyDown,
        Interception::ContextMenu,
    ];
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("fullscreen request denied: {0}")]
    FullscreenDenied(String),

    #[error("could not attach {interception:?} listener: {reason}")]
    Attach {
        interception: Interception,
        reason: String,
    },
}

/// The editing surface a session runs on: fullscreen control and event hooks.
pub trait Surface {
    fn request_fullscreen(&mut self) -> Result<(), SurfaceError>;

    fn exit_fullscreen(&mut self);

    fn attach(&mut self, interception: Interception) -> Result<(), SurfaceError>;

    /// Must tolerate detaching something that is not attached.
    fn detach(&mut self, interception: Interception);
}

/// Listeners attached for one session. Created only through [`Listeners::attach_all`]
/// and handed back through [`Listeners::release`].
#[derive(Debug)]
pub(crate) struct Listeners {
    attached: Vec<Interception>,
}

impl Listeners {
    /// Attach every interception, or none: a failure part-way detaches what was
    /// already attached before the error is returned.
    pub(crate) fn attach_all<S: Surface>(surface: &mut S) -> Result<Self, SurfaceError> {
        let mut listeners = Listeners {
            attached: Vec::with_capacity(Interception::ALL.len()),
        };
        for interception in Interception::ALL {
            if let Err(e) = surface.attach(interception) {
                listeners.release(surface);
                return Err(e);
            }
            listeners.attached.push(interception);
        }
        Ok(listeners)
    }

    pub(crate) fn release<S: Surface>(self, surface: &mut S) {
        for interception in self.attached.into_iter().rev() {
            surface.detach(interception);
        }
    }
}

/// A surface driven by a remote client that reports what it was able to do.
#[derive(Debug, Clone, Default)]
pub struct ReportedSurface {
    fullscreen_granted: bool,
    fullscreen: bool,
    attached: Vec<Interception>,
}

impl ReportedSurface {
    pub fn new(fullscreen_granted: bool) -> Self {
        Self {
            fullscreen_granted,
            ..Default::default()
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn attached(&self) -> &[Interception] {
        &self.attached
    }
}

impl Surface for ReportedSurface {
    fn request_fullscreen(&mut self) -> Result<(), SurfaceError> {
        if !self.fullscreen_granted {
            return Err(SurfaceError::FullscreenDenied(
                "client reported fullscreen is unavailable".to_string(),
            ));
        }
        self.fullscreen = true;
        Ok(())
    }

    fn exit_fullscreen(&mut self) {
        self.fullscreen = false;
    }

    fn attach(&mut self, interception: Interception) -> Result<(), SurfaceError> {
        if !self.attached.contains(&interception) {
            self.attached.push(interception);
        }
        Ok(())
    }

    fn detach(&mut self, interception: Interception) {
        self.attached.retain(|i| *i != interception);
    }
}
