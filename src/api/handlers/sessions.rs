// src/api/handlers/sessions.rs
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::authenticate;
use crate::api::AppState;
use crate::api::state::OwnedSession;
use crate::errors::{ForgeError, Result};
use crate::identity::Role;
use crate::proctor::{
    Disposition, EnterOutcome, KeyEvent, Phase, ProctorSession, ProctorState, ReportedSurface,
    Surface, Warning,
};

#[derive(Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub fullscreen_granted: bool,
}

/// Events reported by the editor page.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Visibility { hidden: bool },
    Key(KeyEvent),
    ContextMenu,
    Fullscreen { active: bool },
}

#[derive(Serialize)]
pub struct WarningBody {
    #[serde(flatten)]
    pub warning: Warning,
    pub message: String,
}

impl From<Warning> for WarningBody {
    fn from(warning: Warning) -> Self {
        let message = warning.message();
        Self { warning, message }
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Option<Uuid>,
    pub phase: Phase,
    pub state: ProctorState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<WarningBody>,
}

#[derive(Serialize)]
pub struct EventResponse {
    pub prevent_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<WarningBody>,
    pub phase: Phase,
    pub state: ProctorState,
}

fn snapshot<S: Surface>(
    id: Option<Uuid>,
    session: &ProctorSession<S>,
    warning: Option<Warning>,
) -> SessionResponse {
    SessionResponse {
        session_id: id,
        phase: session.phase(),
        state: session.state().clone(),
        elapsed: session.elapsed_display(),
        warning: warning.map(WarningBody::from),
    }
}

/// POST /api/v1/sessions - start a proctored session
pub async fn start_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<StartSessionRequest>,
) -> Result<HttpResponse> {
    let identity = authenticate(&state, &req).await?;
    identity.require(Role::Coder)?;

    let mut session = ProctorSession::new(
        ReportedSurface::new(body.fullscreen_granted),
        state.config.proctor.override_chord.clone(),
    );
    match session.enter() {
        EnterOutcome::Denied(warning) => {
            Ok(HttpResponse::Ok().json(snapshot(None, &session, Some(warning))))
        }
        EnterOutcome::Entered | EnterOutcome::AlreadyActive => {
            let id = Uuid::new_v4();
            let response = snapshot(Some(id), &session, None);
            state
                .sessions
                .insert(id, OwnedSession::new(identity.user_id, session));
            Ok(HttpResponse::Created().json(response))
        }
    }
}

/// POST /api/v1/sessions/{id}/events - report one intercepted event.
/// A session ended by the event (override chord) is destroyed.
pub async fn send_event(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<SessionEvent>,
) -> Result<HttpResponse> {
    let identity = authenticate(&state, &req).await?;
    let id = path.into_inner();

    let mut sessions = state.sessions.lock();
    let owned = sessions
        .get_mut(&id)
        .filter(|s| s.owner == identity.user_id)
        .ok_or_else(|| ForgeError::NotFound(format!("Session {}", id)))?;

    owned.touch();
    let session = &mut owned.session;
    let Disposition {
        prevent_default,
        warning,
    } = match body.into_inner() {
        SessionEvent::Visibility { hidden } => session.on_visibility_change(hidden),
        SessionEvent::Key(event) => session.on_key_event(&event),
        SessionEvent::ContextMenu => session.on_context_menu(),
        SessionEvent::Fullscreen { active } => session.on_fullscreen_change(active),
    };

    let response = EventResponse {
        prevent_default,
        warning: warning.map(WarningBody::from),
        phase: session.phase(),
        state: session.state().clone(),
    };
    if !session.is_active() {
        log::info!("Proctor session {} ended by event; removing it", id);
        sessions.remove(&id);
    }
    Ok(HttpResponse::Ok().json(response))
}

/// DELETE /api/v1/sessions/{id} - end a session and return its final state
pub async fn end_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let identity = authenticate(&state, &req).await?;
    let id = path.into_inner();

    let mut owned = {
        let mut sessions = state.sessions.lock();
        let owns = sessions.get(&id).is_some_and(|s| s.owner == identity.user_id);
        if owns { sessions.remove(&id) } else { None }
    }
    .ok_or_else(|| ForgeError::NotFound(format!("Session {}", id)))?;

    let elapsed = owned.session.elapsed_display();
    let final_state = owned.session.leave();
    Ok(HttpResponse::Ok().json(SessionResponse {
        session_id: Some(id),
        phase: owned.session.phase(),
        state: final_state,
        elapsed,
        warning: None,
    }))
}
