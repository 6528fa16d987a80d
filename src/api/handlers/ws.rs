// src/api/handlers/ws.rs
use actix::{Actor, AsyncContext, Handler, Message, Recipient, StreamHandler};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::api::AppState;
use crate::identity::bearer_token;

/// Summary of a finished, non-stale run.
#[derive(Message, Clone, Serialize)]
#[rtype(result = "()")]
pub struct RunUpdate {
    pub run_id: u64,
    #[serde(skip)]
    pub user_id: String,
    pub problem_id: String,
    pub all_passed: bool,
    pub score: u8,
    pub passed: usize,
    pub total: usize,
}

struct Subscriber {
    id: Uuid,
    user_id: String,
    recipient: Recipient<RunUpdate>,
}

/// Fans run updates out to the owning user's subscribers.
#[derive(Clone, Default)]
pub struct WsBroker {
    clients: Arc<RwLock<Vec<Subscriber>>>,
}

impl WsBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: Uuid, user_id: String, recipient: Recipient<RunUpdate>) {
        let mut clients = self.clients.write().await;
        clients.push(Subscriber {
            id,
            user_id,
            recipient,
        });
    }

    pub async fn unregister(&self, id: Uuid) {
        let mut clients = self.clients.write().await;
        clients.retain(|c| c.id != id);
    }

    pub async fn broadcast(&self, msg: RunUpdate) {
        let clients = self.clients.read().await;
        for client in clients.iter().filter(|c| c.user_id == msg.user_id) {
            client.recipient.do_send(msg.clone());
        }
    }
}

pub struct WsConnection {
    id: Uuid,
    broker: WsBroker,
    user_id: String,
}

impl WsConnection {
    pub fn new(broker: WsBroker, user_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            broker,
            user_id,
        }
    }
}

impl Actor for WsConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let recipient = ctx.address().recipient();
        let broker = self.broker.clone();
        let (id, user_id) = (self.id, self.user_id.clone());
        actix::spawn(async move {
            broker.register(id, user_id, recipient).await;
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let broker = self.broker.clone();
        let id = self.id;
        actix::spawn(async move {
            broker.unregister(id).await;
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => ctx.close(reason),
            _ => (),
        }
    }
}

impl Handler<RunUpdate> for WsConnection {
    type Result = ();

    fn handle(&mut self, msg: RunUpdate, ctx: &mut Self::Context) {
        if let Ok(json) = serde_json::to_string(&msg) {
            ctx.text(json);
        }
    }
}

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Browsers cannot set headers on a WebSocket handshake, so the session token
/// may also come in the `token` query parameter.
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsQuery>,
    state: web::Data<AppState>,
    broker: web::Data<WsBroker>,
) -> Result<HttpResponse, Error> {
    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = match (&query.token, header) {
        (Some(token), _) => token.clone(),
        (None, header) => bearer_token(header)?.to_string(),
    };
    let identity = state.identity.resolve(&token).await?;
    let conn = WsConnection::new(broker.get_ref().clone(), identity.user_id);
    ws::start(conn, &req, stream)
}
