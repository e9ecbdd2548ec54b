use actix::{ActorContext, Handler, StreamHandler};
use actix_web_actors::ws::{self, Message, ProtocolError};
use tracing::{debug, warn};

use crate::{
    arena::messages::{CancelMatch, JoinRoom, RequestBotBattle, RequestMatch},
    protocol::{ClientMessage, ErrorReason, ServerMessage},
    session::Session,
};

impl StreamHandler<Result<Message, ProtocolError>> for Session {
    fn handle(&mut self, msg: Result<Message, ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = std::time::Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = std::time::Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => self.dispatch(message),
                Err(e) => {
                    warn!(
                        "Invalid message from {}: {} ({})",
                        self.connection_id, e, text
                    );
                    self.send_err(ctx, ErrorReason::InvalidMessageFormat);
                }
            },
            Ok(ws::Message::Binary(_)) => {
                self.send_err(ctx, ErrorReason::InvalidMessageFormat);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                warn!("Websocket protocol error on {}: {}", self.connection_id, e);
                ctx.stop();
            }
        }
    }
}

impl Session {
    fn dispatch(&mut self, message: ClientMessage) {
        let connection_id = self.connection_id;
        debug!("Session {} received {:?}", connection_id, message);

        match message {
            ClientMessage::RequestMatch { nickname, avatar } => {
                self.arena_addr.do_send(RequestMatch {
                    connection_id,
                    nickname,
                    avatar,
                });
            }
            ClientMessage::JoinRoom {
                room_id,
                nickname,
                avatar,
            } => {
                self.arena_addr.do_send(JoinRoom {
                    connection_id,
                    room_id,
                    nickname,
                    avatar,
                });
            }
            ClientMessage::RequestBotBattle {
                multiplier,
                user_id,
            } => {
                self.arena_addr.do_send(RequestBotBattle {
                    connection_id,
                    user_id,
                    multiplier,
                });
            }
            ClientMessage::CancelMatch => {
                self.arena_addr.do_send(CancelMatch { connection_id });
            }
        }
    }
}

impl Handler<ServerMessage> for Session {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, ctx: &mut Self::Context) {
        self.send_json(ctx, &msg);
    }
}
