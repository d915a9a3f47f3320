//! 与服务端的会话循环
//!
//! 建立连接后按协议顺序收发消息：握手、加入对局、按 MOVEREQUEST 走子，
//! 直到对局结束、被踢出、服务端断开或本地退出。

use tracing::{debug, info, warn};

use protocol::{
    ClientMessage, Connection, Preference, ProtocolError, ServerMessage, MIN_PLAYERS,
    SERVER_EXTENSIONS,
};

use crate::game::{Brain, ClientGame, Turn};

/// 会话结束的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 收到 GAMEOVER
    Finished(Vec<(String, u32)>),
    /// 自己被踢出
    Kicked,
    /// 本地输入了退出口令
    Exited,
    /// 服务端关闭了连接
    Disconnected,
    /// 剩余人数不足以继续
    Abandoned,
}

/// 客户端监听器：驱动一条连接上的完整对局
pub struct Listener<C: Connection> {
    conn: C,
    game: ClientGame,
    brain: Brain,
    preference: Preference,
}

impl<C: Connection> Listener<C> {
    pub fn new(conn: C, name: impl Into<String>, preference: Preference, brain: Brain) -> Self {
        Self {
            conn,
            game: ClientGame::new(name),
            brain,
            preference,
        }
    }

    /// 本地对局镜像
    pub fn game(&self) -> &ClientGame {
        &self.game
    }

    /// 运行到会话结束
    pub async fn run(&mut self) -> Result<Outcome, ProtocolError> {
        self.conn
            .send(&ClientMessage::ConnectRequest {
                name: self.game.name().to_string(),
                extensions: SERVER_EXTENSIONS.to_vec(),
            })
            .await?;

        loop {
            let msg: ServerMessage = match self.conn.recv().await {
                Ok(msg) => msg,
                Err(e) if e.is_disconnect() => {
                    info!("服务端断开连接");
                    return Ok(Outcome::Disconnected);
                }
                Err(e) => {
                    warn!("忽略无法解析的消息: {}", e);
                    continue;
                }
            };

            if let Some(outcome) = self.handle(msg).await? {
                return Ok(outcome);
            }
        }
    }

    async fn handle(&mut self, msg: ServerMessage) -> Result<Option<Outcome>, ProtocolError> {
        match msg {
            ServerMessage::ConnectAccept { extensions } => {
                debug!(?extensions, "连接已接受");
                self.conn
                    .send(&ClientMessage::JoinGame {
                        preference: self.preference,
                    })
                    .await?;
                info!(preference = %self.preference, "等待对局开始");
            }
            ServerMessage::GameStarted { players } => {
                self.game.start(&players);
                info!(players = players.len(), "对局开始");
            }
            ServerMessage::MoveRequest => match self.brain.decide(&self.game).await {
                Turn::Play(decision) => {
                    debug!(%decision, "发送走法");
                    self.conn.send(&decision.to_message()).await?;
                }
                Turn::Exit => {
                    info!("本地退出");
                    self.conn.close().await?;
                    return Ok(Some(Outcome::Exited));
                }
            },
            ServerMessage::TurnMade(turn) => {
                self.game.apply_turn(&turn);
            }
            ServerMessage::PlayerKicked { name } => {
                if self.game.remove_player(&name) {
                    warn!("被服务端踢出");
                    return Ok(Some(Outcome::Kicked));
                }
                info!(player = %name, "玩家被踢出");
                if self.game.is_started() && self.game.member_count() < MIN_PLAYERS {
                    return Ok(Some(Outcome::Abandoned));
                }
            }
            ServerMessage::GameOver { scores } => {
                self.game.finish(scores.clone());
                return Ok(Some(Outcome::Finished(scores)));
            }
        }
        Ok(None)
    }
}
