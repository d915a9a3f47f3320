//! 连接握手
//!
//! CONNECTREQUEST → CONNECTACCEPT → JOINGAME，完成后玩家进入匹配队列。
//! 每一行都有读取时限，超时的连接被关闭并释放连接许可。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use protocol::{
    match_extensions, tags, validate_name, ClientMessage, Preference, ProtocolError, Result,
    ServerMessage, WireMessage, DELIMITER, SERVER_EXTENSIONS,
};

use crate::matchmaker::Matchmaker;
use crate::player::{Player, PlayerLink};

/// 处理一个新连接：握手成功后交给匹配器，失败则断开
pub async fn serve_connection(
    mut link: PlayerLink,
    matchmaker: Arc<Matchmaker>,
    limit: Duration,
) {
    let peer = link.peer().to_string();
    match handshake(&mut link, limit).await {
        Ok((name, preference)) => {
            info!(peer = %peer, player = %name, %preference, "握手完成");
            let player = Player::new(matchmaker.next_player_id(), name, preference, link);
            matchmaker.enqueue(player);
        }
        Err(e) if e.is_disconnect() => {
            info!(peer = %peer, "握手期间连接断开: {}", e);
        }
        Err(e) => {
            warn!(peer = %peer, "握手失败: {}", e);
            link.close().await;
        }
    }
}

/// 握手，返回玩家昵称和人数偏好；`limit` 为每一行的读取时限
pub async fn handshake(link: &mut PlayerLink, limit: Duration) -> Result<(String, Preference)> {
    let (name, extensions) = loop {
        let line = next_line(link, limit).await?;
        match ClientMessage::parse(&line) {
            Ok(ClientMessage::ConnectRequest { name, extensions }) => break (name, extensions),
            _ => debug!(peer = link.peer(), line = %line, "等待 CONNECTREQUEST，忽略"),
        }
    };
    validate_name(&name)?;

    let accepted = match_extensions(&extensions, SERVER_EXTENSIONS);
    link.send(&ServerMessage::ConnectAccept {
        extensions: accepted,
    })
    .await?;

    let preference = loop {
        let line = next_line(link, limit).await?;
        match ClientMessage::parse(&line) {
            Ok(ClientMessage::JoinGame { preference }) => break preference,
            Err(e) if tag_of(&line) == tags::JOIN_GAME => {
                warn!(peer = link.peer(), player = %name, "人数偏好无效，按任意人数处理: {}", e);
                break Preference::Any;
            }
            _ => debug!(peer = link.peer(), line = %line, "等待 JOINGAME，忽略"),
        }
    };

    Ok((name, preference))
}

async fn next_line(link: &mut PlayerLink, limit: Duration) -> Result<String> {
    timeout(limit, link.next_line())
        .await
        .map_err(|_| ProtocolError::ConnectionTimeout)??
        .ok_or(ProtocolError::ConnectionClosed)
}

fn tag_of(line: &str) -> &str {
    line.split(DELIMITER).next().unwrap_or_default().trim()
}
