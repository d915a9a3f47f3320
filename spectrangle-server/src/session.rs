//! 会话（一局游戏）
//!
//! [`SessionHandle`] 是会话的共享部分，供匹配器加入玩家、查询状态和强制结束；
//! [`SessionController`] 在独立任务中驱动会话的完整生命周期：
//! 等待玩家 → 开局发牌 → 回合循环 → 结算并清理。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use protocol::{
    Bag, ClientMessage, Preference, ServerMessage, WireMessage, GRACE_WINDOW, MAX_PLAYERS, MIN_PLAYERS,
};

use crate::config::ServerConfig;
use crate::game::{Game, Seat};
use crate::matchmaker::SessionRegistry;
use crate::player::{Player, PlayerId, PlayerLink};
use crate::reader::{read_line, ReadPolicy};

/// 会话 ID
pub type SessionId = u64;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// 等待玩家加入
    Waiting,
    /// 人数已确定，正在开局
    Started,
    /// 回合进行中
    Playing,
    /// 已结束
    Over,
}

/// 会话摘要（用于列表展示）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub preference: Preference,
    pub members: Vec<String>,
    pub state: SessionState,
    pub forced: bool,
    pub created_at: DateTime<Utc>,
}

/// 会话运行参数
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// 走法读取策略
    pub read_policy: ReadPolicy,
    /// "任意人数" 会话凑够人数后的等待窗口
    pub grace_window: Duration,
    /// 等待玩家时重新检查的间隔
    pub poll_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            read_policy: ReadPolicy::default(),
            grace_window: GRACE_WINDOW,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl From<&ServerConfig> for SessionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            read_policy: ReadPolicy::new(config.read_attempts, config.read_timeout()),
            grace_window: config.grace_window(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// 开局前的成员
struct Lobby {
    players: Vec<Player>,
    members: Vec<String>,
    state: SessionState,
}

/// 会话的共享部分
pub struct SessionHandle {
    id: SessionId,
    preference: Preference,
    created_at: DateTime<Utc>,
    lobby: Mutex<Lobby>,
    /// 有玩家加入或会话被强制结束
    joined: Notify,
    forced: AtomicBool,
    forced_notify: Notify,
}

impl SessionHandle {
    /// 以第一位玩家创建会话
    pub fn new(id: SessionId, first: Player) -> Self {
        Self {
            id,
            preference: first.preference,
            created_at: Utc::now(),
            lobby: Mutex::new(Lobby {
                members: vec![first.name.clone()],
                players: vec![first],
                state: SessionState::Waiting,
            }),
            joined: Notify::new(),
            forced: AtomicBool::new(false),
            forced_notify: Notify::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn preference(&self) -> Preference {
        self.preference
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn lobby(&self) -> MutexGuard<'_, Lobby> {
        self.lobby.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 尝试加入；不符合条件时把玩家交还给调用方
    ///
    /// 条件：仍在等待、未被强制结束、人数低于上限且低于双方的人数偏好，
    /// 且会话中没有同名玩家（客户端按昵称区分玩家）。
    pub fn try_join(&self, player: Player) -> Result<(), Player> {
        {
            let mut lobby = self.lobby();
            let count = lobby.members.len();
            let eligible = lobby.state == SessionState::Waiting
                && !self.is_forced()
                && count < MAX_PLAYERS
                && self.preference.admits(count)
                && player.preference.admits(count)
                && !lobby.members.contains(&player.name);
            if !eligible {
                return Err(player);
            }
            lobby.members.push(player.name.clone());
            lobby.players.push(player);
        }
        self.joined.notify_one();
        Ok(())
    }

    /// 当前成员数
    pub fn member_count(&self) -> usize {
        self.lobby().members.len()
    }

    pub fn members(&self) -> Vec<String> {
        self.lobby().members.clone()
    }

    pub fn state(&self) -> SessionState {
        self.lobby().state
    }

    /// 会话摘要
    pub fn info(&self) -> SessionInfo {
        let lobby = self.lobby();
        SessionInfo {
            id: self.id,
            preference: self.preference,
            members: lobby.members.clone(),
            state: lobby.state,
            forced: self.is_forced(),
            created_at: self.created_at,
        }
    }

    /// 强制结束（可在任意状态调用）
    pub fn force_over(&self) {
        if !self.forced.swap(true, Ordering::SeqCst) {
            debug!(session = self.id, "会话被强制结束");
        }
        self.forced_notify.notify_waiters();
        self.joined.notify_one();
    }

    pub fn is_forced(&self) -> bool {
        self.forced.load(Ordering::SeqCst)
    }

    /// 等待会话被强制结束
    pub async fn forced(&self) {
        loop {
            let notified = self.forced_notify.notified();
            if self.is_forced() {
                return;
            }
            notified.await;
        }
    }

    /// 冻结成员并取出所有玩家
    fn freeze(&self) -> Vec<Player> {
        let mut lobby = self.lobby();
        if lobby.state == SessionState::Waiting {
            lobby.state = SessionState::Started;
        }
        std::mem::take(&mut lobby.players)
    }

    fn set_state(&self, state: SessionState) {
        self.lobby().state = state;
    }

    fn remove_member(&self, name: &str) {
        let mut lobby = self.lobby();
        if let Some(pos) = lobby.members.iter().position(|m| m == name) {
            lobby.members.remove(pos);
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("preference", &self.preference)
            .field("forced", &self.is_forced())
            .finish()
    }
}

/// 玩家被移出的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Timeout,
    IllegalMove,
    Disconnected,
}

impl fmt::Display for Removal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Removal::Timeout => "超时",
            Removal::IllegalMove => "非法走法",
            Removal::Disconnected => "断开连接",
        };
        f.write_str(text)
    }
}

/// 会话控制器，独占对局状态与所有玩家连接
pub struct SessionController {
    handle: Arc<SessionHandle>,
    registry: Arc<SessionRegistry>,
    settings: SessionSettings,
    links: HashMap<PlayerId, PlayerLink>,
    game: Option<Game>,
}

impl SessionController {
    pub fn new(
        handle: Arc<SessionHandle>,
        registry: Arc<SessionRegistry>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            handle,
            registry,
            settings,
            links: HashMap::new(),
            game: None,
        }
    }

    /// 运行整个会话
    pub async fn run(mut self) {
        info!(
            session = self.handle.id(),
            preference = %self.handle.preference(),
            "会话等待玩家"
        );
        if Self::wait_for_players(&self.handle, self.settings).await {
            self.start().await;
            self.play().await;
        }
        self.finish().await;
    }

    /// 等待人数满足偏好；被强制结束时返回 false
    async fn wait_for_players(handle: &SessionHandle, settings: SessionSettings) -> bool {
        let preference = handle.preference();
        let poll = settings.poll_interval;

        loop {
            if handle.is_forced() {
                return false;
            }
            if preference.is_satisfied(handle.member_count()) {
                break;
            }
            let _ = timeout(poll, handle.joined.notified()).await;
        }

        if preference.is_any() {
            debug!(session = handle.id(), "人数已满足，等待更多玩家加入");
            let deadline = Instant::now() + settings.grace_window;
            loop {
                if handle.is_forced() {
                    return false;
                }
                if handle.member_count() >= MAX_PLAYERS {
                    break;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let _ = timeout((deadline - now).min(poll), handle.joined.notified()).await;
            }
        }
        true
    }

    /// 开局：随机先手，发牌并广播
    async fn start(&mut self) {
        let players = self.handle.freeze();
        let mut seats = Vec::with_capacity(players.len());
        for player in players {
            seats.push(Seat::new(player.id, player.name));
            self.links.insert(player.id, player.link);
        }

        let first = rand::thread_rng().gen_range(0..seats.len().max(1));
        let mut game = Game::new(seats, Bag::new());
        let dealt = game.start(first);

        info!(
            session = self.handle.id(),
            players = ?game.scores().into_iter().map(|(name, _)| name).collect::<Vec<_>>(),
            first = game.current_player().map(|s| s.name.as_str()).unwrap_or_default(),
            "对局开始"
        );
        self.game = Some(game);
        self.handle.set_state(SessionState::Playing);
        self.broadcast(&ServerMessage::GameStarted { players: dealt })
            .await;
    }

    fn is_over(&self) -> bool {
        self.handle.is_forced() || self.game.as_ref().map_or(true, Game::is_over)
    }

    /// 回合循环
    async fn play(&mut self) {
        while !self.is_over() {
            let Some((id, name)) = self
                .game
                .as_ref()
                .and_then(Game::current_player)
                .map(|seat| (seat.id, seat.name.clone()))
            else {
                break;
            };

            self.take_turn(id, &name).await;

            if let Some(game) = self.game.as_mut() {
                game.advance();
            }
        }
    }

    /// 当前玩家的一个回合
    async fn take_turn(&mut self, id: PlayerId, name: &str) {
        let session = self.handle.id();
        let Some(link) = self.links.get_mut(&id) else {
            self.remove_players(vec![(id, Removal::Disconnected)]).await;
            return;
        };

        if let Err(e) = link.send(&ServerMessage::MoveRequest).await {
            debug!(session, player = name, "发送走法请求失败: {}", e);
            self.remove_players(vec![(id, Removal::Disconnected)]).await;
            return;
        }

        let reader = link.reader();
        let handle = Arc::clone(&self.handle);
        let read = tokio::select! {
            read = read_line(&reader, self.settings.read_policy) => read,
            _ = handle.forced() => return,
        };

        match read {
            Ok(Some(line)) => self.apply(id, name, &line).await,
            Ok(None) => {
                info!(session, player = name, "玩家未在限定时间内走子");
                self.remove_players(vec![(id, Removal::Timeout)]).await;
            }
            Err(e) if e.is_disconnect() => {
                debug!(session, player = name, "读取失败: {}", e);
                self.remove_players(vec![(id, Removal::Disconnected)]).await;
            }
            Err(e) => {
                warn!(session, player = name, "协议错误，本回合作废: {}", e);
            }
        }
    }

    /// 解析并执行一条走法命令
    async fn apply(&mut self, id: PlayerId, name: &str, line: &str) {
        let session = self.handle.id();
        let Some(game) = self.game.as_mut() else {
            return;
        };

        let result = match ClientMessage::parse(line) {
            Ok(ClientMessage::Move {
                tile,
                rotation,
                index,
            }) => game.attempt_move(tile, rotation, index),
            Ok(ClientMessage::TileReplace { tile }) => game.exchange(tile),
            Ok(ClientMessage::Skip) => match game.skip() {
                Some(turn) => Ok(turn),
                None => return,
            },
            Ok(other) => {
                warn!(session, player = name, ?other, "回合中收到非走法命令，本回合作废");
                return;
            }
            Err(e) => {
                warn!(session, player = name, line, "无法解析的命令，本回合作废: {}", e);
                return;
            }
        };

        match result {
            Ok(turn) => {
                debug!(session, player = name, turn = ?turn, "回合完成");
                self.broadcast(&ServerMessage::TurnMade(turn)).await;
            }
            Err(e) => {
                warn!(session, player = name, "非法走法: {}", e);
                self.remove_players(vec![(id, Removal::IllegalMove)]).await;
            }
        }
    }

    /// 按加入顺序发送给所有成员，返回发送失败的玩家
    async fn send_all(&mut self, msg: &ServerMessage) -> Vec<PlayerId> {
        let order: Vec<PlayerId> = match &self.game {
            Some(game) => game.seats().iter().map(|s| s.id).collect(),
            None => self.links.keys().copied().collect(),
        };

        let mut failed = Vec::new();
        for id in order {
            if let Some(link) = self.links.get_mut(&id) {
                if let Err(e) = link.send(msg).await {
                    debug!(session = self.handle.id(), player = id, "发送失败: {}", e);
                    failed.push(id);
                }
            }
        }
        failed
    }

    /// 广播；发送失败的玩家按断线处理
    async fn broadcast(&mut self, msg: &ServerMessage) {
        let failed = self.send_all(msg).await;
        if !failed.is_empty() {
            let removals = failed
                .into_iter()
                .map(|id| (id, Removal::Disconnected))
                .collect();
            self.remove_players(removals).await;
        }
    }

    /// 移出玩家并通知其余成员；每次移出恰好广播一次 PLAYERKICKED
    async fn remove_players(&mut self, mut pending: Vec<(PlayerId, Removal)>) {
        let session = self.handle.id();
        while let Some((id, reason)) = pending.pop() {
            let Some(seat) = self.game.as_mut().and_then(|game| game.remove(id)) else {
                continue;
            };
            if let Some(mut link) = self.links.remove(&id) {
                link.close().await;
            }
            self.handle.remove_member(&seat.name);
            warn!(session, player = %seat.name, %reason, "玩家被移出对局");

            let kicked = ServerMessage::PlayerKicked { name: seat.name };
            let failed = self.send_all(&kicked).await;
            pending.extend(failed.into_iter().map(|id| (id, Removal::Disconnected)));

            let remaining = self.game.as_ref().map_or(0, |g| g.seats().len());
            if remaining < MIN_PLAYERS && !self.handle.is_forced() {
                info!(session, remaining, "人数不足，强制结束");
                self.handle.force_over();
            }
        }
    }

    /// 结算：广播最终得分，关闭所有连接并从注册表移除
    async fn finish(&mut self) {
        let session = self.handle.id();

        let scores = match &self.game {
            Some(game) => game.scores(),
            None => {
                // 开局前被强制结束：仍然通知已加入的玩家
                let players = self.handle.freeze();
                let mut scores = Vec::with_capacity(players.len());
                for player in players {
                    scores.push((player.name, 0));
                    self.links.insert(player.id, player.link);
                }
                scores
            }
        };
        self.handle.set_state(SessionState::Over);

        let _ = self
            .send_all(&ServerMessage::GameOver {
                scores: scores.clone(),
            })
            .await;

        let links: Vec<PlayerLink> = self.links.drain().map(|(_, link)| link).collect();
        for mut link in links {
            link.close().await;
        }
        self.registry.remove(session);

        let lifetime = Utc::now() - self.handle.created_at();
        info!(
            session,
            lifetime_secs = lifetime.num_seconds(),
            forced = self.handle.is_forced(),
            ?scores,
            "会话结束"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{LineReader, LineWriter, Tile, TurnMade, WireMessage};
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    /// 测试用的脚本化客户端
    struct TestClient {
        name: String,
        reader: LineReader<ReadHalf<DuplexStream>>,
        writer: LineWriter<WriteHalf<DuplexStream>>,
    }

    impl TestClient {
        async fn recv(&mut self) -> ServerMessage {
            let line = timeout(Duration::from_secs(5), self.reader.next_line())
                .await
                .expect("timed out waiting for server")
                .unwrap()
                .expect("connection closed");
            ServerMessage::parse(&line).unwrap()
        }

        async fn send(&mut self, line: &str) {
            self.writer.send_line(line).await.unwrap();
        }

        /// 一段时间内没有收到任何消息时返回 true
        async fn quiet(&mut self) -> bool {
            timeout(Duration::from_millis(200), self.reader.next_line())
                .await
                .is_err()
        }

        /// 对端关闭后返回 true
        async fn closed(&mut self) -> bool {
            matches!(
                timeout(Duration::from_secs(5), self.reader.next_line()).await,
                Ok(Ok(None))
            )
        }
    }

    fn player(id: PlayerId, name: &str, preference: Preference) -> (Player, TestClient) {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);
        let link = PlayerLink::new(server_read, server_write, name);
        (
            Player::new(id, name.to_string(), preference, link),
            TestClient {
                name: name.to_string(),
                reader: LineReader::new(client_read),
                writer: LineWriter::new(client_write),
            },
        )
    }

    fn settings(read_timeout: Duration, grace: Duration) -> SessionSettings {
        SessionSettings {
            read_policy: ReadPolicy::new(1, read_timeout),
            grace_window: grace,
            poll_interval: Duration::from_millis(20),
        }
    }

    /// 启动一个两人会话并返回 (当前玩家, 另一位玩家)
    async fn two_player_game(
        read_timeout: Duration,
    ) -> (Arc<SessionRegistry>, TestClient, TestClient) {
        let registry = Arc::new(SessionRegistry::new());
        let (alice, mut a) = player(1, "alice", Preference::Exactly(2));
        let (bob, mut b) = player(2, "bob", Preference::Exactly(2));

        let handle = Arc::new(SessionHandle::new(registry.next_id(), alice));
        assert!(handle.try_join(bob).is_ok());
        registry.insert(Arc::clone(&handle));
        tokio::spawn(
            SessionController::new(
                handle,
                Arc::clone(&registry),
                settings(read_timeout, Duration::ZERO),
            )
            .run(),
        );

        for client in [&mut a, &mut b] {
            match client.recv().await {
                ServerMessage::GameStarted { players } => {
                    assert_eq!(players.len(), 2);
                    assert_eq!(players[0].name, "alice");
                    assert!(players.iter().all(|p| p.tiles.len() == 4));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        // 先收到 MOVEREQUEST 的是先手
        let a_first = tokio::select! {
            msg = a.recv() => { assert_eq!(msg, ServerMessage::MoveRequest); true }
            msg = b.recv() => { assert_eq!(msg, ServerMessage::MoveRequest); false }
        };
        if a_first {
            (registry, a, b)
        } else {
            (registry, b, a)
        }
    }

    async fn wait_until_empty(registry: &SessionRegistry) {
        for _ in 0..100 {
            if registry.len() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("session was not removed from the registry");
    }

    #[test]
    fn test_try_join_respects_preferences() {
        let (alice, _a) = player(1, "alice", Preference::Exactly(2));
        let handle = SessionHandle::new(1, alice);

        let (carol, _c) = player(3, "carol", Preference::Exactly(3));
        assert!(handle.try_join(carol).is_ok());
        assert_eq!(handle.member_count(), 2);

        // 会话偏好为 2，已满
        let (dave, _d) = player(4, "dave", Preference::Any);
        assert!(handle.try_join(dave).is_err());
        assert_eq!(handle.members(), vec!["alice", "carol"]);
        assert_eq!(handle.state(), SessionState::Waiting);
    }

    #[test]
    fn test_try_join_rejects_duplicate_name() {
        let (bob, _b) = player(1, "bob", Preference::Any);
        let handle = SessionHandle::new(1, bob);

        let (other_bob, _o) = player(2, "bob", Preference::Any);
        let rejected = handle.try_join(other_bob).unwrap_err();
        assert_eq!(rejected.id, 2);
        assert_eq!(handle.members(), vec!["bob"]);
    }

    #[test]
    fn test_try_join_rejected_after_force() {
        let (alice, _a) = player(1, "alice", Preference::Any);
        let handle = SessionHandle::new(1, alice);
        handle.force_over();
        let (bob, _b) = player(2, "bob", Preference::Any);
        assert!(handle.try_join(bob).is_err());
        assert!(handle.info().forced);
    }

    #[tokio::test]
    async fn test_skip_passes_turn() {
        let (_registry, mut current, mut other) = two_player_game(Duration::from_secs(5)).await;

        let expected = current.name.clone();
        current.send("SKIP").await;
        for client in [&mut current, &mut other] {
            match client.recv().await {
                ServerMessage::TurnMade(TurnMade::Skipped { name, hand }) => {
                    assert_eq!(name, expected);
                    assert_eq!(hand.len(), 4);
                }
                msg => panic!("unexpected {msg:?}"),
            }
        }
        assert_eq!(other.recv().await, ServerMessage::MoveRequest);
    }

    #[tokio::test]
    async fn test_malformed_command_is_noop() {
        let (_registry, mut current, mut other) = two_player_game(Duration::from_secs(5)).await;

        current.send("HELLO,world").await;
        // 没有广播，直接轮到下一位
        assert_eq!(other.recv().await, ServerMessage::MoveRequest);
        other.send("SKIP").await;
        assert!(matches!(current.recv().await, ServerMessage::TurnMade(_)));
        assert!(matches!(other.recv().await, ServerMessage::TurnMade(_)));
        assert_eq!(current.recv().await, ServerMessage::MoveRequest);
    }

    #[tokio::test]
    async fn test_timeout_kicks_and_forces_over() {
        let (registry, mut current, mut other) =
            two_player_game(Duration::from_millis(100)).await;

        assert_eq!(
            other.recv().await,
            ServerMessage::PlayerKicked {
                name: current.name.clone()
            }
        );
        match other.recv().await {
            ServerMessage::GameOver { scores } => {
                assert_eq!(scores, vec![(other.name.clone(), 0)]);
            }
            msg => panic!("unexpected {msg:?}"),
        }
        assert!(current.closed().await);
        assert!(other.closed().await);
        wait_until_empty(&registry).await;
    }

    #[tokio::test]
    async fn test_illegal_move_kicks() {
        let (registry, mut current, mut other) = two_player_game(Duration::from_secs(5)).await;

        // 空棋盘上只能落在开局格
        let tile = Tile::from_code("WWW1").unwrap();
        current
            .send(&ClientMessage::Move { tile, rotation: 0, index: 0 }.encode())
            .await;

        assert_eq!(
            other.recv().await,
            ServerMessage::PlayerKicked {
                name: current.name.clone()
            }
        );
        assert!(matches!(other.recv().await, ServerMessage::GameOver { .. }));
        assert!(current.closed().await);
        wait_until_empty(&registry).await;
    }

    #[tokio::test]
    async fn test_kick_in_three_player_game_continues() {
        let registry = Arc::new(SessionRegistry::new());
        let (alice, a) = player(1, "alice", Preference::Exactly(3));
        let (bob, b) = player(2, "bob", Preference::Exactly(3));
        let (carol, c) = player(3, "carol", Preference::Exactly(3));

        let handle = Arc::new(SessionHandle::new(registry.next_id(), alice));
        handle.try_join(bob).unwrap();
        handle.try_join(carol).unwrap();
        registry.insert(Arc::clone(&handle));
        tokio::spawn(
            SessionController::new(
                Arc::clone(&handle),
                Arc::clone(&registry),
                settings(Duration::from_secs(5), Duration::ZERO),
            )
            .run(),
        );

        let mut clients = vec![a, b, c];
        for client in clients.iter_mut() {
            assert!(matches!(
                client.recv().await,
                ServerMessage::GameStarted { ref players } if players.len() == 3
            ));
        }

        // 找出先手
        let first = {
            let [a, b, c] = &mut clients[..] else {
                unreachable!()
            };
            tokio::select! {
                msg = a.recv() => { assert_eq!(msg, ServerMessage::MoveRequest); 0 }
                msg = b.recv() => { assert_eq!(msg, ServerMessage::MoveRequest); 1 }
                msg = c.recv() => { assert_eq!(msg, ServerMessage::MoveRequest); 2 }
            }
        };
        let kicked = clients[first].name.clone();

        let tile = Tile::from_code("WWW1").unwrap();
        clients[first]
            .send(&ClientMessage::Move { tile, rotation: 0, index: 0 }.encode())
            .await;
        assert!(clients[first].closed().await);

        // 其余两人各收到一次 PLAYERKICKED，按加入顺序的下一位接着走
        let next = (first + 1) % 3;
        let last = (first + 2) % 3;
        for i in [next, last] {
            assert_eq!(
                clients[i].recv().await,
                ServerMessage::PlayerKicked {
                    name: kicked.clone()
                }
            );
        }
        assert_eq!(clients[next].recv().await, ServerMessage::MoveRequest);
        assert!(clients[last].quiet().await);
        assert_eq!(handle.state(), SessionState::Playing);

        // 对局继续：下一位跳过后轮到最后一位
        clients[next].send("SKIP").await;
        for i in [next, last] {
            assert!(matches!(
                clients[i].recv().await,
                ServerMessage::TurnMade(TurnMade::Skipped { .. })
            ));
        }
        assert_eq!(clients[last].recv().await, ServerMessage::MoveRequest);
        assert!(clients[next].quiet().await);
    }

    #[tokio::test]
    async fn test_disconnect_removes_player() {
        let (registry, current, mut other) = two_player_game(Duration::from_secs(5)).await;
        let name = current.name.clone();
        drop(current);

        assert_eq!(other.recv().await, ServerMessage::PlayerKicked { name });
        assert!(matches!(other.recv().await, ServerMessage::GameOver { .. }));
        wait_until_empty(&registry).await;
    }

    #[tokio::test]
    async fn test_forced_before_start_still_reports_scores() {
        let registry = Arc::new(SessionRegistry::new());
        let (alice, mut a) = player(1, "alice", Preference::Exactly(3));
        let handle = Arc::new(SessionHandle::new(registry.next_id(), alice));
        registry.insert(Arc::clone(&handle));
        tokio::spawn(
            SessionController::new(
                Arc::clone(&handle),
                Arc::clone(&registry),
                settings(Duration::from_secs(1), Duration::ZERO),
            )
            .run(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.state(), SessionState::Waiting);
        handle.force_over();

        assert_eq!(
            a.recv().await,
            ServerMessage::GameOver {
                scores: vec![("alice".to_string(), 0)]
            }
        );
        assert!(a.closed().await);
        wait_until_empty(&registry).await;
        assert_eq!(handle.state(), SessionState::Over);
    }

    #[tokio::test]
    async fn test_any_session_holds_grace_window() {
        let registry = Arc::new(SessionRegistry::new());
        let (alice, mut a) = player(1, "alice", Preference::Any);
        let (bob, _b) = player(2, "bob", Preference::Any);
        let handle = Arc::new(SessionHandle::new(registry.next_id(), alice));
        handle.try_join(bob).unwrap();
        registry.insert(Arc::clone(&handle));

        let started = Instant::now();
        tokio::spawn(
            SessionController::new(
                Arc::clone(&handle),
                Arc::clone(&registry),
                settings(Duration::from_secs(5), Duration::from_millis(300)),
            )
            .run(),
        );

        // 等待窗口内加入的第三位玩家进入同一局
        tokio::time::sleep(Duration::from_millis(100)).await;
        let (carol, _c) = player(3, "carol", Preference::Exactly(3));
        assert!(handle.try_join(carol).is_ok());

        match a.recv().await {
            ServerMessage::GameStarted { players } => {
                let names: Vec<_> = players.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["alice", "bob", "carol"]);
            }
            msg => panic!("unexpected {msg:?}"),
        }
        assert!(started.elapsed() >= Duration::from_millis(300));

        // 开局后不再接受加入
        let (dave, _d) = player(4, "dave", Preference::Any);
        assert!(handle.try_join(dave).is_err());
    }
}
