//! 匹配器
//!
//! 握手完成的玩家进入等待队列，由单一协调任务按人数偏好分配到会话；
//! 没有合适的会话时新建一个并为其启动控制器任务。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, info};

use crate::player::{Player, PlayerId, PlayerIds};
use crate::session::{
    SessionController, SessionHandle, SessionId, SessionInfo, SessionSettings,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 活跃会话注册表
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<Vec<Arc<SessionHandle>>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 分配新的会话 ID
    pub fn next_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn insert(&self, handle: Arc<SessionHandle>) {
        lock(&self.sessions).push(handle);
    }

    pub fn remove(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        let mut sessions = lock(&self.sessions);
        let pos = sessions.iter().position(|s| s.id() == id)?;
        Some(sessions.remove(pos))
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        lock(&self.sessions).iter().find(|s| s.id() == id).cloned()
    }

    /// 按创建顺序返回所有会话
    pub fn snapshot(&self) -> Vec<Arc<SessionHandle>> {
        lock(&self.sessions).clone()
    }

    /// 所有会话的摘要
    pub fn list(&self) -> Vec<SessionInfo> {
        self.snapshot().iter().map(|s| s.info()).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 强制结束所有会话
    pub fn force_all(&self) {
        for session in self.snapshot() {
            session.force_over();
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 匹配器
#[derive(Debug)]
pub struct Matchmaker {
    queue: Mutex<VecDeque<Player>>,
    notify: Notify,
    registry: Arc<SessionRegistry>,
    settings: SessionSettings,
    shutdown: AtomicBool,
    ids: PlayerIds,
}

impl Matchmaker {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            registry: Arc::new(SessionRegistry::new()),
            settings,
            shutdown: AtomicBool::new(false),
            ids: PlayerIds::new(),
        }
    }

    /// 分配玩家 ID
    pub fn next_player_id(&self) -> PlayerId {
        self.ids.generate()
    }

    /// 玩家进入等待队列
    pub fn enqueue(&self, player: Player) {
        debug!(player = %player.name, preference = %player.preference, "玩家进入匹配队列");
        lock(&self.queue).push_back(player);
        self.notify.notify_one();
    }

    /// 队列中的玩家数
    pub fn queued(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// 所有活跃会话的摘要
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.registry.list()
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// 强制结束并移除一个会话
    pub fn remove_session(&self, id: SessionId) -> bool {
        match self.registry.get(id) {
            Some(session) => {
                session.force_over();
                true
            }
            None => false,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// 停止匹配并强制结束所有会话
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(sessions = self.registry.len(), "匹配器关闭");
        self.notify.notify_one();
        self.registry.force_all();
    }

    /// 协调循环，直到 [`shutdown`](Self::shutdown) 被调用
    pub async fn run(self: Arc<Self>) {
        loop {
            let notified = self.notify.notified();
            if self.is_shutdown() {
                break;
            }

            let waiting = std::mem::take(&mut *lock(&self.queue));
            for player in waiting {
                self.assign(player);
            }

            notified.await;
        }

        // 关闭后仍在队列中的玩家直接断开
        let leftover = std::mem::take(&mut *lock(&self.queue));
        if !leftover.is_empty() {
            debug!(count = leftover.len(), "丢弃未匹配的玩家");
        }
    }

    /// 分配到第一个可加入的会话，否则新建会话
    fn assign(&self, player: Player) {
        let mut player = player;
        for session in self.registry.snapshot() {
            match session.try_join(player) {
                Ok(()) => {
                    info!(
                        session = session.id(),
                        members = session.member_count(),
                        "玩家加入会话"
                    );
                    return;
                }
                Err(rejected) => player = rejected,
            }
        }

        let name = player.name.clone();
        let handle = Arc::new(SessionHandle::new(self.registry.next_id(), player));
        info!(session = handle.id(), player = %name, preference = %handle.preference(), "创建新会话");
        self.registry.insert(Arc::clone(&handle));
        let controller = SessionController::new(handle, Arc::clone(&self.registry), self.settings);
        tokio::spawn(controller.run());
    }
}
