//! 玩家与连接

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex as AsyncMutex, OwnedSemaphorePermit};

use protocol::{Connection, LineReader, LineWriter, Preference, ServerMessage, TcpConnection};

/// 玩家 ID
pub type PlayerId = u64;

/// 类型擦除后的读端
pub type BoxedReader = LineReader<Box<dyn AsyncRead + Unpin + Send>>;

/// 类型擦除后的写端
pub type BoxedWriter = LineWriter<Box<dyn AsyncWrite + Unpin + Send>>;

/// 可在读取任务之间共享的读端
pub type SharedReader = Arc<AsyncMutex<BoxedReader>>;

/// 玩家的网络连接
///
/// 持有连接许可，连接被丢弃时许可随之释放。
pub struct PlayerLink {
    reader: SharedReader,
    writer: BoxedWriter,
    peer: String,
    _permit: Option<OwnedSemaphorePermit>,
}

impl PlayerLink {
    /// 从任意读写流创建
    pub fn new<R, W>(reader: R, writer: W, peer: impl Into<String>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::from_parts(
            LineReader::new(reader).boxed(),
            LineWriter::new(writer).boxed(),
            peer,
        )
    }

    /// 从已有的行读写端创建
    pub fn from_parts(reader: BoxedReader, writer: BoxedWriter, peer: impl Into<String>) -> Self {
        Self {
            reader: Arc::new(AsyncMutex::new(reader)),
            writer,
            peer: peer.into(),
            _permit: None,
        }
    }

    /// 从 TCP 连接创建，连接许可随连接一起持有
    pub fn from_tcp(conn: TcpConnection, permit: OwnedSemaphorePermit) -> Self {
        let peer = conn.peer_addr().unwrap_or_else(|| "unknown".to_string());
        let (reader, writer) = conn.split();
        Self::from_parts(reader.boxed(), writer.boxed(), peer).with_permit(permit)
    }

    /// 附加连接许可
    pub fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self._permit = Some(permit);
        self
    }

    /// 远端地址
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// 读端
    pub fn reader(&self) -> SharedReader {
        Arc::clone(&self.reader)
    }

    /// 读取下一行（不限时，由调用方加超时）
    pub async fn next_line(&mut self) -> protocol::Result<Option<String>> {
        self.reader.lock().await.next_line().await
    }

    /// 发送消息
    pub async fn send(&mut self, msg: &ServerMessage) -> protocol::Result<()> {
        self.writer.send(msg).await
    }

    /// 关闭写端
    pub async fn close(&mut self) {
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!(peer = %self.peer, "关闭连接失败: {}", e);
        }
    }
}

/// 已完成握手、等待匹配的玩家
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub preference: Preference,
    pub link: PlayerLink,
}

impl Player {
    pub fn new(id: PlayerId, name: String, preference: Preference, link: PlayerLink) -> Self {
        Self {
            id,
            name,
            preference,
            link,
        }
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("preference", &self.preference)
            .field("peer", &self.link.peer)
            .finish()
    }
}

/// 玩家 ID 生成器
#[derive(Debug)]
pub struct PlayerIds {
    next_id: AtomicU64,
}

impl PlayerIds {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// 生成新的玩家 ID
    pub fn generate(&self) -> PlayerId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for PlayerIds {
    fn default() -> Self {
        Self::new()
    }
}
