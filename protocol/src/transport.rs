//! 传输层抽象
//!
//! 提供 Connector/Connection/Listener traits 使上层协议与具体传输实现解耦。
//! 线上格式为以换行结尾的文本行，见 [`crate::message`]。

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::{CONNECT_TIMEOUT, MAX_LINE_LEN};
use crate::error::{ProtocolError, Result};
use crate::message::WireMessage;

/// 连接抽象 trait（核心抽象，用于业务层）
#[async_trait]
pub trait Connection: Send {
    /// 发送消息
    async fn send<M: WireMessage + Sync>(&mut self, msg: &M) -> Result<()>;

    /// 接收消息，对端关闭时返回 `ConnectionClosed`
    async fn recv<M: WireMessage>(&mut self) -> Result<M>;

    /// 关闭连接
    async fn close(&mut self) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// 建立连接
    async fn connect(&self, addr: &str) -> Result<Self::Conn>;
}

/// 监听器 trait（服务端使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接器
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)?
            .map_err(ProtocolError::Io)?;

        TcpConnection::from_stream(stream)
    }
}

/// TCP 连接
pub struct TcpConnection {
    reader: LineReader<OwnedReadHalf>,
    writer: LineWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建（服务端使用）
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: LineReader::new(read_half),
            writer: LineWriter::new(write_half),
            peer_addr,
        })
    }

    /// 分离读写端
    pub fn split(self) -> (LineReader<OwnedReadHalf>, LineWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send<M: WireMessage + Sync>(&mut self, msg: &M) -> Result<()> {
        self.writer.send(msg).await
    }

    async fn recv<M: WireMessage>(&mut self) -> Result<M> {
        self.reader.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// TCP 监听器
pub struct TcpListener {
    listener: tokio::net::TcpListener,
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpConnection;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, _addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        TcpConnection::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 行编解码
// ============================================================================

/// 行读取器
///
/// 已读入但尚未组成完整一行的字节保存在内部缓冲区中，
/// 因此 [`LineReader::next_line`] 可以被取消（例如超时）而不丢失数据，
/// 下一次调用会在这些字节之后继续读取。
pub struct LineReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    /// 创建新的行读取器
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(256),
        }
    }

    /// 读取下一行非空文本（去掉行尾的 `\r\n`）
    ///
    /// 对端关闭时返回 `Ok(None)`；关闭前残留的不完整一行会先作为最后一行返回。
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if line.trim().is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }

            if self.buffer.len() > MAX_LINE_LEN {
                let line = String::from_utf8_lossy(&self.buffer[..64]).into_owned();
                tracing::warn!(len = self.buffer.len(), "line exceeds limit, dropping buffer");
                self.buffer.clear();
                return Err(ProtocolError::Malformed { line });
            }

            let mut chunk = [0u8; 1024];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                let rest = std::mem::take(&mut self.buffer);
                let line = String::from_utf8_lossy(&rest).trim().to_string();
                return Ok((!line.is_empty()).then_some(line));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// 读取并解析一条消息
    pub async fn recv<M: WireMessage>(&mut self) -> Result<M> {
        match self.next_line().await? {
            Some(line) => M::parse(&line),
            None => Err(ProtocolError::ConnectionClosed),
        }
    }

    /// 缓冲区中尚未消费的字节数
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl<R: AsyncRead + Unpin + Send + 'static> LineReader<R> {
    /// 擦除底层读端类型，保留已缓冲的字节
    pub fn boxed(self) -> LineReader<Box<dyn AsyncRead + Unpin + Send>> {
        LineReader {
            reader: Box::new(self.reader),
            buffer: self.buffer,
        }
    }
}

/// 行写入器
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> LineWriter<W> {
    /// 创建新的行写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 写入一行并刷新
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// 编码并发送消息
    pub async fn send<M: WireMessage>(&mut self, msg: &M) -> Result<()> {
        self.send_line(&msg.encode()).await
    }

    /// 关闭写端
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

impl<W: AsyncWrite + Unpin + Send + 'static> LineWriter<W> {
    /// 擦除底层写端类型
    pub fn boxed(self) -> LineWriter<Box<dyn AsyncWrite + Unpin + Send>> {
        LineWriter {
            writer: Box::new(self.writer),
        }
    }
}
