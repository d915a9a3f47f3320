//! 服务器主循环

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{error, info, warn};

use protocol::{Connection, Listener, TcpConnection, TcpListener};

use crate::config::ServerConfig;
use crate::connection::serve_connection;
use crate::matchmaker::Matchmaker;
use crate::player::PlayerLink;
use crate::session::SessionSettings;

/// 关闭时等待会话结算的最长时间
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// 服务器
pub struct Server {
    listener: TcpListener,
    matchmaker: Arc<Matchmaker>,
    permits: Arc<Semaphore>,
    handshake_timeout: Duration,
}

impl Server {
    /// 绑定监听地址
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听 {}", addr))?;

        info!(
            addr = %listener.local_addr().unwrap_or(addr),
            max_connections = config.max_connections,
            "服务端已启动"
        );

        Ok(Self {
            listener,
            matchmaker: Arc::new(Matchmaker::new(SessionSettings::from(&config))),
            permits: Arc::new(Semaphore::new(config.max_connections)),
            handshake_timeout: config.handshake_timeout(),
        })
    }

    /// 实际监听的地址
    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    pub fn matchmaker(&self) -> Arc<Matchmaker> {
        Arc::clone(&self.matchmaker)
    }

    /// 运行直到收到 Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("无法监听 Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// 运行直到 `shutdown` 完成
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let coordinator = tokio::spawn(Arc::clone(&self.matchmaker).run());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("收到关闭信号");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => self.admit(conn),
                    Err(e) => {
                        warn!("接受连接失败: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        self.matchmaker.shutdown();
        if let Err(e) = coordinator.await {
            error!("匹配任务异常退出: {}", e);
        }

        // 等待被强制结束的会话发送最终得分
        let registry = Arc::clone(self.matchmaker.registry());
        let deadline = Instant::now() + SHUTDOWN_TIMEOUT;
        while !registry.is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if !registry.is_empty() {
            warn!(sessions = registry.len(), "部分会话未能在关闭前结束");
        }

        info!("服务端已关闭");
        Ok(())
    }

    /// 在连接数上限内接纳新连接并启动握手任务
    fn admit(&self, mut conn: TcpConnection) {
        let peer = conn.peer_addr().unwrap_or_else(|| "unknown".to_string());
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => {
                info!(peer = %peer, "新连接");
                let link = PlayerLink::from_tcp(conn, permit);
                tokio::spawn(serve_connection(
                    link,
                    Arc::clone(&self.matchmaker),
                    self.handshake_timeout,
                ));
            }
            Err(_) => {
                warn!(peer = %peer, "连接数已达上限，拒绝连接");
                tokio::spawn(async move {
                    let _ = conn.close().await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{ClientMessage, Connector, Preference, ServerMessage, TcpConnector};
    use tokio::sync::oneshot;

    fn config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_connections: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let server = Server::bind(config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let matchmaker = server.matchmaker();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = stopped.await;
        }));

        let mut first = TcpConnector.connect(&addr).await.unwrap();
        first
            .send(&ClientMessage::ConnectRequest {
                name: "alice".to_string(),
                extensions: vec![],
            })
            .await
            .unwrap();
        let accept: ServerMessage = first.recv().await.unwrap();
        assert_eq!(accept, ServerMessage::ConnectAccept { extensions: vec![] });

        // 第二个连接超出上限，被直接关闭
        let mut second = TcpConnector.connect(&addr).await.unwrap();
        let refused: protocol::Result<ServerMessage> = second.recv().await;
        assert!(refused.is_err());

        first
            .send(&ClientMessage::JoinGame {
                preference: Preference::Exactly(2),
            })
            .await
            .unwrap();
        for _ in 0..100 {
            if matchmaker.session_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(matchmaker.session_count(), 1);
        let _ = stop.send(());

        // 关闭时未开局的会话也会收到最终得分
        let over: ServerMessage = first.recv().await.unwrap();
        assert_eq!(
            over,
            ServerMessage::GameOver {
                scores: vec![("alice".to_string(), 0)]
            }
        );
        task.await.unwrap().unwrap();
    }
}
