//! 服务端配置
//!
//! 先读取可选的 JSON 配置文件（环境变量 `SPECTRANGLE_CONFIG` 指定路径），
//! 再用 `SPECTRANGLE_HOST` / `SPECTRANGLE_PORT` 覆盖。

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use protocol::{
    DEFAULT_PORT, GRACE_WINDOW_SECS, MAX_CONNECTIONS, READ_ATTEMPTS, READ_TIMEOUT_SECS,
};

/// 配置文件路径的环境变量
pub const CONFIG_ENV: &str = "SPECTRANGLE_CONFIG";
/// 监听地址的环境变量
pub const HOST_ENV: &str = "SPECTRANGLE_HOST";
/// 监听端口的环境变量
pub const PORT_ENV: &str = "SPECTRANGLE_PORT";

/// 配置错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Port must not be 0")]
    ZeroPort,

    #[error("max_connections must be at least 1")]
    NoConnections,
}

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 最大并发连接数
    pub max_connections: usize,
    /// 每次走法读取的尝试次数（至少 1）
    pub read_attempts: u32,
    /// 每次尝试的超时（秒）
    pub read_timeout_secs: u64,
    /// 握手阶段每一行的超时（秒）
    pub handshake_timeout_secs: u64,
    /// "任意人数" 对局的等待窗口（秒）
    pub grace_window_secs: u64,
    /// 等待玩家时重新检查状态的间隔（毫秒）
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connections: MAX_CONNECTIONS,
            read_attempts: READ_ATTEMPTS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            handshake_timeout_secs: READ_TIMEOUT_SECS,
            grace_window_secs: GRACE_WINDOW_SECS,
            poll_interval_ms: 500,
        }
    }
}

impl ServerConfig {
    /// 从环境变量加载配置
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => {
                tracing::info!("未指定配置文件，使用默认配置");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式无效: {}", path.display()))?;
        tracing::info!("已加载配置: {:?}", path);
        Ok(config)
    }

    /// 用外部键值覆盖地址和端口
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV) {
            self.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        Ok(())
    }

    /// 校验并规范化
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::NoConnections);
        }
        if self.read_attempts == 0 {
            tracing::warn!("read_attempts 为 0，按 1 处理");
            self.read_attempts = 1;
        }
        Ok(())
    }

    /// 监听地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn grace_window(&self) -> Duration {
        Duration::from_secs(self.grace_window_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
