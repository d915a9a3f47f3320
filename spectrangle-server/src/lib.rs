//! Spectrangle 服务端
//!
//! 包含:
//! - 配置加载
//! - 连接握手
//! - 匹配与会话注册表
//! - 会话控制（回合循环）
//! - 限时读取

pub mod config;
pub mod connection;
pub mod game;
pub mod matchmaker;
pub mod player;
pub mod reader;
pub mod server;
pub mod session;

pub use config::{ConfigError, ServerConfig};
pub use game::{Game, Seat};
pub use matchmaker::{Matchmaker, SessionRegistry};
pub use player::{Player, PlayerId, PlayerLink};
pub use reader::{read_line, ReadPolicy};
pub use server::Server;
pub use session::{SessionHandle, SessionId, SessionInfo, SessionSettings, SessionState};
