//! Spectrangle 客户端
//!
//! 终端客户端：连接服务端、加入对局，由控制台或电脑策略走子。

pub mod game;
pub mod network;
pub mod settings;

pub use game::{Brain, ClientGame, Command, CommandError, PlayerState, Turn};
pub use network::{Listener, Outcome};
pub use settings::{ClientConfig, SettingsError};
