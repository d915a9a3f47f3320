//! Spectrangle 共享协议库
//!
//! 包含:
//! - 牌、格子、棋盘等核心数据结构
//! - 落子规则验证与计分
//! - 手牌与牌堆
//! - 消息类型定义 (ClientMessage, ServerMessage) 与文本行编解码
//! - 传输层抽象 (Connector, Connection, Listener traits)

mod bag;
mod board;
mod constants;
mod error;
mod hand;
mod message;
mod rules;
mod tile;
mod transport;

pub use bag::Bag;
pub use board::{Board, Edge, Field, COORDS};
pub use constants::*;
pub use error::{ProtocolError, Result, RuleError};
pub use hand::Hand;
pub use message::{
    match_extensions, tags, validate_name, ClientMessage, DealtHand, Preference, ServerMessage,
    TurnMade, WireMessage,
};
pub use rules::Rules;
pub use tile::{Colour, Tile, JOKER, TILE_SET};
pub use transport::{
    Connection, Connector, LineReader, LineWriter, Listener, TcpConnection, TcpConnector,
    TcpListener,
};
