//! 错误类型定义

use thiserror::Error;

/// 落子规则错误（非法走法）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// 格子索引越界
    #[error("Invalid field: {index}")]
    InvalidField { index: i64 },

    /// 格子已被占用
    #[error("Field {index} is not empty")]
    FieldOccupied { index: usize },

    /// 不在标准牌组中的牌
    #[error("Tile {code} is not part of the tile set")]
    InvalidTile { code: String },

    /// 旋转值无效
    #[error("Invalid rotation: {rotation}")]
    InvalidRotation { rotation: i64 },

    /// 颜色与相邻格子不匹配
    #[error("Tile {code} does not fit field {index} with rotation {rotation}")]
    NoMatch {
        code: String,
        index: usize,
        rotation: u8,
    },

    /// 玩家手中没有这张牌
    #[error("Tile {code} is not in hand")]
    TileNotInHand { code: String },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 消息格式错误
    #[error("Malformed message: {line}")]
    Malformed { line: String },

    /// 未知命令
    #[error("Unknown command: {tag}")]
    UnknownCommand { tag: String },

    /// 牌编码错误
    #[error("Invalid tile code: {code}")]
    InvalidTileCode { code: String },

    /// 人数偏好无效
    #[error("Invalid preference: {value} (expected 2, 3, 4 or -1)")]
    InvalidPreference { value: String },

    /// 昵称为空
    #[error("Name is empty")]
    NameEmpty,

    /// 昵称过长
    #[error("Name too long: {len} chars (max: {max})")]
    NameTooLong { len: usize, max: usize },

    /// 昵称包含协议保留字符
    #[error("Name contains a reserved character: {0:?}")]
    NameReserved(char),

    /// 规则错误
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),
}

impl ProtocolError {
    /// 是否表示对端已断开
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ProtocolError::ConnectionClosed | ProtocolError::Io(_))
    }
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
