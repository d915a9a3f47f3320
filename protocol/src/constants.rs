//! 协议常量定义

use std::time::Duration;

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 6666;

/// 字段分隔符
pub const DELIMITER: char = ',';

/// GAMESTARTED 中玩家块的分隔符
pub const BLOCK_DELIMITER: char = '|';

/// 本地退出口令（不区分大小写，永不发往网络）
pub const EXIT_COMMAND: &str = "exit";

/// 单行最大长度（字节）
pub const MAX_LINE_LEN: usize = 4096;

/// 棋盘格子数
pub const MAX_FIELDS: usize = 36;

/// 棋盘行数（行号 0..=5）
pub const BOARD_ROWS: i32 = 6;

/// 每局最少玩家数
pub const MIN_PLAYERS: usize = 2;

/// 每局最多玩家数
pub const MAX_PLAYERS: usize = 4;

/// 开局每人手牌数
pub const HAND_SIZE: usize = 4;

/// 旋转数量（0, 1, 2）
pub const ROTATIONS: u8 = 3;

/// 昵称最大长度
pub const MAX_NAME_LEN: usize = 20;

/// 服务端最大连接数
pub const MAX_CONNECTIONS: usize = 100;

/// 读取走法的默认尝试次数
pub const READ_ATTEMPTS: u32 = 1;

/// 每次读取的超时（秒）
pub const READ_TIMEOUT_SECS: u64 = 90;

/// "任意人数" 对局开局前的等待窗口（秒）
pub const GRACE_WINDOW_SECS: u64 = 30;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 每次读取的超时 Duration
pub const READ_TIMEOUT: Duration = Duration::from_secs(READ_TIMEOUT_SECS);

/// 等待窗口 Duration
pub const GRACE_WINDOW: Duration = Duration::from_secs(GRACE_WINDOW_SECS);

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 服务端支持的扩展字符（当前为空）
pub const SERVER_EXTENSIONS: &[char] = &[];

/// 每个格子的奖励倍数，按线性索引排列。
///
/// 左右镜像对称；倍数为 1 的格子恰好四个（6, 11, 13, 20），
/// 也只有它们可以作为空棋盘上的第一手。
pub const BONUS: [u32; MAX_FIELDS] = [
    4, //
    2, 3, 2, //
    2, 2, 1, 2, 2, //
    3, 2, 1, 2, 1, 2, 3, //
    2, 3, 2, 2, 1, 2, 2, 3, 2, //
    4, 2, 2, 3, 2, 2, 2, 3, 2, 2, 4,
];
