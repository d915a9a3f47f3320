//! 控制台输入
//!
//! 独立任务逐行读取标准输入，经 mpsc 通道交给等待走法的一方。

use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use protocol::{LineReader, ProtocolError, Tile, EXIT_COMMAND};

/// 控制台命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `move <code> <rotation> <index>`
    Move { tile: Tile, rotation: i64, index: i64 },
    /// `replace <code>`
    Replace { tile: Tile },
    /// `skip`
    Skip,
    /// `hint`
    Hint,
    /// 退出（不会发送给服务端）
    Exit,
}

/// 命令解析错误
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Not a number: {0}")]
    InvalidNumber(String),

    #[error(transparent)]
    InvalidTile(#[from] ProtocolError),
}

/// 解析一行控制台输入
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&first, args)) = words.split_first() else {
        return Err(CommandError::Empty);
    };

    if first.eq_ignore_ascii_case(EXIT_COMMAND) {
        return Ok(Command::Exit);
    }

    let number = |word: &str| {
        word.parse::<i64>()
            .map_err(|_| CommandError::InvalidNumber(word.to_string()))
    };

    match first.to_ascii_lowercase().as_str() {
        "move" | "m" => {
            let [code, rotation, index] = args else {
                return Err(CommandError::Usage("move <tile> <rotation> <index>"));
            };
            Ok(Command::Move {
                tile: Tile::from_code(&code.to_ascii_uppercase())?,
                rotation: number(*rotation)?,
                index: number(*index)?,
            })
        }
        "replace" | "r" => {
            let [code] = args else {
                return Err(CommandError::Usage("replace <tile>"));
            };
            Ok(Command::Replace {
                tile: Tile::from_code(&code.to_ascii_uppercase())?,
            })
        }
        "skip" | "s" => Ok(Command::Skip),
        "hint" | "h" => Ok(Command::Hint),
        _ => Err(CommandError::Unknown(first.to_string())),
    }
}

/// 在后台任务中逐行读取输入；输入结束或接收方关闭时任务退出
pub fn spawn_reader<R>(input: R) -> mpsc::Receiver<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut reader = LineReader::new(input);
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("读取输入失败: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// 读取标准输入
pub fn spawn_stdin() -> mpsc::Receiver<String> {
    spawn_reader(tokio::io::stdin())
}
