//! 消息类型定义
//!
//! 所有消息都是一行文本：命令标签后跟以逗号分隔的字段。
//! 解析时容忍字段两侧的空格与空字段（例如行尾多余的分隔符）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{BLOCK_DELIMITER, DELIMITER, MAX_NAME_LEN, MAX_PLAYERS, MIN_PLAYERS};
use crate::error::{ProtocolError, Result};
use crate::tile::Tile;

/// 命令标签
pub mod tags {
    pub const CONNECT_REQUEST: &str = "CONNECTREQUEST";
    pub const CONNECT_ACCEPT: &str = "CONNECTACCEPT";
    pub const JOIN_GAME: &str = "JOINGAME";
    pub const GAME_STARTED: &str = "GAMESTARTED";
    pub const MOVE_REQUEST: &str = "MOVEREQUEST";
    pub const MOVE: &str = "MOVE";
    pub const TILE_REPLACE: &str = "TILEREPLACE";
    pub const SKIP: &str = "SKIP";
    pub const TURN_MADE: &str = "TURNMADE";
    pub const PLAYER_KICKED: &str = "PLAYERKICKED";
    pub const GAME_OVER: &str = "GAMEOVER";

    /// TURNMADE 的子类型
    pub const MOVE_SHORT: &str = "M";
    pub const REPLACE_SHORT: &str = "R";
    pub const SKIP_SHORT: &str = "S";
}

/// 一行文本消息的编解码
pub trait WireMessage: Sized + Send {
    /// 编码为一行（不含换行符）
    fn encode(&self) -> String;

    /// 从一行解析
    fn parse(line: &str) -> Result<Self>;
}

/// 人数偏好
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preference {
    /// 任意人数（线上为 -1）
    Any,
    /// 恰好 n 人（2..=4）
    Exactly(u8),
}

impl Preference {
    /// 从线上整数值转换
    pub fn from_wire(value: i64) -> Option<Preference> {
        match value {
            -1 => Some(Preference::Any),
            v if (MIN_PLAYERS as i64..=MAX_PLAYERS as i64).contains(&v) => {
                Some(Preference::Exactly(v as u8))
            }
            _ => None,
        }
    }

    /// 线上整数值
    pub fn to_wire(self) -> i64 {
        match self {
            Preference::Any => -1,
            Preference::Exactly(n) => n as i64,
        }
    }

    /// 人数为 `count` 时是否还能再容纳一人
    pub fn admits(self, count: usize) -> bool {
        match self {
            Preference::Any => count < MAX_PLAYERS,
            Preference::Exactly(n) => count < n as usize,
        }
    }

    /// 人数为 `count` 时是否满足开局条件
    pub fn is_satisfied(self, count: usize) -> bool {
        match self {
            Preference::Any => (MIN_PLAYERS..=MAX_PLAYERS).contains(&count),
            Preference::Exactly(n) => count == n as usize,
        }
    }

    pub fn is_any(self) -> bool {
        self == Preference::Any
    }
}

impl Default for Preference {
    fn default() -> Self {
        Preference::Any
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

impl FromStr for Preference {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ProtocolError::InvalidPreference {
            value: s.to_string(),
        };
        let value: i64 = s.trim().parse().map_err(|_| invalid())?;
        Preference::from_wire(value).ok_or_else(invalid)
    }
}

/// 校验昵称：非空、不超过最大长度、不含协议分隔符
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ProtocolError::NameEmpty);
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ProtocolError::NameTooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    if let Some(c) = name
        .chars()
        .find(|&c| c == DELIMITER || c == BLOCK_DELIMITER)
    {
        return Err(ProtocolError::NameReserved(c));
    }
    Ok(())
}

/// 扩展协商：客户端声明且服务端支持的扩展
pub fn match_extensions(client: &[char], server: &[char]) -> Vec<char> {
    let mut matched: Vec<char> = client
        .iter()
        .copied()
        .filter(|c| server.contains(c))
        .collect();
    matched.dedup();
    matched
}

/// 发牌时某位玩家的手牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealtHand {
    pub name: String,
    pub tiles: Vec<Tile>,
}

/// 一回合的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnMade {
    /// 落子；`hand` 为补牌后的新手牌
    Placed {
        name: String,
        hand: Vec<Tile>,
        tile: Tile,
        rotation: u8,
        index: usize,
    },
    /// 换牌；`tile` 为换出的牌
    Replaced {
        name: String,
        hand: Vec<Tile>,
        tile: Tile,
    },
    /// 跳过
    Skipped { name: String, hand: Vec<Tile> },
}

impl TurnMade {
    /// 本回合的玩家
    pub fn name(&self) -> &str {
        match self {
            TurnMade::Placed { name, .. }
            | TurnMade::Replaced { name, .. }
            | TurnMade::Skipped { name, .. } => name,
        }
    }

    /// 回合结束后该玩家的手牌
    pub fn hand(&self) -> &[Tile] {
        match self {
            TurnMade::Placed { hand, .. }
            | TurnMade::Replaced { hand, .. }
            | TurnMade::Skipped { hand, .. } => hand,
        }
    }
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// 连接请求
    ConnectRequest { name: String, extensions: Vec<char> },
    /// 加入游戏
    JoinGame { preference: Preference },
    /// 落子；旋转和索引保持原始整数，由规则引擎校验
    Move {
        tile: Tile,
        rotation: i64,
        index: i64,
    },
    /// 换牌
    TileReplace { tile: Tile },
    /// 跳过
    Skip,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// 接受连接，附带协商后的扩展
    ConnectAccept { extensions: Vec<char> },
    /// 游戏开始，附带每位玩家的初始手牌
    GameStarted { players: Vec<DealtHand> },
    /// 轮到你走
    MoveRequest,
    /// 回合结果
    TurnMade(TurnMade),
    /// 玩家被踢出
    PlayerKicked { name: String },
    /// 游戏结束，附带最终得分
    GameOver { scores: Vec<(String, u32)> },
}

/// 按分隔符切分，去掉两侧空格并丢弃空字段
fn fields(s: &str) -> Vec<&str> {
    s.split(DELIMITER)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

fn malformed(line: &str) -> ProtocolError {
    ProtocolError::Malformed {
        line: line.to_string(),
    }
}

fn parse_int(field: &str, line: &str) -> Result<i64> {
    field.parse().map_err(|_| malformed(line))
}

fn parse_tiles(codes: &[&str]) -> Result<Vec<Tile>> {
    codes.iter().map(|c| Tile::from_code(c)).collect()
}

fn join_codes(tiles: &[Tile]) -> String {
    tiles
        .iter()
        .map(Tile::code)
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// 标签 + 若干字段
fn line_of<I, S>(tag: &str, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = tag.to_string();
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            continue;
        }
        line.push(DELIMITER);
        line.push_str(part);
    }
    line
}

impl WireMessage for ClientMessage {
    fn encode(&self) -> String {
        match self {
            ClientMessage::ConnectRequest { name, extensions } => {
                let ext: String = extensions.iter().collect();
                line_of(tags::CONNECT_REQUEST, [name.as_str(), ext.as_str()])
            }
            ClientMessage::JoinGame { preference } => {
                line_of(tags::JOIN_GAME, [preference.to_string()])
            }
            ClientMessage::Move {
                tile,
                rotation,
                index,
            } => line_of(
                tags::MOVE,
                [tile.code(), rotation.to_string(), index.to_string()],
            ),
            ClientMessage::TileReplace { tile } => line_of(tags::TILE_REPLACE, [tile.code()]),
            ClientMessage::Skip => tags::SKIP.to_string(),
        }
    }

    fn parse(line: &str) -> Result<Self> {
        let parts = fields(line);
        let (&tag, args) = parts.split_first().ok_or_else(|| malformed(line))?;

        match tag {
            tags::CONNECT_REQUEST => {
                let name = args.first().ok_or_else(|| malformed(line))?;
                let extensions = args.get(1).map(|e| e.chars().collect()).unwrap_or_default();
                Ok(ClientMessage::ConnectRequest {
                    name: name.to_string(),
                    extensions,
                })
            }
            tags::JOIN_GAME => {
                let value = args.first().ok_or_else(|| malformed(line))?;
                Ok(ClientMessage::JoinGame {
                    preference: value.parse()?,
                })
            }
            tags::MOVE => {
                let [code, rotation, index] = args else {
                    return Err(malformed(line));
                };
                Ok(ClientMessage::Move {
                    tile: Tile::from_code(code)?,
                    rotation: parse_int(rotation, line)?,
                    index: parse_int(index, line)?,
                })
            }
            tags::TILE_REPLACE => {
                let [code] = args else {
                    return Err(malformed(line));
                };
                Ok(ClientMessage::TileReplace {
                    tile: Tile::from_code(code)?,
                })
            }
            tags::SKIP => Ok(ClientMessage::Skip),
            other => Err(ProtocolError::UnknownCommand {
                tag: other.to_string(),
            }),
        }
    }
}

impl WireMessage for ServerMessage {
    fn encode(&self) -> String {
        match self {
            ServerMessage::ConnectAccept { extensions } => {
                let ext: String = extensions.iter().collect();
                line_of(tags::CONNECT_ACCEPT, [ext])
            }
            ServerMessage::GameStarted { players } => {
                let mut line = format!("{}{}{}", tags::GAME_STARTED, DELIMITER, BLOCK_DELIMITER);
                for player in players {
                    for tile in &player.tiles {
                        line.push_str(&tile.code());
                        line.push(DELIMITER);
                    }
                    line.push_str(&player.name);
                    line.push(BLOCK_DELIMITER);
                }
                line
            }
            ServerMessage::MoveRequest => tags::MOVE_REQUEST.to_string(),
            ServerMessage::TurnMade(turn) => match turn {
                TurnMade::Placed {
                    name,
                    hand,
                    tile,
                    rotation,
                    index,
                } => line_of(
                    tags::TURN_MADE,
                    [
                        tags::MOVE_SHORT.to_string(),
                        name.clone(),
                        join_codes(hand),
                        tile.code(),
                        rotation.to_string(),
                        index.to_string(),
                    ],
                ),
                TurnMade::Replaced { name, hand, tile } => line_of(
                    tags::TURN_MADE,
                    [
                        tags::REPLACE_SHORT.to_string(),
                        name.clone(),
                        join_codes(hand),
                        tile.code(),
                    ],
                ),
                TurnMade::Skipped { name, hand } => line_of(
                    tags::TURN_MADE,
                    [tags::SKIP_SHORT.to_string(), name.clone(), join_codes(hand)],
                ),
            },
            ServerMessage::PlayerKicked { name } => line_of(tags::PLAYER_KICKED, [name]),
            ServerMessage::GameOver { scores } => line_of(
                tags::GAME_OVER,
                scores
                    .iter()
                    .flat_map(|(name, score)| [name.clone(), score.to_string()]),
            ),
        }
    }

    fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (tag, rest) = match line.split_once(DELIMITER) {
            Some((tag, rest)) => (tag.trim(), rest),
            None => (line, ""),
        };

        match tag {
            tags::CONNECT_ACCEPT => {
                let extensions = fields(rest)
                    .first()
                    .map(|e| e.chars().collect())
                    .unwrap_or_default();
                Ok(ServerMessage::ConnectAccept { extensions })
            }
            tags::GAME_STARTED => {
                let mut players = Vec::new();
                for block in rest.split(BLOCK_DELIMITER) {
                    let parts = fields(block);
                    let Some((name, codes)) = parts.split_last() else {
                        continue;
                    };
                    players.push(DealtHand {
                        name: name.to_string(),
                        tiles: parse_tiles(codes)?,
                    });
                }
                if players.is_empty() {
                    return Err(malformed(line));
                }
                Ok(ServerMessage::GameStarted { players })
            }
            tags::MOVE_REQUEST => Ok(ServerMessage::MoveRequest),
            tags::TURN_MADE => parse_turn_made(rest, line).map(ServerMessage::TurnMade),
            tags::PLAYER_KICKED => {
                let name = fields(rest).first().ok_or_else(|| malformed(line))?.to_string();
                Ok(ServerMessage::PlayerKicked { name })
            }
            tags::GAME_OVER => {
                let parts = fields(rest);
                if parts.len() % 2 != 0 {
                    return Err(malformed(line));
                }
                let scores = parts
                    .chunks(2)
                    .map(|pair| {
                        let score: u32 = pair[1].parse().map_err(|_| malformed(line))?;
                        Ok((pair[0].to_string(), score))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ServerMessage::GameOver { scores })
            }
            other => Err(ProtocolError::UnknownCommand {
                tag: other.to_string(),
            }),
        }
    }
}

/// TURNMADE 的字段数量随手牌变化：按子类型从尾部取出固定字段，剩下的是手牌
fn parse_turn_made(rest: &str, line: &str) -> Result<TurnMade> {
    let parts = fields(rest);
    let [kind, name, tail @ ..] = parts.as_slice() else {
        return Err(malformed(line));
    };
    let name = name.to_string();

    match *kind {
        tags::MOVE_SHORT => {
            let [hand @ .., code, rotation, index] = tail else {
                return Err(malformed(line));
            };
            let rotation = parse_int(rotation, line)?;
            let index = parse_int(index, line)?;
            Ok(TurnMade::Placed {
                name,
                hand: parse_tiles(hand)?,
                tile: Tile::from_code(code)?,
                rotation: u8::try_from(rotation).map_err(|_| malformed(line))?,
                index: usize::try_from(index).map_err(|_| malformed(line))?,
            })
        }
        tags::REPLACE_SHORT => {
            let [hand @ .., code] = tail else {
                return Err(malformed(line));
            };
            Ok(TurnMade::Replaced {
                name,
                hand: parse_tiles(hand)?,
                tile: Tile::from_code(code)?,
            })
        }
        tags::SKIP_SHORT => Ok(TurnMade::Skipped {
            name,
            hand: parse_tiles(tail)?,
        }),
        _ => Err(malformed(line)),
    }
}
