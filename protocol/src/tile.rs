//! 牌与颜色定义

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// 边的颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Colour {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    /// 百搭色（与任何颜色匹配）
    White,
}

impl Colour {
    /// 协议字符
    pub fn to_char(self) -> char {
        match self {
            Colour::Red => 'R',
            Colour::Blue => 'B',
            Colour::Green => 'G',
            Colour::Yellow => 'Y',
            Colour::Purple => 'P',
            Colour::White => 'W',
        }
    }

    /// 从协议字符解析
    pub fn from_char(c: char) -> Option<Colour> {
        match c {
            'R' => Some(Colour::Red),
            'B' => Some(Colour::Blue),
            'G' => Some(Colour::Green),
            'Y' => Some(Colour::Yellow),
            'P' => Some(Colour::Purple),
            'W' => Some(Colour::White),
            _ => None,
        }
    }

    /// 是否为百搭色
    pub fn is_wildcard(self) -> bool {
        self == Colour::White
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// 三角形牌
///
/// 三条边按 (左, 竖, 右) 存放。相等性按未翻转方向比较颜色与分值，忽略翻转状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tile {
    colours: [Colour; 3],
    value: u8,
    flipped: bool,
}

impl Tile {
    /// 创建新牌（未翻转）
    pub const fn new(left: Colour, vertical: Colour, right: Colour, value: u8) -> Self {
        Self {
            colours: [left, vertical, right],
            value,
            flipped: false,
        }
    }

    /// 分值
    pub fn value(&self) -> u8 {
        self.value
    }

    /// 左边颜色
    pub fn left(&self) -> Colour {
        self.colours[0]
    }

    /// 竖边颜色
    pub fn vertical(&self) -> Colour {
        self.colours[1]
    }

    /// 右边颜色
    pub fn right(&self) -> Colour {
        self.colours[2]
    }

    /// (左, 竖, 右)
    pub fn colours(&self) -> [Colour; 3] {
        self.colours
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// 翻转：交换左右两边，竖边不变
    pub fn flip(&mut self) {
        self.colours.swap(0, 2);
        self.flipped = !self.flipped;
    }

    /// 按未翻转方向返回一份拷贝
    pub fn upright(&self) -> Tile {
        let mut tile = *self;
        if tile.flipped {
            tile.flip();
        }
        tile
    }

    /// 是否为百搭牌（三边皆白）
    pub fn is_joker(&self) -> bool {
        self.colours.iter().all(|c| c.is_wildcard())
    }

    /// 是否属于标准牌组
    pub fn is_valid(&self) -> bool {
        TILE_SET.iter().any(|t| t == self)
    }

    /// 四字符编码：三个颜色字符 + 一位数字分值（总是按未翻转方向）
    pub fn code(&self) -> String {
        let mut code = String::with_capacity(4);
        for colour in self.upright().colours {
            code.push(colour.to_char());
        }
        code.push(char::from(b'0' + self.value));
        code
    }

    /// 从四字符编码解析（不检查是否属于标准牌组）
    pub fn from_code(code: &str) -> Result<Tile, ProtocolError> {
        let invalid = || ProtocolError::InvalidTileCode {
            code: code.to_string(),
        };
        let chars: Vec<char> = code.trim().chars().collect();
        if chars.len() != 4 {
            return Err(invalid());
        }
        let colour = |c: char| Colour::from_char(c).ok_or_else(invalid);
        let value = chars[3]
            .to_digit(10)
            .filter(|v| (1..=6).contains(v))
            .ok_or_else(invalid)?;
        Ok(Tile::new(
            colour(chars[0])?,
            colour(chars[1])?,
            colour(chars[2])?,
            value as u8,
        ))
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.upright().colours == other.upright().colours && self.value == other.value
    }
}

impl Eq for Tile {}

impl Hash for Tile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.upright().colours.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Tile {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tile::from_code(s)
    }
}

use Colour::{Blue as B, Green as G, Purple as P, Red as R, White as W, Yellow as Y};

/// 百搭牌
pub const JOKER: Tile = Tile::new(W, W, W, 1);

/// 标准牌组：35 张普通牌 + 1 张百搭牌
pub const TILE_SET: [Tile; 36] = [
    Tile::new(R, R, R, 6),
    Tile::new(B, B, B, 6),
    Tile::new(G, G, G, 6),
    Tile::new(Y, Y, Y, 6),
    Tile::new(P, P, P, 6),
    Tile::new(R, R, Y, 5),
    Tile::new(R, R, P, 5),
    Tile::new(B, B, R, 5),
    Tile::new(B, B, P, 5),
    Tile::new(G, G, R, 5),
    Tile::new(G, G, B, 5),
    Tile::new(Y, Y, G, 5),
    Tile::new(Y, Y, B, 5),
    Tile::new(P, P, Y, 5),
    Tile::new(P, P, G, 5),
    Tile::new(R, R, B, 4),
    Tile::new(R, R, G, 4),
    Tile::new(B, B, G, 4),
    Tile::new(B, B, Y, 4),
    Tile::new(G, G, Y, 4),
    Tile::new(G, G, P, 4),
    Tile::new(Y, Y, R, 4),
    Tile::new(Y, Y, P, 4),
    Tile::new(P, P, R, 4),
    Tile::new(P, P, B, 4),
    Tile::new(Y, B, P, 3),
    Tile::new(R, G, Y, 3),
    Tile::new(B, G, P, 3),
    Tile::new(G, R, B, 3),
    Tile::new(B, R, P, 2),
    Tile::new(Y, P, R, 2),
    Tile::new(Y, P, G, 2),
    Tile::new(G, R, P, 1),
    Tile::new(B, Y, G, 1),
    Tile::new(R, Y, B, 1),
    JOKER,
];

#[cfg(test)]
mod tests {
    use super::*;
    use super::Colour::{Blue as B, Green as G, Purple as P, Red as R, Yellow as Y};

    #[test]
    fn test_tile_set() {
        assert_eq!(TILE_SET.len(), 36);
        let total: u32 = TILE_SET.iter().map(|t| t.value() as u32).sum();
        assert_eq!(total, 142);
        assert_eq!(TILE_SET.iter().filter(|t| t.is_joker()).count(), 1);
        assert!(TILE_SET.iter().all(|t| t.is_valid()));
    }

    #[test]
    fn test_code_round_trip() {
        for tile in TILE_SET {
            let decoded: Tile = tile.code().parse().unwrap();
            assert_eq!(decoded, tile);
        }

        // 翻转后编码不变
        let mut flipped = Tile::new(R, G, Y, 3);
        flipped.flip();
        assert_eq!(flipped.code(), "RGY3");
        let decoded = Tile::from_code(&flipped.code()).unwrap();
        assert_eq!(decoded, flipped);
    }

    #[test]
    fn test_invalid_codes() {
        assert!(Tile::from_code("RRR").is_err());
        assert!(Tile::from_code("RRR66").is_err());
        assert!(Tile::from_code("XRR6").is_err());
        assert!(Tile::from_code("RRR0").is_err());
        assert!(Tile::from_code("RRR7").is_err());

        // 可解析但不属于牌组
        let tile = Tile::from_code("RGB6").unwrap();
        assert!(!tile.is_valid());
    }

    #[test]
    fn test_flip() {
        let mut tile = Tile::new(Y, B, P, 3);
        tile.flip();
        assert!(tile.is_flipped());
        assert_eq!(tile.colours(), [P, B, Y]);

        tile.flip();
        assert!(!tile.is_flipped());
        assert_eq!(tile.colours(), [Y, B, P]);
    }

    #[test]
    fn test_equality_ignores_flip_state() {
        let mut a = Tile::new(B, R, P, 2);
        let b = Tile::new(B, R, P, 2);
        a.flip();
        assert_eq!(a.colours(), [P, R, B]);
        assert_eq!(a, b);
        assert!(a.is_valid());
        assert_ne!(Tile::new(P, R, B, 2), b);
    }

    #[test]
    fn test_joker() {
        assert!(JOKER.is_joker());
        assert_eq!(JOKER.code(), "WWW1");
        assert!(!Tile::new(R, R, R, 6).is_joker());
    }
}
