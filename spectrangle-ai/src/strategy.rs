//! 策略接口

use std::fmt;

use protocol::{Board, ClientMessage, Hand, Tile};

/// 一个回合的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// 落子
    Place { tile: Tile, rotation: u8, index: usize },
    /// 换牌
    Exchange { tile: Tile },
    /// 跳过
    Skip,
}

impl Decision {
    /// 转换为发送给服务端的命令
    pub fn to_message(&self) -> ClientMessage {
        match *self {
            Decision::Place {
                tile,
                rotation,
                index,
            } => ClientMessage::Move {
                tile,
                rotation: i64::from(rotation),
                index: index as i64,
            },
            Decision::Exchange { tile } => ClientMessage::TileReplace { tile },
            Decision::Skip => ClientMessage::Skip,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Place {
                tile,
                rotation,
                index,
            } => write!(f, "move {} {} {}", tile, rotation, index),
            Decision::Exchange { tile } => write!(f, "replace {}", tile),
            Decision::Skip => f.write_str("skip"),
        }
    }
}

/// 策略看到的局面（棋盘为副本）
#[derive(Debug, Clone)]
pub struct TurnView {
    pub board: Board,
    pub hand: Hand,
    /// 牌堆剩余张数
    pub supply_remaining: usize,
}

impl TurnView {
    pub fn new(board: Board, hand: Hand, supply_remaining: usize) -> Self {
        Self {
            board,
            hand,
            supply_remaining,
        }
    }
}

/// 电脑玩家的走法策略
pub trait Strategy: Send {
    /// 策略名称
    fn name(&self) -> &str;

    /// 策略说明
    fn description(&self) -> &str;

    /// 给出本回合的决定
    fn determine_move(&mut self, view: &TurnView) -> Decision;
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::WireMessage;

    #[test]
    fn test_decision_to_message() {
        let tile = Tile::from_code("RRR6").unwrap();
        let place = Decision::Place {
            tile,
            rotation: 2,
            index: 11,
        };
        assert_eq!(place.to_message().encode(), "MOVE,RRR6,2,11");
        assert_eq!(place.to_string(), "move RRR6 2 11");
        assert_eq!(
            Decision::Exchange { tile }.to_message(),
            ClientMessage::TileReplace { tile }
        );
        assert_eq!(Decision::Skip.to_message(), ClientMessage::Skip);
    }
}
