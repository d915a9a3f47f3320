//! 玩家手牌

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::rules::Rules;
use crate::tile::Tile;

/// 手牌（无序多重集）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    tiles: Vec<Tile>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从牌列表创建
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    /// 加入一张牌
    pub fn add(&mut self, tile: Tile) {
        self.tiles.push(tile);
    }

    /// 移除第一张与之相等的牌，返回被移除的牌
    pub fn remove(&mut self, tile: &Tile) -> Option<Tile> {
        let pos = self.tiles.iter().position(|t| t == tile)?;
        Some(self.tiles.remove(pos))
    }

    pub fn contains(&self, tile: &Tile) -> bool {
        self.tiles.contains(tile)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// 手牌分值之和
    pub fn total_value(&self) -> u32 {
        self.tiles.iter().map(|t| t.value() as u32).sum()
    }

    /// 手牌编码列表
    pub fn codes(&self) -> Vec<String> {
        self.tiles.iter().map(Tile::code).collect()
    }

    /// 是否至少有一张牌可以落下
    pub fn has_play(&self, board: &Board) -> bool {
        Rules::has_play(&self.tiles, board)
    }

    /// 每张牌可以落下的格子
    pub fn plays(&self, board: &Board) -> Vec<(Tile, BTreeSet<usize>)> {
        Rules::plays(&self.tiles, board)
    }

    /// 清空手牌，返回原有的牌
    pub fn clear(&mut self) -> Vec<Tile> {
        std::mem::take(&mut self.tiles)
    }
}

impl From<Vec<Tile>> for Hand {
    fn from(tiles: Vec<Tile>) -> Self {
        Self::from_tiles(tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Colour::*, JOKER};

    #[test]
    fn test_multiset() {
        let rrr = Tile::new(Red, Red, Red, 6);
        let mut hand = Hand::new();
        assert!(hand.is_empty());

        hand.add(rrr);
        hand.add(JOKER);
        hand.add(rrr);
        assert_eq!(hand.len(), 3);
        assert_eq!(hand.total_value(), 13);
        assert_eq!(hand.codes(), vec!["RRR6", "WWW1", "RRR6"]);

        // 只移除一张
        assert_eq!(hand.remove(&rrr), Some(rrr));
        assert!(hand.contains(&rrr));
        assert_eq!(hand.len(), 2);

        let bbb = Tile::new(Blue, Blue, Blue, 6);
        assert_eq!(hand.remove(&bbb), None);
        assert_eq!(hand.len(), 2);
    }

    #[test]
    fn test_remove_flipped_copy() {
        let mut tile = Tile::new(Yellow, Blue, Purple, 3);
        let mut hand = Hand::from(vec![tile]);
        tile.flip();
        assert!(hand.remove(&tile).is_some());
        assert!(hand.is_empty());
    }

    #[test]
    fn test_plays_delegate_to_rules() {
        let board = Board::new();
        let hand = Hand::from(vec![JOKER, Tile::new(Green, Green, Green, 6)]);
        assert!(hand.has_play(&board));
        let plays = hand.plays(&board);
        assert_eq!(plays.len(), 2);
        assert!(plays.iter().all(|(_, fields)| fields.len() == 4));
    }

    #[test]
    fn test_clear() {
        let mut hand = Hand::from(vec![JOKER]);
        assert_eq!(hand.clear(), vec![JOKER]);
        assert!(hand.is_empty());
        assert!(!hand.has_play(&Board::new()));
    }
}
