//! 落子规则：朝向解析、颜色匹配与合法位置搜索

use std::collections::BTreeSet;

use crate::board::{Board, Edge};
use crate::constants::{MAX_FIELDS, ROTATIONS};
use crate::error::RuleError;
use crate::tile::{Colour, Tile};

/// 规则引擎
pub struct Rules;

impl Rules {
    /// 按格子朝向调整牌：尖朝下的格子要求牌处于翻转状态，尖朝上则相反
    pub fn orient(tile: &mut Tile, up: bool) {
        if up == tile.is_flipped() {
            tile.flip();
        }
    }

    /// 旋转后牌的三边分别落在格子的 (左, 竖, 右) 上
    ///
    /// 传入的牌应已经过 [`Rules::orient`]。
    pub fn resolve(tile: &Tile, rotation: u8) -> [Colour; 3] {
        let [a, b, c] = tile.colours();
        match (rotation % ROTATIONS, tile.is_flipped()) {
            (0, _) => [a, b, c],
            (1, true) | (2, false) => [c, a, b],
            _ => [b, c, a],
        }
    }

    /// 旋转值是否有效
    pub fn is_valid_rotation(rotation: i64) -> bool {
        (0..ROTATIONS as i64).contains(&rotation)
    }

    /// 检查某个旋转下，牌与所有已占用相邻边的颜色是否匹配
    ///
    /// `edges` 为目标格子已占用的相邻边。相邻边为白色时视为匹配；百搭牌总是匹配。
    pub fn check_rotation(
        tile: &Tile,
        index: usize,
        edges: &[Edge],
        board: &Board,
        rotation: u8,
    ) -> bool {
        if tile.is_joker() {
            return true;
        }
        if rotation >= ROTATIONS {
            return false;
        }

        let mut oriented = *tile;
        Self::orient(&mut oriented, Board::is_up(index));
        let colours = Self::resolve(&oriented, rotation);

        edges.iter().all(|&edge| {
            Board::neighbour(index, edge)
                .and_then(|n| board.field(n).colour(edge.facing()))
                .is_some_and(|facing| facing.is_wildcard() || facing == colours[edge.slot()])
        })
    }

    /// 在目标格子以指定旋转放置牌是否合法（不检查格子是否为空）
    ///
    /// 没有相邻占用格子时，只有空棋盘上的奖励倍数为 1 的格子可以落子。
    pub fn is_legal(board: &Board, tile: &Tile, index: usize, rotation: u8) -> bool {
        let edges = board.edges(index);
        if edges.is_empty() {
            board.is_board_empty() && Board::bonus(index) == 1
        } else {
            Self::check_rotation(tile, index, &edges, board, rotation)
        }
    }

    /// 目标格子上所有合法的旋转
    pub fn legal_rotations(tile: &Tile, index: usize, board: &Board) -> BTreeSet<u8> {
        if index >= MAX_FIELDS || !board.is_empty(index) {
            return BTreeSet::new();
        }
        (0..ROTATIONS)
            .filter(|&rotation| Self::is_legal(board, tile, index, rotation))
            .collect()
    }

    /// 单张牌可以落下的所有格子（任一旋转合法即可）
    pub fn fields_for(tile: &Tile, board: &Board) -> BTreeSet<usize> {
        let board_empty = board.is_board_empty();
        (0..MAX_FIELDS)
            .filter(|&index| board.is_empty(index))
            .filter(|&index| {
                let edges = board.edges(index);
                if edges.is_empty() {
                    board_empty && Board::bonus(index) == 1
                } else if tile.is_joker() {
                    true
                } else {
                    (0..ROTATIONS).any(|r| Self::check_rotation(tile, index, &edges, board, r))
                }
            })
            .collect()
    }

    /// 手牌中每张牌可以落下的格子
    pub fn plays(hand: &[Tile], board: &Board) -> Vec<(Tile, BTreeSet<usize>)> {
        hand.iter()
            .map(|tile| (*tile, Self::fields_for(tile, board)))
            .collect()
    }

    /// 手牌中是否至少有一张牌可以落下
    pub fn has_play(hand: &[Tile], board: &Board) -> bool {
        if board.is_full() {
            return false;
        }
        hand.iter().any(|tile| !Self::fields_for(tile, board).is_empty())
    }

    /// 完整校验一步落子，返回规范化后的 (索引, 旋转)
    pub fn check_move(
        board: &Board,
        tile: &Tile,
        index: i64,
        rotation: i64,
    ) -> Result<(usize, u8), RuleError> {
        if !Board::is_valid_index(index) {
            return Err(RuleError::InvalidField { index });
        }
        let index = index as usize;
        if !board.is_empty(index) {
            return Err(RuleError::FieldOccupied { index });
        }
        if !tile.is_valid() {
            return Err(RuleError::InvalidTile { code: tile.code() });
        }
        if !Self::is_valid_rotation(rotation) {
            return Err(RuleError::InvalidRotation { rotation });
        }
        let rotation = rotation as u8;
        if !Self::is_legal(board, tile, index, rotation) {
            return Err(RuleError::NoMatch {
                code: tile.code(),
                index,
                rotation,
            });
        }
        Ok((index, rotation))
    }
}
