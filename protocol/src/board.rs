//! 棋盘状态
//!
//! 36 个三角形格子，按 (row, col) 排成三角形，`0 <= row <= 5`，`-row <= col <= row`。
//! 线性索引为 `row² + row + col`。

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_ROWS, BONUS, MAX_FIELDS};
use crate::rules::Rules;
use crate::tile::{Colour, Tile};

/// 格子的三条边
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Left,
    Vertical,
    Right,
}

impl Edge {
    pub const ALL: [Edge; 3] = [Edge::Left, Edge::Vertical, Edge::Right];

    /// 相邻格子上与本边贴合的那条边
    pub fn facing(self) -> Edge {
        match self {
            Edge::Left => Edge::Right,
            Edge::Vertical => Edge::Vertical,
            Edge::Right => Edge::Left,
        }
    }

    /// 在 (左, 竖, 右) 数组中的下标
    pub fn slot(self) -> usize {
        match self {
            Edge::Left => 0,
            Edge::Vertical => 1,
            Edge::Right => 2,
        }
    }

    /// 单字符标记
    pub fn to_char(self) -> char {
        match self {
            Edge::Left => 'L',
            Edge::Vertical => 'V',
            Edge::Right => 'R',
        }
    }
}

/// 索引 -> (row, col)
const fn build_coords() -> [(i32, i32); MAX_FIELDS] {
    let mut table = [(0, 0); MAX_FIELDS];
    let mut row = 0;
    while row < BOARD_ROWS {
        let mut col = -row;
        while col <= row {
            table[(row * row + row + col) as usize] = (row, col);
            col += 1;
        }
        row += 1;
    }
    table
}

/// 每个索引对应的 (row, col)
pub const COORDS: [(i32, i32); MAX_FIELDS] = build_coords();

/// 棋盘上的一个格子
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// 分值，0 表示空
    value: u8,
    /// 落子后解析出的 (左, 竖, 右) 颜色
    colours: Option<[Colour; 3]>,
}

impl Field {
    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value == 0
    }

    /// 指定边的颜色
    pub fn colour(&self, edge: Edge) -> Option<Colour> {
        self.colours.map(|c| c[edge.slot()])
    }

    pub fn colours(&self) -> Option<[Colour; 3]> {
        self.colours
    }

    fn occupy(&mut self, value: u8, colours: [Colour; 3]) {
        self.value = value;
        self.colours = Some(colours);
    }

    fn clear(&mut self) {
        *self = Field::default();
    }
}

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// 36 个格子，按线性索引排列
    fields: Vec<Field>,
    /// 是否尚未落过第一手
    first_play: bool,
}

impl Board {
    /// 创建空棋盘
    pub fn new() -> Self {
        Self {
            fields: vec![Field::default(); MAX_FIELDS],
            first_play: true,
        }
    }

    /// (row, col) -> 线性索引
    pub fn index(row: i32, col: i32) -> Option<usize> {
        if (0..BOARD_ROWS).contains(&row) && (-row..=row).contains(&col) {
            Some((row * row + row + col) as usize)
        } else {
            None
        }
    }

    /// 线性索引 -> (row, col)
    pub fn coords(index: usize) -> Option<(i32, i32)> {
        COORDS.get(index).copied()
    }

    /// 索引是否指向一个格子
    pub fn is_valid_index(index: i64) -> bool {
        (0..MAX_FIELDS as i64).contains(&index)
    }

    /// 格子是否尖朝上（row + col 为偶数）
    pub fn is_up(index: usize) -> bool {
        let (row, col) = COORDS[index];
        (row + col).rem_euclid(2) == 0
    }

    /// 格子的奖励倍数
    pub fn bonus(index: usize) -> u32 {
        BONUS[index]
    }

    /// 空棋盘上允许落第一手的格子
    pub fn opening_fields() -> impl Iterator<Item = usize> {
        (0..MAX_FIELDS).filter(|&i| BONUS[i] == 1)
    }

    /// 指定方向上的几何相邻格子
    pub fn neighbour(index: usize, edge: Edge) -> Option<usize> {
        let (row, col) = Self::coords(index)?;
        match edge {
            Edge::Left => Self::index(row, col - 1),
            Edge::Right => Self::index(row, col + 1),
            Edge::Vertical => {
                if Self::is_up(index) {
                    Self::index(row + 1, col)
                } else {
                    Self::index(row - 1, col)
                }
            }
        }
    }

    /// 所有几何相邻格子
    pub fn neighbours(index: usize) -> Vec<(Edge, usize)> {
        Edge::ALL
            .iter()
            .filter_map(|&edge| Self::neighbour(index, edge).map(|n| (edge, n)))
            .collect()
    }

    /// 相邻且已被占用的边
    pub fn edges(&self, index: usize) -> Vec<Edge> {
        Edge::ALL
            .iter()
            .copied()
            .filter(|&edge| {
                Self::neighbour(index, edge).is_some_and(|n| !self.fields[n].is_empty())
            })
            .collect()
    }

    /// 获取格子
    pub fn field(&self, index: usize) -> &Field {
        &self.fields[index]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// 格子是否为空
    pub fn is_empty(&self, index: usize) -> bool {
        self.fields[index].is_empty()
    }

    /// 整个棋盘是否为空
    pub fn is_board_empty(&self) -> bool {
        self.fields.iter().all(Field::is_empty)
    }

    /// 棋盘是否已满
    pub fn is_full(&self) -> bool {
        self.fields.iter().all(|f| !f.is_empty())
    }

    pub fn is_first_play(&self) -> bool {
        self.first_play
    }

    /// 已占用格子数
    pub fn occupied_count(&self) -> usize {
        self.fields.iter().filter(|f| !f.is_empty()).count()
    }

    /// 格子得分：分值 × max(1, 相邻占用数) × 奖励倍数
    pub fn score(&self, index: usize) -> u32 {
        let neighbours = self.edges(index).len().max(1) as u32;
        self.fields[index].value() as u32 * neighbours * Self::bonus(index)
    }

    /// 放置一张牌（不检查规则）
    ///
    /// 牌会先按格子朝向翻转，再按旋转解析出格子的三边颜色。
    pub fn set_tile(&mut self, index: usize, tile: &mut Tile, rotation: u8) {
        self.first_play = false;
        Rules::orient(tile, Self::is_up(index));
        let colours = Rules::resolve(tile, rotation);
        self.fields[index].occupy(tile.value(), colours);
    }

    /// 清空一个格子
    pub fn remove(&mut self, index: usize) {
        self.fields[index].clear();
    }

    /// 重置为空棋盘
    pub fn reset(&mut self) {
        for field in &mut self.fields {
            field.clear();
        }
        self.first_play = true;
    }

    /// 导出为 JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Colour::*, JOKER};

    #[test]
    fn test_index_bijection() {
        let mut seen = [false; MAX_FIELDS];
        for row in 0..BOARD_ROWS {
            for col in -row..=row {
                let index = Board::index(row, col).unwrap();
                assert!(!seen[index]);
                seen[index] = true;
                assert_eq!(Board::coords(index), Some((row, col)));
            }
        }
        assert!(seen.iter().all(|&s| s));

        assert_eq!(Board::index(6, 0), None);
        assert_eq!(Board::index(2, 3), None);
        assert_eq!(Board::index(-1, 0), None);
    }

    #[test]
    fn test_neighbours_symmetric() {
        for index in 0..MAX_FIELDS {
            let neighbours = Board::neighbours(index);
            assert!(neighbours.len() <= 3);
            for (edge, n) in neighbours {
                // 对方的相对边指回自己
                assert_eq!(Board::neighbour(n, edge.facing()), Some(index));
            }
        }
    }

    #[test]
    fn test_geometry() {
        // 顶点尖朝上，只有下方一个邻居
        assert!(Board::is_up(0));
        assert_eq!(Board::neighbours(0), vec![(Edge::Vertical, 2)]);

        // (1, 0) 尖朝下
        assert!(!Board::is_up(2));
        assert_eq!(Board::neighbour(2, Edge::Vertical), Some(0));
        assert_eq!(Board::neighbour(2, Edge::Left), Some(1));
        assert_eq!(Board::neighbour(2, Edge::Right), Some(3));

        // 底行尖朝上的格子没有竖向邻居
        assert!(Board::is_up(25));
        assert_eq!(Board::neighbour(25, Edge::Vertical), None);
    }

    #[test]
    fn test_bonus_table() {
        let openings: Vec<usize> = Board::opening_fields().collect();
        assert_eq!(openings, vec![6, 11, 13, 20]);

        // 左右镜像对称
        for index in 0..MAX_FIELDS {
            let (row, col) = COORDS[index];
            let mirror = Board::index(row, -col).unwrap();
            assert_eq!(Board::bonus(index), Board::bonus(mirror));
        }
    }

    #[test]
    fn test_set_tile_and_score() {
        let mut board = Board::new();
        assert!(board.is_first_play());
        assert!(board.is_board_empty());

        let mut tile = crate::tile::Tile::new(Red, Green, Yellow, 3);
        board.set_tile(6, &mut tile, 0);
        assert!(!board.is_first_play());
        assert!(!board.is_empty(6));
        assert_eq!(board.field(6).colours(), Some([Red, Green, Yellow]));
        // 无邻居：3 × 1 × 1
        assert_eq!(board.score(6), 3);

        // 格子 5 尖朝下，牌被翻转后再放置
        let mut joker = JOKER;
        board.set_tile(5, &mut joker, 0);
        assert!(joker.is_flipped());
        assert_eq!(board.edges(5), vec![Edge::Right]);
        assert_eq!(board.edges(6), vec![Edge::Left]);
        // 1 × 1 × 2
        assert_eq!(board.score(5), 2);
        assert_eq!(board.score(6), 3);
        assert_eq!(board.occupied_count(), 2);
    }

    #[test]
    fn test_remove_and_reset() {
        let mut board = Board::new();
        let mut tile = JOKER;
        board.set_tile(11, &mut tile, 1);
        board.remove(11);
        assert!(board.is_empty(11));
        assert!(board.field(11).colours().is_none());

        board.set_tile(11, &mut tile, 1);
        board.reset();
        assert!(board.is_board_empty());
        assert!(board.is_first_play());
    }

    #[test]
    fn test_full_board() {
        let mut board = Board::new();
        for index in 0..MAX_FIELDS {
            assert!(!board.is_full());
            let mut tile = JOKER;
            board.set_tile(index, &mut tile, 0);
        }
        assert!(board.is_full());
    }

    #[test]
    fn test_json_export() {
        let board = Board::new();
        let json = board.to_json().unwrap();
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }
}
