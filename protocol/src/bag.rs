//! 牌堆（公共摸牌池）

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

use crate::tile::{Tile, TILE_SET};

/// 牌堆
///
/// 初始为完整的 36 张标准牌组，发牌和摸牌使其减少，换牌时数量不变。
pub struct Bag {
    tiles: Vec<Tile>,
    rng: Box<dyn RngCore + Send>,
}

impl Bag {
    /// 完整牌组，使用系统熵初始化随机数
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// 使用指定随机数生成器（测试中传入固定种子）
    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            tiles: TILE_SET.to_vec(),
            rng: Box::new(rng),
        }
    }

    /// 空牌堆
    pub fn empty() -> Self {
        let mut bag = Self::new();
        bag.tiles.clear();
        bag
    }

    pub fn shuffle(&mut self) {
        self.tiles.shuffle(&mut self.rng);
    }

    /// 洗牌后发出 `min(n, len)` 张牌
    pub fn deal(&mut self, n: usize) -> Vec<Tile> {
        self.shuffle();
        let n = n.min(self.tiles.len());
        self.tiles.split_off(self.tiles.len() - n)
    }

    /// 随机摸一张牌
    pub fn draw(&mut self) -> Option<Tile> {
        if self.tiles.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.tiles.len());
        Some(self.tiles.swap_remove(index))
    }

    /// 换牌：先摸一张替换牌，再放回给出的牌
    ///
    /// 牌堆为空时不做任何事，返回 `None`。
    pub fn exchange(&mut self, tile: Tile) -> Option<Tile> {
        let replacement = self.draw()?;
        self.tiles.push(tile);
        Some(replacement)
    }

    /// 放回一张牌
    pub fn add(&mut self, tile: Tile) {
        self.tiles.push(tile);
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
}

impl Default for Bag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bag").field("tiles", &self.tiles).finish()
    }
}
