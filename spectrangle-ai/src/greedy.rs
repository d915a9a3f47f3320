//! 贪心策略
//!
//! 在棋盘副本上尝试手牌中每张牌的每个合法位置和旋转，选得分最高的一步；
//! 没有可落的牌时换掉分值最小的牌，牌堆也空了就跳过。

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use protocol::{Rules, Tile};

use crate::strategy::{Decision, Strategy, TurnView};

/// 贪心策略配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreedyConfig {
    /// 同分时用于随机选择的种子；为空时取第一个
    pub seed: Option<u64>,
}

/// 贪心策略
#[derive(Debug)]
pub struct GreedyStrategy {
    rng: Option<ChaCha8Rng>,
}

impl GreedyStrategy {
    pub fn new(config: GreedyConfig) -> Self {
        Self {
            rng: config.seed.map(ChaCha8Rng::seed_from_u64),
        }
    }

    /// 使用固定种子
    pub fn seeded(seed: u64) -> Self {
        Self::new(GreedyConfig { seed: Some(seed) })
    }

    /// 所有得分最高的落子及其得分
    pub fn best_placements(view: &TurnView) -> (u32, Vec<Decision>) {
        let mut best_score = 0;
        let mut best = Vec::new();

        for (tile, fields) in view.hand.plays(&view.board) {
            for index in fields {
                for rotation in Rules::legal_rotations(&tile, index, &view.board) {
                    let mut board = view.board.clone();
                    let mut placed = tile;
                    board.set_tile(index, &mut placed, rotation);
                    let score = board.score(index);

                    if score > best_score {
                        best_score = score;
                        best.clear();
                    }
                    if score == best_score {
                        best.push(Decision::Place {
                            tile,
                            rotation,
                            index,
                        });
                    }
                }
            }
        }
        (best_score, best)
    }

    /// 分值最小的牌
    fn cheapest(view: &TurnView) -> Option<Tile> {
        view.hand
            .tiles()
            .iter()
            .copied()
            .reduce(|min, tile| if tile.value() < min.value() { tile } else { min })
    }
}

impl Default for GreedyStrategy {
    fn default() -> Self {
        Self::new(GreedyConfig::default())
    }
}

impl Strategy for GreedyStrategy {
    fn name(&self) -> &str {
        "greedy"
    }

    fn description(&self) -> &str {
        "选择当前回合得分最高的落子"
    }

    fn determine_move(&mut self, view: &TurnView) -> Decision {
        let (score, mut best) = Self::best_placements(view);
        if !best.is_empty() {
            let pick = match self.rng.as_mut() {
                Some(rng) => rng.gen_range(0..best.len()),
                None => 0,
            };
            debug!(score, candidates = best.len(), "贪心策略选择落子");
            return best.swap_remove(pick);
        }

        if view.supply_remaining > 0 {
            if let Some(tile) = Self::cheapest(view) {
                debug!(tile = %tile, "无可落的牌，换牌");
                return Decision::Exchange { tile };
            }
        }
        Decision::Skip
    }
}
