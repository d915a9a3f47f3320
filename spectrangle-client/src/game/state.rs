//! 本地对局镜像
//!
//! 根据服务端广播维护棋盘、自己和对手的手牌以及各自得分。

use protocol::{Board, DealtHand, Hand, Tile, TurnMade, MAX_FIELDS};
use spectrangle_ai::TurnView;

/// 一名玩家的公开状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub name: String,
    pub hand: Hand,
    pub score: u32,
}

/// 客户端对局状态
#[derive(Debug, Clone, Default)]
pub struct ClientGame {
    name: String,
    board: Board,
    /// 按加入顺序排列，包括自己
    players: Vec<PlayerState>,
    started: bool,
    final_scores: Option<Vec<(String, u32)>>,
}

impl ClientGame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 自己的昵称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 开局
    pub fn start(&mut self, dealt: &[DealtHand]) {
        self.board = Board::new();
        self.players = dealt
            .iter()
            .map(|d| PlayerState {
                name: d.name.clone(),
                hand: Hand::from_tiles(d.tiles.clone()),
                score: 0,
            })
            .collect();
        self.started = true;
        self.final_scores = None;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// 自己的手牌
    pub fn hand(&self) -> Hand {
        self.player(&self.name)
            .map(|p| p.hand.clone())
            .unwrap_or_default()
    }

    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn player(&self, name: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.name == name)
    }

    fn player_mut(&mut self, name: &str) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    /// 对手（不含自己）
    pub fn opponents(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().filter(move |p| p.name != self.name)
    }

    pub fn member_count(&self) -> usize {
        self.players.len()
    }

    /// 牌堆剩余张数的估计：总数减去棋盘和所有手牌
    pub fn supply_remaining(&self) -> usize {
        let held: usize = self.players.iter().map(|p| p.hand.len()).sum();
        MAX_FIELDS.saturating_sub(self.board.occupied_count() + held)
    }

    /// 应用一次回合结果
    pub fn apply_turn(&mut self, turn: &TurnMade) {
        if let TurnMade::Placed {
            tile,
            rotation,
            index,
            ..
        } = turn
        {
            if *index < MAX_FIELDS && self.board.is_empty(*index) {
                let mut placed: Tile = *tile;
                self.board.set_tile(*index, &mut placed, *rotation);
                let score = self.board.score(*index);
                if let Some(player) = self.player_mut(turn.name()) {
                    player.score += score;
                }
            } else {
                tracing::warn!(index, "收到无法应用的落子");
            }
        }

        let hand = Hand::from_tiles(turn.hand().to_vec());
        if let Some(player) = self.player_mut(turn.name()) {
            player.hand = hand;
        }
    }

    /// 移除被踢出的玩家，返回是否是自己
    pub fn remove_player(&mut self, name: &str) -> bool {
        self.players.retain(|p| p.name != name);
        name == self.name
    }

    /// 记录最终得分
    pub fn finish(&mut self, scores: Vec<(String, u32)>) {
        self.final_scores = Some(scores);
    }

    pub fn final_scores(&self) -> Option<&[(String, u32)]> {
        self.final_scores.as_deref()
    }

    pub fn is_over(&self) -> bool {
        self.final_scores.is_some()
    }

    /// 给策略使用的局面副本
    pub fn view(&self) -> TurnView {
        TurnView::new(self.board.clone(), self.hand(), self.supply_remaining())
    }
}
