//! 对局状态
//!
//! 棋盘、牌堆、按加入顺序排列的玩家以及当前玩家指针。
//! 不涉及任何 I/O，由会话控制器独占。

use protocol::{
    Bag, Board, DealtHand, Hand, RuleError, Rules, Tile, TurnMade, HAND_SIZE, MIN_PLAYERS,
};

use crate::player::PlayerId;

/// 对局中的一个座位
#[derive(Debug, Clone)]
pub struct Seat {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub hand: Hand,
}

impl Seat {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            score: 0,
            hand: Hand::new(),
        }
    }
}

/// 对局
#[derive(Debug)]
pub struct Game {
    board: Board,
    bag: Bag,
    seats: Vec<Seat>,
    current: usize,
    /// 当前玩家已被移除，指针已指向下一位
    current_removed: bool,
}

impl Game {
    pub fn new(seats: Vec<Seat>, bag: Bag) -> Self {
        Self {
            board: Board::new(),
            bag,
            seats,
            current: 0,
            current_removed: false,
        }
    }

    /// 开局：设置先手并给每位玩家发牌
    pub fn start(&mut self, first: usize) -> Vec<DealtHand> {
        self.current = if self.seats.is_empty() {
            0
        } else {
            first % self.seats.len()
        };
        for seat in &mut self.seats {
            seat.hand = Hand::from(self.bag.deal(HAND_SIZE));
        }
        self.seats
            .iter()
            .map(|seat| DealtHand {
                name: seat.name.clone(),
                tiles: seat.hand.tiles().to_vec(),
            })
            .collect()
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn current_player(&self) -> Option<&Seat> {
        self.seats.get(self.current)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// 牌堆剩余张数
    pub fn supply_len(&self) -> usize {
        self.bag.len()
    }

    fn current_mut(&mut self) -> Option<&mut Seat> {
        self.seats.get_mut(self.current)
    }

    /// 当前玩家落子
    ///
    /// 校验通过后放置、计分、从手牌移除并补一张牌。
    pub fn attempt_move(
        &mut self,
        tile: Tile,
        rotation: i64,
        index: i64,
    ) -> Result<TurnMade, RuleError> {
        let Some(seat) = self.seats.get(self.current) else {
            return Err(RuleError::TileNotInHand { code: tile.code() });
        };
        if !seat.hand.contains(&tile) {
            return Err(RuleError::TileNotInHand { code: tile.code() });
        }
        let (index, rotation) = Rules::check_move(&self.board, &tile, index, rotation)?;

        let mut placed = tile;
        self.board.set_tile(index, &mut placed, rotation);
        let score = self.board.score(index);
        let replacement = self.bag.draw();

        let Some(seat) = self.current_mut() else {
            return Err(RuleError::TileNotInHand { code: tile.code() });
        };
        seat.hand.remove(&tile);
        if let Some(replacement) = replacement {
            seat.hand.add(replacement);
        }
        seat.score += score;

        Ok(TurnMade::Placed {
            name: seat.name.clone(),
            hand: seat.hand.tiles().to_vec(),
            tile: tile.upright(),
            rotation,
            index,
        })
    }

    /// 当前玩家换牌；牌堆为空时手牌不变
    pub fn exchange(&mut self, tile: Tile) -> Result<TurnMade, RuleError> {
        let holds = self
            .current_player()
            .is_some_and(|seat| seat.hand.contains(&tile));
        if !holds {
            return Err(RuleError::TileNotInHand { code: tile.code() });
        }

        let replacement = self.bag.exchange(tile);
        let Some(seat) = self.current_mut() else {
            return Err(RuleError::TileNotInHand { code: tile.code() });
        };
        if let Some(replacement) = replacement {
            seat.hand.remove(&tile);
            seat.hand.add(replacement);
        }

        Ok(TurnMade::Replaced {
            name: seat.name.clone(),
            hand: seat.hand.tiles().to_vec(),
            tile: tile.upright(),
        })
    }

    /// 当前玩家跳过
    pub fn skip(&self) -> Option<TurnMade> {
        self.current_player().map(|seat| TurnMade::Skipped {
            name: seat.name.clone(),
            hand: seat.hand.tiles().to_vec(),
        })
    }

    /// 轮到下一位玩家（按加入顺序循环）
    pub fn advance(&mut self) {
        if self.seats.is_empty() {
            return;
        }
        if std::mem::take(&mut self.current_removed) {
            return;
        }
        self.current = (self.current + 1) % self.seats.len();
    }

    /// 移除玩家，手牌放回牌堆
    pub fn remove(&mut self, id: PlayerId) -> Option<Seat> {
        let pos = self.seats.iter().position(|s| s.id == id)?;
        let seat = self.seats.remove(pos);
        for tile in seat.hand.tiles() {
            self.bag.add(*tile);
        }

        if pos < self.current {
            self.current -= 1;
        } else if pos == self.current {
            self.current_removed = true;
        }
        if self.current >= self.seats.len() {
            self.current = 0;
        }
        Some(seat)
    }

    /// 对局是否结束
    ///
    /// 棋盘已满；或棋盘非空、牌堆为空且没有任何玩家能落子；或人数不足。
    pub fn is_over(&self) -> bool {
        if self.seats.len() < MIN_PLAYERS || self.board.is_full() {
            return true;
        }
        !self.board.is_board_empty()
            && self.bag.is_empty()
            && !self.seats.iter().any(|s| s.hand.has_play(&self.board))
    }

    /// 最终得分（按加入顺序）
    pub fn scores(&self) -> Vec<(String, u32)> {
        self.seats
            .iter()
            .map(|s| (s.name.clone(), s.score))
            .collect()
    }
}
