//! 走法来源：控制台玩家或电脑策略

use tokio::sync::mpsc;
use tracing::info;

use protocol::{RuleError, Rules, Tile};
use spectrangle_ai::{Decision, GreedyStrategy, Strategy};

use super::input::{parse_command, Command};
use super::state::ClientGame;

/// 一次走法请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// 发送给服务端的决定
    Play(Decision),
    /// 玩家要求退出
    Exit,
}

/// 玩家的走法来源，注册时确定
pub enum Brain {
    /// 控制台输入
    Human(mpsc::Receiver<String>),
    /// 电脑策略
    Computer(Box<dyn Strategy>),
}

impl Brain {
    pub fn computer(strategy: impl Strategy + 'static) -> Self {
        Brain::Computer(Box::new(strategy))
    }

    pub fn is_computer(&self) -> bool {
        matches!(self, Brain::Computer(_))
    }

    /// 决定本回合的走法
    pub async fn decide(&mut self, game: &ClientGame) -> Turn {
        match self {
            Brain::Computer(strategy) => {
                let decision = strategy.determine_move(&game.view());
                info!(strategy = strategy.name(), %decision, "电脑走子");
                Turn::Play(decision)
            }
            Brain::Human(lines) => prompt(lines, game).await,
        }
    }
}

impl std::fmt::Debug for Brain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Brain::Human(_) => f.write_str("Human"),
            Brain::Computer(strategy) => write!(f, "Computer({})", strategy.name()),
        }
    }
}

/// 贪心策略给出的建议（基于棋盘副本）
pub fn hint(game: &ClientGame) -> Decision {
    GreedyStrategy::default().determine_move(&game.view())
}

/// 本地预检一步落子，避免因非法走法被踢出
pub fn check_move(
    game: &ClientGame,
    tile: &Tile,
    rotation: i64,
    index: i64,
) -> Result<(usize, u8), RuleError> {
    if !game.hand().contains(tile) {
        return Err(RuleError::TileNotInHand { code: tile.code() });
    }
    Rules::check_move(game.board(), tile, index, rotation)
}

/// 从控制台读取命令直到得到一个有效走法；输入结束视为退出
async fn prompt(lines: &mut mpsc::Receiver<String>, game: &ClientGame) -> Turn {
    let hand = game.hand().codes().join(" ");
    println!("轮到你了，手牌: {}", hand);

    while let Some(line) = lines.recv().await {
        match parse_command(&line) {
            Ok(Command::Exit) => return Turn::Exit,
            Ok(Command::Skip) => return Turn::Play(Decision::Skip),
            Ok(Command::Hint) => println!("建议: {}", hint(game)),
            Ok(Command::Replace { tile }) => {
                if game.hand().contains(&tile) {
                    return Turn::Play(Decision::Exchange { tile });
                }
                println!("手中没有 {}", tile);
            }
            Ok(Command::Move {
                tile,
                rotation,
                index,
            }) => match check_move(game, &tile, rotation, index) {
                Ok((index, rotation)) => {
                    return Turn::Play(Decision::Place {
                        tile,
                        rotation,
                        index,
                    })
                }
                Err(e) => println!("非法走法: {}", e),
            },
            Err(e) => println!("{}", e),
        }
    }
    Turn::Exit
}
