//! Spectrangle AI
//!
//! 包含:
//! - 策略接口
//! - 贪心策略（当前回合得分最高的落子）

mod greedy;
mod strategy;

pub use greedy::{GreedyConfig, GreedyStrategy};
pub use strategy::{Decision, Strategy, TurnView};
