//! 游戏逻辑模块
//!
//! 本地对局镜像、控制台命令和走法来源

mod brain;
mod input;
mod state;

pub use brain::*;
pub use input::*;
pub use state::*;
