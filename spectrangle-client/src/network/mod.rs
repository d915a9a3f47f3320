//! 网络通信模块
//!
//! 使用 protocol 库的传输层抽象

mod connection;

pub use connection::*;
