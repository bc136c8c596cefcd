//! Subcommand implementations.
//! 子命令实现。

pub mod init;
pub mod plan;
pub mod run;
