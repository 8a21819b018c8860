//! 命令定义和实现

pub mod config;
pub mod demo;
pub mod run;
pub mod validate;

pub use config::ConfigCommand;
pub use demo::DemoCommand;
pub use run::RunCommand;
pub use validate::ValidateCommand;
