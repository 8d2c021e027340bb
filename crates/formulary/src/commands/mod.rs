//! Command handlers, one module per subcommand.

pub mod catalog;
pub mod chat;
pub mod completion;
pub mod config_cmd;
pub mod draft;
pub mod generate;
pub mod render;
pub mod research;
pub mod stage;
