pub mod banker;
pub mod config;
pub mod error;
pub mod fork;
pub mod observer;
pub mod philosopher;
pub mod signal;
pub mod table;
pub mod watchdog;

pub use config::{Config, Strategy};
pub use error::ConfigError;
pub use table::{Report, Status, Table};
