pub mod app;
pub mod cli;
pub mod config;
pub mod storage;
pub mod store;
pub mod ui;
pub mod view;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use store::{Item, ItemId, ListError, ListStore, Status};
pub use view::{FilterState, ListRender, Row};
