//! Durable store for Storybox

mod connection;
mod migrations;
mod record;
mod schema;
mod settings_repository;
mod store;

pub use connection::Database;
pub use migrations::CURRENT_VERSION;
pub use record::{Key, Record};
pub use schema::{Collection, Index};
pub use settings_repository::{set_in as set_setting_in, SettingsRepository, StoreSettingsRepository};
pub use store::{Store, Transaction, TransactionMode};
