pub mod db;
pub mod memory;
pub mod webhook;

pub use db::DbAdapter;
pub use memory::MemoryDb;
pub use webhook::LoggingWebhookAdapter;
