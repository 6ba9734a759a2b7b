//! Telegram module - alert delivery through the Bot API

pub mod format;
pub mod notifier;

pub use format::escape_markdown_v2;
pub use notifier::TelegramNotifier;
