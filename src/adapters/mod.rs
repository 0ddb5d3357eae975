pub mod email;
pub mod feishu;
pub mod kite_rest;
pub mod telegram;

pub use email::EmailNotifier;
pub use feishu::FeishuNotifier;
pub use kite_rest::{KiteClient, UserProfile};
pub use telegram::TelegramNotifier;
