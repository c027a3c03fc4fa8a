//! Shared constants used across the application.

/// User agent string sent with channel page requests.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; TelegramScraperBot/1.0)";

/// Prefix of the public channel preview pages. The channel handle is appended as-is.
pub const DEFAULT_BASE_URL: &str = "https://t.me/s/";

/// Size of the message window a single preview page yields.
pub const MAX_MESSAGES: usize = 20;
