//! Presentation shell: one server-side context per browser, HTML pages, and the
//! form handlers that drive the assessment and identity flows.

pub mod browser;
pub mod handlers;
pub mod pages;
pub mod sessions;

pub use browser::{attach_browser, BrowserSessions};
pub use sessions::{MemorySessionStore, RedisSessionStore, SessionStore};
