//! Browser harness for DOM snapshots
//!
//! Connects to a running Chrome over the DevTools Protocol, attaches to
//! tabs, and exposes the snapshot entry points:
//!
//! - `Page::get_everything` - every element with its path, geometry, style,
//!   attributes, text and markup
//! - `Page::resolve` - path expression → backend node ids, live
//! - `Page::capture_image` - image → data URL via the page
//!
//! The tree walk itself lives in `domwalk`; this crate only gathers the
//! data and talks to the browser.

pub mod cdp;
pub mod error;
pub mod events;
pub mod page;
pub mod scripts;
pub mod session;

pub use cdp::{CDPClient, CDPSession};
pub use error::{BrowserError, Result};
pub use events::{BrowserEvent, EventBus};
pub use page::{Page, PageTimeouts};
pub use session::{BrowserSession, SessionConfig};
