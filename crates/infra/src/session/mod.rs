//! Browser-mediated authorization sessions
//!
//! [`LoopbackAuthSession`] implements `AuthSessionLauncher` for desktop
//! hosts: it opens the authorization URL through a [`BrowserOpener`] and
//! captures the redirect on a loopback listener.

pub mod browser;
pub mod loopback;

pub use browser::{BrowserError, BrowserOpener, SystemBrowser};
pub use loopback::{LoopbackAuthSession, DEFAULT_LOOPBACK_REDIRECT_URI};
