//! System browser launcher

use std::process::{Command, Stdio};

use thiserror::Error;

/// Error type for browser launches
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(#[from] std::io::Error),

    #[error("Browser command exited with {0}")]
    Exit(std::process::ExitStatus),
}

/// Opens an authorization URL for the user
pub trait BrowserOpener: Send + Sync {
    /// Open `url`. Implementations that cannot honour
    /// `prefer_ephemeral_session` ignore it.
    ///
    /// # Errors
    /// Returns `BrowserError` when the browser cannot be launched.
    fn open(&self, url: &str, prefer_ephemeral_session: bool) -> Result<(), BrowserError>;
}

/// Default browser via the platform's URL handler
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &str) -> Command {
        #[cfg(target_os = "macos")]
        let command = {
            let mut command = Command::new("open");
            command.arg(url);
            command
        };

        #[cfg(target_os = "windows")]
        let command = {
            // `cmd /C start` would split the URL at `&`
            let mut command = Command::new("rundll32.exe");
            command.arg("url.dll,FileProtocolHandler").arg(url);
            command
        };

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let command = {
            let mut command = Command::new("xdg-open");
            command.arg(url);
            command
        };

        command
    }
}

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str, prefer_ephemeral_session: bool) -> Result<(), BrowserError> {
        if prefer_ephemeral_session {
            tracing::debug!("System browser cannot open a private session, using the default profile");
        }

        let status = Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(BrowserError::Exit(status));
        }

        tracing::debug!("Opened authorization URL in system browser");
        Ok(())
    }
}
