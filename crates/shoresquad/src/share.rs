//! Sharing crew ids through the system clipboard.

use clipboard_rs::{Clipboard, ClipboardContext};
use tracing::{debug, warn};

use crate::crew::Crew;
use crate::error::{Error, Result};

/// Somewhere shared text can be placed.
pub trait ShareTarget {
    /// Replace the target's contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be written.
    fn put_text(&mut self, text: &str) -> Result<()>;
}

/// The desktop clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ShareTarget for SystemClipboard {
    fn put_text(&mut self, text: &str) -> Result<()> {
        let ctx = ClipboardContext::new().map_err(|e| Error::clipboard(e.to_string()))?;
        ctx.set_text(text.to_string())
            .map_err(|e| Error::clipboard(e.to_string()))?;
        debug!(len = text.len(), "Wrote text to clipboard");
        Ok(())
    }
}

/// Copy the crew's id to `target`.
///
/// Returns whether the copy happened. Without a usable clipboard (headless
/// sessions, no display server) this logs a warning and does nothing.
pub fn share_crew(target: &mut dyn ShareTarget, crew: &Crew) -> bool {
    match target.put_text(&crew.id.to_string()) {
        Ok(()) => true,
        Err(e) => {
            warn!(crew_id = crew.id, "Could not share crew: {e}");
            false
        }
    }
}
