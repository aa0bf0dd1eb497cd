//! Entering and leaving the alternate screen.
//!
//! [`TerminalGuard`] owns raw mode for the lifetime of the UI and restores the
//! terminal when dropped, including on early `?` returns. [`setup_panic_hook`]
//! covers the panic path, where destructors may not get a usable terminal.

use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Write};
use std::panic;

pub fn enter_frame_screen<W: Write>(writer: &mut W) -> io::Result<()> {
    execute!(writer, EnterAlternateScreen)
}

/// Leave the alternate screen and show the cursor. Errors are ignored so this
/// is safe to call more than once, or when the screen was never entered.
pub fn leave_frame_screen<W: Write>(writer: &mut W) {
    let _ = disable_raw_mode();
    let _ = execute!(writer, LeaveAlternateScreen, Show);
    let _ = writer.flush();
}

pub fn restore_terminal() {
    leave_frame_screen(&mut io::stdout());
}

/// Raw mode plus alternate screen, undone on drop.
#[derive(Debug)]
pub struct TerminalGuard {
    restored: bool,
}

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = Self { restored: false };
        enter_frame_screen(&mut io::stdout())?;
        Ok(guard)
    }

    pub fn restore(&mut self) {
        if !self.restored {
            self.restored = true;
            restore_terminal();
            tracing::debug!("terminal restored");
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Restore the terminal before the default hook prints the panic message.
pub fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTER_ALT_SCREEN: &[u8] = b"\x1b[?1049h";
    const LEAVE_ALT_SCREEN: &[u8] = b"\x1b[?1049l";
    const SHOW_CURSOR: &[u8] = b"\x1b[?25h";

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_enter_writes_alternate_screen() {
        let mut buffer = Vec::new();
        enter_frame_screen(&mut buffer).unwrap();
        assert!(contains(&buffer, ENTER_ALT_SCREEN));
    }

    #[test]
    fn test_leave_restores_screen_and_cursor() {
        let mut buffer = Vec::new();
        leave_frame_screen(&mut buffer);
        assert!(contains(&buffer, LEAVE_ALT_SCREEN));
        assert!(contains(&buffer, SHOW_CURSOR));
    }

    #[test]
    fn test_leave_is_repeatable() {
        let mut buffer = Vec::new();
        leave_frame_screen(&mut buffer);
        leave_frame_screen(&mut buffer);
        assert_eq!(
            buffer
                .windows(LEAVE_ALT_SCREEN.len())
                .filter(|w| *w == LEAVE_ALT_SCREEN)
                .count(),
            2
        );
    }

    #[test]
    fn test_guard_restores_once() {
        let mut guard = TerminalGuard { restored: false };
        guard.restore();
        assert!(guard.restored);
        guard.restore();
        drop(guard);
    }

    #[test]
    fn test_setup_panic_hook_does_not_panic() {
        setup_panic_hook();
        let _ = panic::take_hook();
    }
}
