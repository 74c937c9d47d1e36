//! Operator keys on the server's own terminal
//!
//! The terminal renderer puts the terminal in raw mode, so Ctrl+C arrives as
//! a key press instead of a signal. A blocking thread reads key events and
//! turns the quit keys into a shutdown.

use crate::shutdown::Shutdown;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, info, warn};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Esc, `q`/`Q` and Ctrl+C stop the server
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q' | 'Q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Watches the terminal for quit keys until `shutdown` fires.
///
/// Polls with a timeout so the thread notices a shutdown triggered
/// elsewhere and exits on its own.
pub fn spawn_quit_listener(shutdown: Shutdown) -> JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.is_triggered() {
            match event::poll(POLL_INTERVAL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!("Stopped reading operator keys: {}", e);
                    return;
                }
            }

            match event::read() {
                Ok(Event::Key(key)) if is_quit_key(&key) => {
                    info!("Operator pressed {:?}, shutting down", key.code);
                    shutdown.trigger();
                }
                Ok(other) => debug!("Ignored terminal event {:?}", other),
                Err(e) => {
                    warn!("Stopped reading operator keys: {}", e);
                    return;
                }
            }
        }
    })
}
