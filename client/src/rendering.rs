//! Score display for the remote-control client

use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use log::warn;
use std::io::{self, Stdout, Write};

const HELP: [&str; 4] = [
    "Arrows / WASD  steer",
    "P  pause      R  restart",
    "Q / Esc  quit (stops the server)",
    "Ctrl+L  redraw   C  clear",
];

/// Shows the latest score pushed by the server plus the key bindings.
///
/// [`ScoreView::terminal`] puts the controlling terminal into raw mode and
/// the alternate screen; both are restored on drop.
pub struct ScoreView<W: Write = Stdout> {
    out: W,
    server: String,
    score: Option<i32>,
    status: String,
    terminal: bool,
}

impl ScoreView {
    pub fn terminal(server: &str) -> io::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(out, terminal::EnterAlternateScreen, cursor::Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }

        let mut view = Self::new(out, server);
        view.terminal = true;
        Ok(view)
    }
}

impl<W: Write> ScoreView<W> {
    /// View writing to an arbitrary sink; the terminal mode is left alone
    pub fn new(out: W, server: &str) -> Self {
        Self {
            out,
            server: server.to_string(),
            score: None,
            status: "Connected".to_string(),
            terminal: false,
        }
    }

    pub fn score(&self) -> Option<i32> {
        self.score
    }

    pub fn set_score(&mut self, score: i32) -> io::Result<()> {
        self.score = Some(score);
        self.redraw()
    }

    pub fn set_status(&mut self, status: impl Into<String>) -> io::Result<()> {
        self.status = status.into();
        self.redraw()
    }

    /// Blanks the screen without forgetting the score
    pub fn clear(&mut self) -> io::Result<()> {
        execute!(self.out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))
    }

    pub fn redraw(&mut self) -> io::Result<()> {
        let score = match self.score {
            Some(score) => score.to_string(),
            None => "-".to_string(),
        };

        queue!(
            self.out,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0),
            SetAttribute(Attribute::Bold),
            Print(format!("Snake @ {}", self.server)),
            SetAttribute(Attribute::Reset),
            cursor::MoveTo(0, 2),
            Print(format!("Score: {}", score)),
            cursor::MoveTo(0, 3),
            Print(&self.status),
        )?;

        for (row, line) in HELP.iter().enumerate() {
            queue!(self.out, cursor::MoveTo(0, 5 + row as u16), Print(line))?;
        }

        self.out.flush()
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Drop for ScoreView<W> {
    fn drop(&mut self) {
        if !self.terminal {
            return;
        }

        let restored = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen)
            .and_then(|_| terminal::disable_raw_mode());
        if let Err(e) = restored {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(view: &ScoreView<Vec<u8>>) -> String {
        String::from_utf8_lossy(view.output()).into_owned()
    }

    #[test]
    fn test_redraw_shows_placeholder_before_first_score() {
        let mut view = ScoreView::new(Vec::new(), "127.0.0.1:3000");
        view.redraw().unwrap();

        let out = text(&view);
        assert!(out.contains("Snake @ 127.0.0.1:3000"));
        assert!(out.contains("Score: -"));
        assert!(out.contains("R  restart"));
    }

    #[test]
    fn test_score_update_redraws() {
        let mut view = ScoreView::new(Vec::new(), "host:1");
        view.set_score(7).unwrap();

        assert_eq!(view.score(), Some(7));
        assert!(text(&view).contains("Score: 7"));
    }

    #[test]
    fn test_clear_keeps_score() {
        let mut view = ScoreView::new(Vec::new(), "host:1");
        view.set_score(3).unwrap();
        view.clear().unwrap();
        view.set_status("Disconnected").unwrap();

        let out = text(&view);
        assert_eq!(view.score(), Some(3));
        assert!(out.ends_with("Ctrl+L  redraw   C  clear"));
        assert!(out.contains("Disconnected"));
    }
}
