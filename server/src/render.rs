//! Drawing the session onto a character grid
//!
//! [`draw_frame`] turns a [`SessionSnapshot`] into semantic cell draws. A
//! [`Renderer`] decides what a cell looks like on its backend.

use crate::board::Board;
use crate::game::SessionSnapshot;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use log::{trace, warn};
use std::io::{self, Stdout, Write};

pub const SNAKE_CHAR: char = 'O';
pub const HEAD_CHAR: char = '@';
pub const FOOD_CHAR: char = '●';

const GAME_OVER_BANNER: [&str; 3] = [
    " +-----------------+ ",
    " |    GAME OVER    | ",
    " +-----------------+ ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Wall,
    SnakeBody,
    SnakeHead,
    Food,
    Banner,
    Text,
}

/// Character-grid output used by the session driver
pub trait Renderer {
    fn draw_cell(&mut self, x: i32, y: i32, symbol: char, style: CellStyle) -> io::Result<()>;
    fn clear(&mut self) -> io::Result<()>;
    fn present(&mut self) -> io::Result<()>;

    /// Restores the output device. Called once when the driver stops.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Draws one complete frame: border, snake and food (or the game-over
/// banner), then the status lines under the board.
pub fn draw_frame<R: Renderer + ?Sized>(
    renderer: &mut R,
    board: &Board,
    snapshot: &SessionSnapshot,
) -> io::Result<()> {
    renderer.clear()?;
    draw_border(renderer, board)?;

    if snapshot.game_over {
        draw_banner(renderer, board)?;
    } else {
        renderer.draw_cell(snapshot.food.x, snapshot.food.y, FOOD_CHAR, CellStyle::Food)?;

        if let Some((head, body)) = snapshot.snake.split_last() {
            for segment in body {
                renderer.draw_cell(segment.x, segment.y, SNAKE_CHAR, CellStyle::SnakeBody)?;
            }
            renderer.draw_cell(head.x, head.y, HEAD_CHAR, CellStyle::SnakeHead)?;
        }
    }

    draw_status(renderer, board, snapshot)?;
    renderer.present()
}

fn draw_border<R: Renderer + ?Sized>(renderer: &mut R, board: &Board) -> io::Result<()> {
    let (right, bottom) = (board.width() + 1, board.height() + 1);

    for x in 1..right {
        renderer.draw_cell(x, 0, '═', CellStyle::Wall)?;
        renderer.draw_cell(x, bottom, '═', CellStyle::Wall)?;
    }
    for y in 1..bottom {
        renderer.draw_cell(0, y, '║', CellStyle::Wall)?;
        renderer.draw_cell(right, y, '║', CellStyle::Wall)?;
    }

    renderer.draw_cell(0, 0, '╔', CellStyle::Wall)?;
    renderer.draw_cell(right, 0, '╗', CellStyle::Wall)?;
    renderer.draw_cell(0, bottom, '╚', CellStyle::Wall)?;
    renderer.draw_cell(right, bottom, '╝', CellStyle::Wall)
}

fn draw_banner<R: Renderer + ?Sized>(renderer: &mut R, board: &Board) -> io::Result<()> {
    let top = board.height() / 2 - GAME_OVER_BANNER.len() as i32 / 2;

    for (row, line) in GAME_OVER_BANNER.iter().enumerate() {
        let left = board.width() / 2 - line.chars().count() as i32 / 2;
        draw_text(renderer, left, top + row as i32, line, CellStyle::Banner)?;
    }
    Ok(())
}

fn draw_status<R: Renderer + ?Sized>(
    renderer: &mut R,
    board: &Board,
    snapshot: &SessionSnapshot,
) -> io::Result<()> {
    let paused = format!("Game paused {}", snapshot.paused);
    let score = format!(
        "Score {}, Game over {}",
        snapshot.score, snapshot.game_over
    );

    draw_text(renderer, 0, board.height() + 3, &paused, CellStyle::Text)?;
    draw_text(renderer, 0, board.height() + 4, &score, CellStyle::Text)
}

fn draw_text<R: Renderer + ?Sized>(
    renderer: &mut R,
    x: i32,
    y: i32,
    text: &str,
    style: CellStyle,
) -> io::Result<()> {
    for (i, symbol) in text.chars().enumerate() {
        renderer.draw_cell(x + i as i32, y, symbol, style)?;
    }
    Ok(())
}

/// Full-screen renderer on the controlling terminal
///
/// Switches to raw mode and the alternate screen on creation; both are
/// restored by [`Renderer::shutdown`] or on drop, whichever comes first.
pub struct TerminalRenderer {
    out: Stdout,
    active: bool,
}

impl TerminalRenderer {
    pub fn new() -> io::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(ClearType::All)
        )?;

        Ok(Self { out, active: true })
    }

    fn color(style: CellStyle) -> Color {
        match style {
            CellStyle::Wall => Color::Yellow,
            CellStyle::SnakeBody | CellStyle::SnakeHead => Color::Magenta,
            CellStyle::Food => Color::Red,
            CellStyle::Banner => Color::Green,
            CellStyle::Text => Color::Reset,
        }
    }
}

impl Renderer for TerminalRenderer {
    fn draw_cell(&mut self, x: i32, y: i32, symbol: char, style: CellStyle) -> io::Result<()> {
        let (Ok(col), Ok(row)) = (u16::try_from(x), u16::try_from(y)) else {
            return Ok(());
        };

        queue!(
            self.out,
            cursor::MoveTo(col, row),
            SetForegroundColor(Self::color(style)),
            Print(symbol),
            ResetColor
        )
    }

    fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, terminal::Clear(ClearType::All))
    }

    fn present(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Renderer for runs without a terminal; only counts frames
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    cells: usize,
    frames: u64,
}

impl HeadlessRenderer {
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for HeadlessRenderer {
    fn draw_cell(&mut self, _x: i32, _y: i32, _symbol: char, _style: CellStyle) -> io::Result<()> {
        self.cells += 1;
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.cells = 0;
        Ok(())
    }

    fn present(&mut self) -> io::Result<()> {
        self.frames += 1;
        trace!("Frame {} ({} cells)", self.frames, self.cells);
        Ok(())
    }
}
