//! Grid geometry, snake body and collision rules
//!
//! The playable interior spans `1..=width` by `1..=height`. Walls occupy
//! column 0, column `width + 1`, row 0 and row `height + 1`, which is where
//! the renderer draws the border.

use rand::Rng;
use shared::{Direction, Position, INITIAL_SNAKE_LEN};
use std::collections::VecDeque;
use thiserror::Error;

/// Random samples tried before falling back to scanning for a free cell
pub const MAX_FOOD_ATTEMPTS: usize = 256;

const MIN_WIDTH: i32 = 10;
const MIN_HEIGHT: i32 = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("board width {0} is too small (minimum {MIN_WIDTH})")]
    TooNarrow(i32),
    #[error("board height {0} is too small (minimum {MIN_HEIGHT})")]
    TooShort(i32),
}

/// What the candidate head ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Wall,
    SelfBite,
    BoardFull,
}

/// Snake body ordered tail to head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    segments: VecDeque<Position>,
}

impl Snake {
    /// Builds a body from segments listed tail first.
    pub fn from_segments(segments: impl IntoIterator<Item = Position>) -> Self {
        let segments: VecDeque<Position> = segments.into_iter().collect();
        assert!(!segments.is_empty(), "snake must have at least one segment");
        Self { segments }
    }

    pub fn head(&self) -> Position {
        // Never empty: enforced by from_segments and never shrunk below one.
        self.segments[self.segments.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.segments.contains(&pos)
    }

    /// Body cells from tail to head
    pub fn segments(&self) -> impl Iterator<Item = Position> + '_ {
        self.segments.iter().copied()
    }

    /// Moves one cell: drops the tail and appends `head`.
    pub fn slide_to(&mut self, head: Position) {
        self.segments.pop_front();
        self.segments.push_back(head);
    }

    /// Appends `head` keeping the tail, growing by one.
    pub fn grow_to(&mut self, head: Position) {
        self.segments.push_back(head);
    }
}

/// Size of the playable interior
///
/// A board only knows its dimensions. The snake and the food live in the
/// session state and are passed in, so the collision checks stay pure and
/// can run against any snake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    width: i32,
    height: i32,
}

impl Board {
    /// Creates a board with a `width` by `height` interior.
    ///
    /// The interior has to fit the initial snake and leave room to turn, so
    /// anything below `MIN_WIDTH` columns or `MIN_HEIGHT` rows is refused:
    ///
    /// - [`BoardError::TooNarrow`] for a small `width`
    /// - [`BoardError::TooShort`] for a small `height`
    ///
    /// The walls are outside these dimensions, so a 40x20 board is drawn as
    /// 42x22 terminal cells.
    pub fn new(width: i32, height: i32) -> Result<Self, BoardError> {
        if width < MIN_WIDTH {
            return Err(BoardError::TooNarrow(width));
        }
        if height < MIN_HEIGHT {
            return Err(BoardError::TooShort(height));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of cells a snake or food may occupy
    pub fn interior_cells(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Horizontal snake with its tail at (width/6, height/4), heading right
    pub fn initial_snake(&self) -> Snake {
        let x = self.width / 6;
        let y = self.height / 4;
        Snake::from_segments((0..INITIAL_SNAKE_LEN as i32).map(|i| Position::new(x + i, y)))
    }

    /// Cell the head would enter moving one step in `direction`.
    ///
    /// Nothing is checked here. The result may be a wall, a body segment or
    /// the food; the `collides_with_*` checks decide what happens next.
    pub fn next_head(&self, snake: &Snake, direction: Direction) -> Position {
        snake.head().step(direction)
    }

    /// True when `pos` is on the border or beyond it.
    ///
    /// Row 0, column 0, row `height + 1` and column `width + 1` are all walls.
    pub fn collides_with_wall(&self, pos: Position) -> bool {
        pos.x <= 0 || pos.x > self.width || pos.y <= 0 || pos.y > self.height
    }

    /// True when `pos` is any segment of `snake`, tail included.
    ///
    /// The tail still counts even though it would move away on a plain
    /// step: a head entering the current tail cell ends the game.
    pub fn collides_with_self(&self, pos: Position, snake: &Snake) -> bool {
        snake.contains(pos)
    }

    /// Exact cell match
    pub fn collides_with_food(&self, pos: Position, food: Position) -> bool {
        pos == food
    }

    /// Picks a free interior cell for food.
    ///
    /// Samples uniformly up to [`MAX_FOOD_ATTEMPTS`] times, then scans for any
    /// free cell. Returns `None` only when the snake fills the whole interior.
    pub fn place_food<R: Rng + ?Sized>(&self, snake: &Snake, rng: &mut R) -> Option<Position> {
        if snake.len() >= self.interior_cells() {
            return None;
        }

        for _ in 0..MAX_FOOD_ATTEMPTS {
            let candidate = Position::new(
                rng.gen_range(1..=self.width),
                rng.gen_range(1..=self.height),
            );
            if !snake.contains(candidate) {
                return Some(candidate);
            }
        }

        (1..=self.height)
            .flat_map(|y| (1..=self.width).map(move |x| Position::new(x, y)))
            .find(|cell| !snake.contains(*cell))
    }
}
