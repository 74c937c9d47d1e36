//! Wire protocol and grid types shared by the snake server and its clients.
//!
//! Every message on the wire is a fixed 4-byte big-endian field. Clients send
//! command codes; the server sends the new score whenever it changes.

pub const DEFAULT_PORT: u16 = 3000;
pub const BOARD_WIDTH: i32 = 70;
pub const BOARD_HEIGHT: i32 = 20;
pub const INITIAL_SNAKE_LEN: usize = 5;
pub const TICK_MILLIS: u64 = 200;
pub const FRAME_LEN: usize = 4;

pub const CODE_UP: u32 = 0x000;
pub const CODE_RIGHT: u32 = 0x001;
pub const CODE_LEFT: u32 = 0x010;
pub const CODE_DOWN: u32 = 0x011;
pub const CODE_QUIT: u32 = 0x100;
pub const CODE_PAUSE: u32 = 0x101;
pub const CODE_RESTART: u32 = 0x110;

pub type Frame = [u8; FRAME_LEN];

/// A grid cell. Row 0 and column 0 are border cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::new(self.x, self.y - 1),
            Direction::Right => Self::new(self.x + 1, self.y),
            Direction::Down => Self::new(self.x, self.y + 1),
            Direction::Left => Self::new(self.x - 1, self.y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }
}

/// A decoded client instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveUp,
    MoveRight,
    MoveDown,
    MoveLeft,
    Pause,
    Restart,
    Quit,
}

impl Command {
    /// Decodes a big-endian command frame. Unknown codes yield `None`.
    pub fn decode(frame: Frame) -> Option<Self> {
        Self::from_code(u32::from_be_bytes(frame))
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            CODE_UP => Some(Command::MoveUp),
            CODE_RIGHT => Some(Command::MoveRight),
            CODE_LEFT => Some(Command::MoveLeft),
            CODE_DOWN => Some(Command::MoveDown),
            CODE_QUIT => Some(Command::Quit),
            CODE_PAUSE => Some(Command::Pause),
            CODE_RESTART => Some(Command::Restart),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Command::MoveUp => CODE_UP,
            Command::MoveRight => CODE_RIGHT,
            Command::MoveLeft => CODE_LEFT,
            Command::MoveDown => CODE_DOWN,
            Command::Quit => CODE_QUIT,
            Command::Pause => CODE_PAUSE,
            Command::Restart => CODE_RESTART,
        }
    }

    pub fn encode(self) -> Frame {
        self.code().to_be_bytes()
    }

    /// The heading requested by a movement command.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Command::MoveUp => Some(Direction::Up),
            Command::MoveRight => Some(Direction::Right),
            Command::MoveDown => Some(Direction::Down),
            Command::MoveLeft => Some(Direction::Left),
            Command::Pause | Command::Restart | Command::Quit => None,
        }
    }
}

pub fn encode_score(score: i32) -> Frame {
    score.to_be_bytes()
}

pub fn decode_score(frame: Frame) -> i32 {
    i32::from_be_bytes(frame)
}
