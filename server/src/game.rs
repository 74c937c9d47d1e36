//! The authoritative snake session
//!
//! One snake, one food cell, one score. Every connected client steers the
//! same snake: whichever direction command takes the lock last wins. There is
//! no per-client ownership of the snake.
//!
//! All mutation goes through a single mutex held only while state changes.
//! The session never renders or plays sound; [`GameSession::advance`] reports
//! what happened and the driver reacts.

use crate::board::{Board, Collision, Snake};
use crate::scores::ScoreSender;
use crate::shutdown::Shutdown;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Command, Direction, Position};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where the session is between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Paused,
    GameOver,
}

/// Result of applying one client command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    DirectionChanged(Direction),
    ReversalRejected,
    IgnoredGameOver,
    Paused,
    Restarted,
    QuitRequested,
}

/// Result of one simulation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Paused or already over; nothing changed
    Idle,
    Moved,
    Ate { score: i32 },
    GameOver(Collision),
}

/// Mutable session state guarded by the session lock
#[derive(Debug)]
pub struct SessionState {
    pub snake: Snake,
    pub food: Position,
    pub direction: Direction,
    pub score: i32,
    pub paused: bool,
    pub game_over: bool,
    /// Commands applied so far, across restarts
    commands_applied: u64,
    rng: StdRng,
}

impl SessionState {
    fn new(board: &Board, mut rng: StdRng) -> Self {
        let snake = board.initial_snake();
        // A fresh board always has free cells around the initial snake.
        let food = board
            .place_food(&snake, &mut rng)
            .unwrap_or(Position::new(board.width(), board.height()));

        Self {
            snake,
            food,
            direction: Direction::Right,
            score: 0,
            paused: false,
            game_over: false,
            commands_applied: 0,
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.game_over {
            Phase::GameOver
        } else if self.paused {
            Phase::Paused
        } else {
            Phase::Running
        }
    }
}

/// Read-only copy of the session taken for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub snake: Vec<Position>,
    pub food: Position,
    pub direction: Direction,
    pub score: i32,
    pub paused: bool,
    pub game_over: bool,
}

impl SessionSnapshot {
    pub fn head(&self) -> Option<Position> {
        self.snake.last().copied()
    }
}

/// The one shared session
///
/// Held in an `Arc` by the driver and every connection task. Each call takes
/// the lock once, so a command and a tick never interleave halfway.
pub struct GameSession {
    board: Board,
    state: Mutex<SessionState>,
    scores: ScoreSender,
    shutdown: Shutdown,
}

impl GameSession {
    /// Creates a running session with the initial snake heading right and
    /// food placed from an entropy-seeded RNG.
    ///
    /// Eaten food is reported through `scores`; a Quit command fires
    /// `shutdown`.
    pub fn new(board: Board, scores: ScoreSender, shutdown: Shutdown) -> Self {
        Self::with_rng(board, StdRng::from_entropy(), scores, shutdown)
    }

    /// Session whose food placement is reproducible from `seed`
    pub fn with_seed(board: Board, seed: u64, scores: ScoreSender, shutdown: Shutdown) -> Self {
        Self::with_rng(board, StdRng::seed_from_u64(seed), scores, shutdown)
    }

    fn with_rng(board: Board, rng: StdRng, scores: ScoreSender, shutdown: Shutdown) -> Self {
        let state = SessionState::new(&board, rng);
        info!(
            "New session on {}x{} board, food at ({}, {})",
            board.width(),
            board.height(),
            state.food.x,
            state.food.y
        );

        Self {
            board,
            state: Mutex::new(state),
            scores,
            shutdown,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Signal fired by a Quit command
    pub fn shutdown_signal(&self) -> &Shutdown {
        &self.shutdown
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // State is always left consistent between statements, so a panic in
        // another holder does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a client command under the session lock.
    ///
    /// Directions are checked against the current direction, so a reversal
    /// is rejected no matter which client sent the previous turn. Restart
    /// reinitializes the state in place; Quit only fires the shutdown signal.
    pub fn apply_command(&self, command: Command) -> CommandOutcome {
        self.apply_command_numbered(command).1
    }

    /// Like [`GameSession::apply_command`], also returning the command's
    /// sequence number.
    ///
    /// Numbers start at 1 and follow the order in which commands took the
    /// lock, so with several clients steering at once the highest number is
    /// the command whose effect is current.
    pub fn apply_command_numbered(&self, command: Command) -> (u64, CommandOutcome) {
        let mut state = self.lock();
        state.commands_applied += 1;
        let sequence = state.commands_applied;

        let outcome = match command {
            Command::MoveUp => Self::steer(&mut state, Direction::Up),
            Command::MoveRight => Self::steer(&mut state, Direction::Right),
            Command::MoveDown => Self::steer(&mut state, Direction::Down),
            Command::MoveLeft => Self::steer(&mut state, Direction::Left),
            Command::Pause => {
                state.paused = true;
                CommandOutcome::Paused
            }
            Command::Restart => {
                self.reset(&mut state);
                CommandOutcome::Restarted
            }
            Command::Quit => {
                self.shutdown.trigger();
                CommandOutcome::QuitRequested
            }
        };

        debug!("#{} {:?} -> {:?}", sequence, command, outcome);
        (sequence, outcome)
    }

    fn steer(state: &mut SessionState, requested: Direction) -> CommandOutcome {
        if state.game_over {
            CommandOutcome::IgnoredGameOver
        } else if requested == state.direction.opposite() {
            CommandOutcome::ReversalRejected
        } else {
            state.direction = requested;
            CommandOutcome::DirectionChanged(requested)
        }
    }

    fn reset(&self, state: &mut SessionState) {
        state.paused = false;
        state.score = 0;
        state.game_over = false;
        state.direction = Direction::Right;
        state.snake = self.board.initial_snake();

        if state.snake.contains(state.food) {
            if let Some(food) = self.board.place_food(&state.snake, &mut state.rng) {
                state.food = food;
            }
        }
        info!("Session restarted");
    }

    /// Advances the simulation by one tick.
    ///
    /// Checks run in a fixed order against the candidate head:
    ///
    /// 1. wall, ending the game
    /// 2. the snake's own body, ending the game
    /// 3. food: grow, bump the score, queue it for broadcast and place new
    ///    food; a board with no free cell left ends the game
    /// 4. otherwise slide one cell
    ///
    /// A paused or finished session returns [`TickOutcome::Idle`] untouched.
    pub fn advance(&self) -> TickOutcome {
        let mut state = self.lock();

        if state.paused || state.game_over {
            return TickOutcome::Idle;
        }

        let candidate = self.board.next_head(&state.snake, state.direction);

        if self.board.collides_with_wall(candidate) {
            return Self::end_game(&mut state, Collision::Wall);
        }

        if self.board.collides_with_self(candidate, &state.snake) {
            return Self::end_game(&mut state, Collision::SelfBite);
        }

        if self.board.collides_with_food(candidate, state.food) {
            state.snake.grow_to(candidate);
            state.score += 1;
            let score = state.score;

            if !self.scores.send(score) {
                debug!("Score {} was not queued for broadcast", score);
            }

            let placed = {
                let state = &mut *state;
                self.board.place_food(&state.snake, &mut state.rng)
            };
            match placed {
                Some(food) => state.food = food,
                None => {
                    warn!("No free cell left for food");
                    return Self::end_game(&mut state, Collision::BoardFull);
                }
            }

            return TickOutcome::Ate { score };
        }

        state.snake.slide_to(candidate);
        TickOutcome::Moved
    }

    fn end_game(state: &mut SessionState, cause: Collision) -> TickOutcome {
        state.game_over = true;
        info!("Game over ({:?}) with score {}", cause, state.score);
        TickOutcome::GameOver(cause)
    }

    /// Copies the state out under the lock.
    ///
    /// The renderer works on the copy, so drawing never holds the session
    /// lock while client commands wait.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            snake: state.snake.segments().collect(),
            food: state.food,
            direction: state.direction,
            score: state.score,
            paused: state.paused,
            game_over: state.game_over,
        }
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }
}
