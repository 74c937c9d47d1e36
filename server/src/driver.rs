//! Fixed-interval tick loop: advance the session, then draw it

use crate::audio::{SoundClip, SoundPlayer};
use crate::game::{GameSession, TickOutcome};
use crate::render::{draw_frame, Renderer};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

pub struct SessionDriver<R: Renderer, S: SoundPlayer> {
    session: Arc<GameSession>,
    renderer: R,
    sound: S,
    tick: Duration,
}

impl<R: Renderer, S: SoundPlayer> SessionDriver<R, S> {
    pub fn new(session: Arc<GameSession>, renderer: R, sound: S, tick: Duration) -> Self {
        Self {
            session,
            renderer,
            sound,
            tick,
        }
    }

    /// Ticks until the session's shutdown signal fires, then tears down the
    /// renderer and sound player. Returns the number of ticks run.
    pub async fn run(mut self) -> u64 {
        let shutdown = self.session.shutdown_signal().clone();
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // The first tick fires immediately
        ticker.tick().await;

        self.sound.play(SoundClip::GameStart, false);
        info!("Session driver started ({:?} per tick)", self.tick);

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait() => break,

                _ = ticker.tick() => {
                    ticks += 1;
                    self.step();
                }
            }
        }

        if let Err(e) = self.renderer.shutdown() {
            error!("Failed to release renderer: {}", e);
        }
        self.sound.shutdown();
        info!("Session driver stopped after {} ticks", ticks);
        ticks
    }

    fn step(&mut self) {
        let outcome = self.session.advance();

        if let TickOutcome::GameOver(cause) = outcome {
            debug!("Tick ended the game: {:?}", cause);
            self.sound.play(SoundClip::GameOver, true);
        }

        let snapshot = self.session.snapshot();
        if let Err(e) = draw_frame(&mut self.renderer, self.session.board(), &snapshot) {
            warn!("Failed to draw frame: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::render::CellStyle;
    use crate::scores::{score_channel, OverflowPolicy};
    use crate::shutdown::Shutdown;
    use shared::Command;
    use std::io;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Log {
        frames: usize,
        renderer_closed: bool,
        sound_closed: bool,
        clips: Vec<SoundClip>,
    }

    struct RecordingRenderer(Arc<Mutex<Log>>);
    struct RecordingSound(Arc<Mutex<Log>>);

    impl Renderer for RecordingRenderer {
        fn draw_cell(&mut self, _: i32, _: i32, _: char, _: CellStyle) -> io::Result<()> {
            Ok(())
        }

        fn clear(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn present(&mut self) -> io::Result<()> {
            self.0.lock().unwrap().frames += 1;
            Ok(())
        }

        fn shutdown(&mut self) -> io::Result<()> {
            self.0.lock().unwrap().renderer_closed = true;
            Ok(())
        }
    }

    impl SoundPlayer for RecordingSound {
        fn play(&mut self, clip: SoundClip, _auto_reset: bool) {
            self.0.lock().unwrap().clips.push(clip);
        }

        fn shutdown(&mut self) {
            self.0.lock().unwrap().sound_closed = true;
        }
    }

    fn session(width: i32) -> Arc<GameSession> {
        let board = Board::new(width, 8).unwrap();
        let (tx, _rx) = score_channel(4, OverflowPolicy::DropNewest);
        Arc::new(GameSession::with_seed(board, 9, tx, Shutdown::new()))
    }

    #[tokio::test]
    async fn test_driver_ticks_until_quit() {
        let session = session(70);
        let log = Arc::new(Mutex::new(Log::default()));
        let driver = SessionDriver::new(
            Arc::clone(&session),
            RecordingRenderer(Arc::clone(&log)),
            RecordingSound(Arc::clone(&log)),
            Duration::from_millis(5),
        );
        session.apply_command(Command::Pause);

        let handle = tokio::spawn(driver.run());
        tokio::time::sleep(Duration::from_millis(60)).await;
        session.apply_command(Command::Quit);

        let ticks = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        let log = log.lock().unwrap();
        assert!(ticks > 0);
        assert_eq!(log.frames as u64, ticks);
        assert!(log.renderer_closed);
        assert!(log.sound_closed);
        assert_eq!(log.clips, vec![SoundClip::GameStart]);
    }

    #[tokio::test]
    async fn test_game_over_plays_sound_once() {
        // Narrow board: the snake reaches the right wall within a few ticks.
        let session = session(10);
        let log = Arc::new(Mutex::new(Log::default()));
        let driver = SessionDriver::new(
            Arc::clone(&session),
            RecordingRenderer(Arc::clone(&log)),
            RecordingSound(Arc::clone(&log)),
            Duration::from_millis(2),
        );

        let handle = tokio::spawn(driver.run());
        tokio::time::timeout(Duration::from_secs(2), async {
            while !session.snapshot().game_over {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.shutdown_signal().trigger();
        handle.await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.clips, vec![SoundClip::GameStart, SoundClip::GameOver]);
    }
}
