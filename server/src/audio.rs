//! Sound cues for session start and game over
//!
//! Clips are MP3 files loaded once at startup from the sound directory
//! (`game_start_beep.mp3`, `game_over_beep.mp3`). A clip played without
//! `auto_reset` stays at its end, so playing it again is silent until it is
//! rewound; with `auto_reset` it rewinds as soon as it finishes.
//!
//! Speaker output needs the `audio` feature (rodio). Without it, or when the
//! clips or the device are unavailable, the server falls back to the
//! terminal bell.

use log::{debug, warn};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundClip {
    GameStart,
    GameOver,
}

impl SoundClip {
    pub const ALL: [SoundClip; 2] = [SoundClip::GameStart, SoundClip::GameOver];

    /// File name of the clip inside the sound directory
    pub fn file_name(self) -> &'static str {
        match self {
            SoundClip::GameStart => "game_start_beep.mp3",
            SoundClip::GameOver => "game_over_beep.mp3",
        }
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to read sound clip {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode sound clip {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("no audio output device: {0}")]
    Device(#[source] BoxError),
}

/// Plays short clips on session transitions.
pub trait SoundPlayer {
    /// Starts `clip`. With `auto_reset` the clip rewinds when it finishes so
    /// it can be played again.
    fn play(&mut self, clip: SoundClip, auto_reset: bool);

    /// Releases the audio backend.
    fn shutdown(&mut self) {}
}

impl<S: SoundPlayer + ?Sized> SoundPlayer for Box<S> {
    fn play(&mut self, clip: SoundClip, auto_reset: bool) {
        (**self).play(clip, auto_reset);
    }

    fn shutdown(&mut self) {
        (**self).shutdown();
    }
}

struct LoadedClip {
    bytes: Arc<[u8]>,
    /// Played to the end and not rewound
    spent: bool,
}

/// Encoded clip data plus the play position of each clip
///
/// Only tracks whether a clip sits at its end; decoding and output are up to
/// the player.
pub struct ClipBank {
    clips: HashMap<SoundClip, LoadedClip>,
}

impl ClipBank {
    /// Reads every clip from `dir`. A missing or unreadable file fails the
    /// whole bank.
    pub fn load(dir: &Path) -> Result<Self, AudioError> {
        let mut clips = HashMap::new();

        for clip in SoundClip::ALL {
            let path = dir.join(clip.file_name());
            let bytes = std::fs::read(&path).map_err(|source| AudioError::Read {
                path: path.clone(),
                source,
            })?;
            debug!("Loaded {:?} from {} ({} bytes)", clip, path.display(), bytes.len());

            clips.insert(
                clip,
                LoadedClip {
                    bytes: bytes.into(),
                    spent: false,
                },
            );
        }

        Ok(Self { clips })
    }

    /// Returns the clip data to play, or `None` when the clip already ran to
    /// its end without `auto_reset`.
    pub fn take(&mut self, clip: SoundClip, auto_reset: bool) -> Option<Arc<[u8]>> {
        let loaded = self.clips.get_mut(&clip)?;
        if loaded.spent {
            debug!("{:?} is at its end, not rewound", clip);
            return None;
        }

        loaded.spent = !auto_reset;
        Some(Arc::clone(&loaded.bytes))
    }

    /// Puts every clip back at its start
    pub fn rewind_all(&mut self) {
        for loaded in self.clips.values_mut() {
            loaded.spent = false;
        }
    }

    #[cfg(feature = "audio")]
    fn iter(&self) -> impl Iterator<Item = (SoundClip, &Arc<[u8]>)> {
        self.clips.iter().map(|(clip, loaded)| (*clip, &loaded.bytes))
    }
}

/// Speaker output through rodio
#[cfg(feature = "audio")]
pub struct SpeakerPlayer {
    clips: ClipBank,
    output: Option<(rodio::OutputStream, rodio::OutputStreamHandle)>,
}

#[cfg(feature = "audio")]
impl SpeakerPlayer {
    /// Loads and decodes every clip in `dir`, then opens the default output
    /// device.
    pub fn open(dir: &Path) -> Result<Self, AudioError> {
        let clips = ClipBank::load(dir)?;

        for (clip, bytes) in clips.iter() {
            rodio::Decoder::new(io::Cursor::new(Arc::clone(bytes))).map_err(|source| {
                AudioError::Decode {
                    path: dir.join(clip.file_name()),
                    source: Box::new(source),
                }
            })?;
        }

        let output =
            rodio::OutputStream::try_default().map_err(|e| AudioError::Device(Box::new(e)))?;
        Ok(Self {
            clips,
            output: Some(output),
        })
    }
}

#[cfg(feature = "audio")]
impl SoundPlayer for SpeakerPlayer {
    fn play(&mut self, clip: SoundClip, auto_reset: bool) {
        let Some((_, handle)) = self.output.as_ref() else {
            return;
        };
        let Some(bytes) = self.clips.take(clip, auto_reset) else {
            return;
        };

        let sink = match rodio::Sink::try_new(handle) {
            Ok(sink) => sink,
            Err(e) => {
                warn!("Failed to open sink for {:?}: {}", clip, e);
                return;
            }
        };
        match rodio::Decoder::new(io::Cursor::new(bytes)) {
            Ok(source) => {
                sink.append(source);
                sink.detach();
            }
            Err(e) => warn!("Failed to decode {:?}: {}", clip, e),
        }
    }

    fn shutdown(&mut self) {
        self.output = None;
        self.clips.rewind_all();
    }
}

/// Rings the terminal bell; a bell has no stream to rewind
pub struct TerminalBell<W: Write = io::Stdout> {
    out: W,
}

impl TerminalBell {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SoundPlayer for TerminalBell<W> {
    fn play(&mut self, clip: SoundClip, _auto_reset: bool) {
        let rings = match clip {
            SoundClip::GameStart => 1,
            SoundClip::GameOver => 2,
        };

        let result = self
            .out
            .write_all(&b"\x07\x07"[..rings])
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!("Failed to ring bell for {:?}: {}", clip, e);
        }
    }
}

/// Discards every cue
#[derive(Debug, Default)]
pub struct Silent;

impl SoundPlayer for Silent {
    fn play(&mut self, clip: SoundClip, _auto_reset: bool) {
        debug!("Muted {:?}", clip);
    }
}

/// Picks the sound backend for a run.
///
/// `Silent` when muted, speaker output when the `audio` feature is enabled
/// and the clips and device are usable, otherwise the terminal bell.
pub fn open_player(sound_dir: &Path, mute: bool) -> Box<dyn SoundPlayer> {
    if mute {
        Box::new(Silent)
    } else {
        speaker_or_bell(sound_dir)
    }
}

#[cfg(feature = "audio")]
fn speaker_or_bell(sound_dir: &Path) -> Box<dyn SoundPlayer> {
    match SpeakerPlayer::open(sound_dir) {
        Ok(player) => Box::new(player),
        Err(e) => {
            warn!("Speaker output unavailable, using terminal bell: {}", e);
            Box::new(TerminalBell::stdout())
        }
    }
}

#[cfg(not(feature = "audio"))]
fn speaker_or_bell(sound_dir: &Path) -> Box<dyn SoundPlayer> {
    debug!(
        "Built without the audio feature, ignoring clips in {}",
        sound_dir.display()
    );
    Box::new(TerminalBell::stdout())
}
