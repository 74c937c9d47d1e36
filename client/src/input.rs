//! Key bindings: terminal key events to protocol commands

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use shared::Command;

/// What the client should do with a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Send(Command),
    /// Send the command, then leave
    SendAndExit(Command),
    Redraw,
    Clear,
    None,
}

/// Terminal events the client reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalInput {
    Key(KeyEvent),
    /// The window changed size; the score view has to be drawn again
    Resize,
}

impl TerminalInput {
    /// `None` for mouse, focus and paste events.
    pub fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::Key(key) => Some(TerminalInput::Key(key)),
            Event::Resize(..) => Some(TerminalInput::Resize),
            _ => None,
        }
    }
}

/// Maps a key press to an action.
///
/// Esc, Ctrl+C and `q`/`Q` quit; `r` restarts; `p` pauses; arrow keys and WASD
/// steer. Ctrl+L redraws and `c` clears the local screen.
pub fn map_key(event: KeyEvent) -> KeyAction {
    if event.kind == KeyEventKind::Release {
        return KeyAction::None;
    }

    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);

    match event.code {
        KeyCode::Esc => KeyAction::SendAndExit(Command::Quit),
        KeyCode::Char('c') if ctrl => KeyAction::SendAndExit(Command::Quit),
        KeyCode::Char('l') if ctrl => KeyAction::Redraw,
        KeyCode::Char('q' | 'Q') => KeyAction::SendAndExit(Command::Quit),
        KeyCode::Char('c' | 'C') => KeyAction::Clear,
        KeyCode::Char('r' | 'R') => KeyAction::Send(Command::Restart),
        KeyCode::Char('p' | 'P') => KeyAction::Send(Command::Pause),
        KeyCode::Up | KeyCode::Char('w' | 'W') => KeyAction::Send(Command::MoveUp),
        KeyCode::Right | KeyCode::Char('d' | 'D') => KeyAction::Send(Command::MoveRight),
        KeyCode::Down | KeyCode::Char('s' | 'S') => KeyAction::Send(Command::MoveDown),
        KeyCode::Left | KeyCode::Char('a' | 'A') => KeyAction::Send(Command::MoveLeft),
        _ => KeyAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(map_key(key(KeyCode::Esc)), KeyAction::SendAndExit(Command::Quit));
        assert_eq!(map_key(key(KeyCode::Char('q'))), KeyAction::SendAndExit(Command::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT)),
            KeyAction::SendAndExit(Command::Quit)
        );
        assert_eq!(map_key(ctrl('c')), KeyAction::SendAndExit(Command::Quit));
    }

    #[test]
    fn test_arrows_and_wasd_steer() {
        let pairs = [
            (KeyCode::Up, Command::MoveUp),
            (KeyCode::Char('w'), Command::MoveUp),
            (KeyCode::Right, Command::MoveRight),
            (KeyCode::Char('D'), Command::MoveRight),
            (KeyCode::Down, Command::MoveDown),
            (KeyCode::Char('s'), Command::MoveDown),
            (KeyCode::Left, Command::MoveLeft),
            (KeyCode::Char('a'), Command::MoveLeft),
        ];

        for (code, command) in pairs {
            assert_eq!(map_key(key(code)), KeyAction::Send(command), "{:?}", code);
        }
    }

    #[test]
    fn test_game_controls() {
        assert_eq!(map_key(key(KeyCode::Char('r'))), KeyAction::Send(Command::Restart));
        assert_eq!(map_key(key(KeyCode::Char('P'))), KeyAction::Send(Command::Pause));
    }

    #[test]
    fn test_local_screen_keys() {
        assert_eq!(map_key(ctrl('l')), KeyAction::Redraw);
        assert_eq!(map_key(key(KeyCode::Char('c'))), KeyAction::Clear);
    }

    #[test]
    fn test_unbound_keys_ignored() {
        assert_eq!(map_key(key(KeyCode::Char('x'))), KeyAction::None);
        assert_eq!(map_key(key(KeyCode::Enter)), KeyAction::None);
    }

    #[test]
    fn test_resize_requests_redraw() {
        assert_eq!(
            TerminalInput::from_event(Event::Resize(120, 40)),
            Some(TerminalInput::Resize)
        );
        assert_eq!(
            TerminalInput::from_event(Event::Key(key(KeyCode::Up))),
            Some(TerminalInput::Key(key(KeyCode::Up)))
        );
        assert_eq!(TerminalInput::from_event(Event::FocusLost), None);
    }

    #[test]
    fn test_key_release_ignored() {
        let mut event = key(KeyCode::Up);
        event.kind = KeyEventKind::Release;
        assert_eq!(map_key(event), KeyAction::None);
    }
}
