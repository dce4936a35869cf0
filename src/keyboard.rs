//! Keyboard input during playback.
//!
//! The terminal is switched to raw mode for the duration of playback so that
//! single key presses arrive immediately. [`RawMode`] is a guard: raw mode
//! ends when it is dropped, whichever way the session ends.
//!
//! Key bindings:
//! * `space` toggles between playing and paused
//! * `ctrl-c`, `esc` and `q` quit

use std::io;

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use futures_util::{future, stream::LocalBoxStream, StreamExt};

use crate::error::{Error, Result};

/// One-line summary of the key bindings.
pub const HINT: &str = "space: play/pause, q, esc or ctrl-c: quit";

/// What the user asked for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    TogglePause,
    Quit,
}

impl Command {
    /// Maps a key event to a command, if it is bound to one.
    ///
    /// Only key presses count; repeats and releases are ignored.
    #[must_use]
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Char(' ') => Some(Self::TogglePause),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Self::Quit)
            }
            KeyCode::Esc | KeyCode::Char('q') => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Commands typed on the terminal.
///
/// The stream ends when the terminal stops delivering events.
pub fn commands() -> LocalBoxStream<'static, Command> {
    EventStream::new()
        .take_while(|event| {
            if let Err(e) = event {
                error!("cannot read keyboard input: {e}");
            }
            future::ready(event.is_ok())
        })
        .filter_map(|event| {
            let command = match event {
                Ok(Event::Key(key)) => Command::from_key(key),
                _ => None,
            };
            future::ready(command)
        })
        .boxed_local()
}

/// Switches the terminal between raw and cooked mode.
pub trait Terminal {
    fn enable_raw_mode(&mut self) -> io::Result<()>;

    fn disable_raw_mode(&mut self) -> io::Result<()>;
}

/// The process's controlling terminal.
#[derive(Copy, Clone, Debug, Default)]
pub struct Crossterm;

impl Terminal for Crossterm {
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()
    }

    fn disable_raw_mode(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()
    }
}

/// Keeps a terminal in raw mode while alive.
#[derive(Debug)]
pub struct RawMode<T: Terminal = Crossterm> {
    terminal: T,
    enabled: bool,
}

impl<T: Terminal> RawMode<T> {
    /// Enters raw mode on `terminal`.
    ///
    /// # Errors
    ///
    /// Returns an [`Io`](crate::error::ErrorKind::Io) error when the terminal
    /// does not support raw mode.
    pub fn enable(mut terminal: T) -> Result<Self> {
        terminal
            .enable_raw_mode()
            .map_err(|e| Error::io(format!("terminal does not support raw mode: {e}")))?;
        trace!("entered raw mode");
        Ok(Self {
            terminal,
            enabled: true,
        })
    }

    /// Leaves raw mode. Calling this more than once is harmless.
    pub fn disable(&mut self) -> Result<()> {
        if self.enabled {
            self.enabled = false;
            self.terminal.disable_raw_mode()?;
            trace!("left raw mode");
        }
        Ok(())
    }
}

impl<T: Terminal> Drop for RawMode<T> {
    fn drop(&mut self) {
        if let Err(e) = self.disable() {
            error!("failed to restore terminal: {e}");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crossterm::event::KeyEventState;

    use super::*;

    /// Records mode switches; clones share the record.
    #[derive(Clone, Debug, Default)]
    pub(crate) struct FakeTerminal {
        pub(crate) switches: Rc<RefCell<Vec<&'static str>>>,
        pub(crate) unsupported: bool,
    }

    impl FakeTerminal {
        pub(crate) fn switches(&self) -> Vec<&'static str> {
            self.switches.borrow().clone()
        }
    }

    impl Terminal for FakeTerminal {
        fn enable_raw_mode(&mut self) -> io::Result<()> {
            if self.unsupported {
                return Err(io::Error::new(io::ErrorKind::Unsupported, "not a tty"));
            }
            self.switches.borrow_mut().push("raw");
            Ok(())
        }

        fn disable_raw_mode(&mut self) -> io::Result<()> {
            self.switches.borrow_mut().push("cooked");
            Ok(())
        }
    }

    #[test]
    fn raw_mode_ends_on_drop() {
        let terminal = FakeTerminal::default();
        {
            let _raw_mode = RawMode::enable(terminal.clone()).unwrap();
            assert_eq!(terminal.switches(), vec!["raw"]);
        }
        assert_eq!(terminal.switches(), vec!["raw", "cooked"]);
    }

    #[test]
    fn raw_mode_ends_once() {
        let terminal = FakeTerminal::default();
        let mut raw_mode = RawMode::enable(terminal.clone()).unwrap();
        raw_mode.disable().unwrap();
        raw_mode.disable().unwrap();
        drop(raw_mode);
        assert_eq!(terminal.switches(), vec!["raw", "cooked"]);
    }

    #[test]
    fn unsupported_terminal_is_an_io_error() {
        let terminal = FakeTerminal {
            unsupported: true,
            ..FakeTerminal::default()
        };
        let err = RawMode::enable(terminal.clone()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Io);
        assert!(terminal.switches().is_empty());
    }

    fn key(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        key(code, modifiers, KeyEventKind::Press)
    }

    #[test]
    fn space_toggles() {
        assert_eq!(
            Command::from_key(press(KeyCode::Char(' '), KeyModifiers::NONE)),
            Some(Command::TogglePause)
        );
    }

    #[test]
    fn ctrl_c_and_escape_quit() {
        assert_eq!(
            Command::from_key(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
        assert_eq!(
            Command::from_key(press(KeyCode::Esc, KeyModifiers::NONE)),
            Some(Command::Quit)
        );
    }

    #[test]
    fn other_keys_are_ignored() {
        assert_eq!(
            Command::from_key(press(KeyCode::Char('c'), KeyModifiers::NONE)),
            None
        );
        assert_eq!(
            Command::from_key(press(KeyCode::Enter, KeyModifiers::NONE)),
            None
        );
    }

    #[test]
    fn hint_names_every_binding() {
        for (binding, code, modifiers) in [
            ("space", KeyCode::Char(' '), KeyModifiers::NONE),
            ("q", KeyCode::Char('q'), KeyModifiers::NONE),
            ("esc", KeyCode::Esc, KeyModifiers::NONE),
            ("ctrl-c", KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            assert!(Command::from_key(press(code, modifiers)).is_some());
            assert!(HINT.contains(binding), "{binding} missing from hint");
        }
    }

    #[test]
    fn releases_are_ignored() {
        assert_eq!(
            Command::from_key(key(
                KeyCode::Char(' '),
                KeyModifiers::NONE,
                KeyEventKind::Release
            )),
            None
        );
    }
}
