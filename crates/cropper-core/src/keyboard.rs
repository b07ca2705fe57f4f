//! Keyboard shortcuts for a cropping session.
//!
//! A [`KeyboardSubscription`] is a plain value owned by the session: it maps
//! key chords to [`KeyCommand`]s and is dropped when the session closes, so no
//! listener outlives the editor.
//!
//! # Default Bindings
//!
//! | Chord | Command |
//! |---|---|
//! | `R` | rotate 90° |
//! | `Escape` | cancel |
//! | `Ctrl+Enter` / `Cmd+Enter` | confirm |
//! | `+` / `=` | zoom in |
//! | `-` | zoom out |
//! | `C` | toggle crop mode |

use serde::{Deserialize, Serialize};

/// A key, named the way browsers report `KeyboardEvent.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable character, stored lowercase.
    Character(char),
    Escape,
    Enter,
    /// Any other named key.
    Other,
}

impl Key {
    /// Parse a `KeyboardEvent.key` value.
    ///
    /// Single characters become [`Key::Character`] (lowercased); `"Escape"`,
    /// `"Esc"` and `"Enter"` map to their variants; anything else is
    /// [`Key::Other`].
    pub fn parse(name: &str) -> Key {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Key::Character(c.to_ascii_lowercase()),
            _ => match name {
                "Escape" | "Esc" => Key::Escape,
                "Enter" => Key::Enter,
                _ => Key::Other,
            },
        }
    }
}

/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A single key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// A press without modifiers.
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::default())
    }
}

/// A key plus whether the primary modifier (Ctrl/Cmd) must be held.
///
/// Shift is ignored so `+` matches on layouts where it needs Shift; Alt
/// never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: Key,
    pub primary: bool,
}

impl KeyChord {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            primary: false,
        }
    }

    pub fn with_primary(key: Key) -> Self {
        Self { key, primary: true }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.key && self.primary == event.modifiers.primary() && !event.modifiers.alt
    }
}

/// An action a shortcut triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyCommand {
    Rotate,
    Cancel,
    Confirm,
    ZoomIn,
    ZoomOut,
    ToggleCropMode,
}

/// Chord-to-command table.
#[derive(Debug, Clone, Default)]
pub struct KeyboardSubscription {
    bindings: Vec<(KeyChord, KeyCommand)>,
}

impl KeyboardSubscription {
    /// An empty subscription.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_bindings() -> Self {
        let mut subscription = Self::new();
        subscription.bind(KeyChord::plain(Key::Character('r')), KeyCommand::Rotate);
        subscription.bind(KeyChord::plain(Key::Escape), KeyCommand::Cancel);
        subscription.bind(KeyChord::with_primary(Key::Enter), KeyCommand::Confirm);
        subscription.bind(KeyChord::plain(Key::Character('+')), KeyCommand::ZoomIn);
        subscription.bind(KeyChord::plain(Key::Character('=')), KeyCommand::ZoomIn);
        subscription.bind(KeyChord::plain(Key::Character('-')), KeyCommand::ZoomOut);
        subscription.bind(KeyChord::plain(Key::Character('c')), KeyCommand::ToggleCropMode);
        subscription
    }

    /// Bind `chord` to `command`, replacing any existing binding for `chord`.
    pub fn bind(&mut self, chord: KeyChord, command: KeyCommand) {
        self.unbind(chord);
        self.bindings.push((chord, command));
    }

    /// Remove the binding for `chord`. Returns the command it was bound to.
    pub fn unbind(&mut self, chord: KeyChord) -> Option<KeyCommand> {
        let index = self.bindings.iter().position(|(c, _)| *c == chord)?;
        Some(self.bindings.remove(index).1)
    }

    /// The command bound to `event`, if any.
    pub fn resolve(&self, event: &KeyEvent) -> Option<KeyCommand> {
        self.bindings
            .iter()
            .find(|(chord, _)| chord.matches(event))
            .map(|(_, command)| *command)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
