//! Keyboard shortcuts.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Something the user asked the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Export the current document
    Export,
}

/// Modifier keys held with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: char,
    pub modifiers: Modifiers,
}

impl KeyChord {
    /// A key with no modifiers.
    pub fn plain(key: char) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    /// Ctrl plus `key`.
    pub fn ctrl(key: char) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    /// Cmd (meta) plus `key`.
    pub fn cmd(key: char) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                meta: true,
                ..Modifiers::default()
            },
        }
    }

    /// Map the chord to an action.
    ///
    /// Ctrl+S and Cmd+S export; Shift or Alt variants are left to the host.
    pub fn action(&self) -> Option<Action> {
        let m = self.modifiers;
        if (m.ctrl || m.meta) && !m.alt && !m.shift && self.key.eq_ignore_ascii_case(&'s') {
            return Some(Action::Export);
        }
        None
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.meta {
            write!(f, "Cmd+")?;
        }
        if self.modifiers.alt {
            write!(f, "Alt+")?;
        }
        if self.modifiers.shift {
            write!(f, "Shift+")?;
        }
        write!(f, "{}", self.key.to_ascii_uppercase())
    }
}

impl FromStr for KeyChord {
    type Err = Error;

    /// Parse chords like `Ctrl+S` or `cmd+s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::default();
        let mut key = None;
        for part in s.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "cmd" | "meta" | "super" => modifiers.meta = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                other => {
                    let mut chars = other.chars();
                    match (chars.next(), chars.next(), key) {
                        (Some(c), None, None) => key = Some(c),
                        _ => return Err(Error::Other(format!("invalid key chord: {}", s))),
                    }
                }
            }
        }
        key.map(|key| Self { key, modifiers })
            .ok_or_else(|| Error::Other(format!("key chord has no key: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_shortcuts_export() {
        assert_eq!(KeyChord::ctrl('s').action(), Some(Action::Export));
        assert_eq!(KeyChord::cmd('S').action(), Some(Action::Export));
    }

    #[test]
    fn test_other_chords_ignored() {
        assert_eq!(KeyChord::plain('s').action(), None);
        assert_eq!(KeyChord::ctrl('p').action(), None);
        let chord: KeyChord = "Ctrl+Shift+S".parse().unwrap();
        assert_eq!(chord.action(), None);
    }

    #[test]
    fn test_parse_and_display() {
        let chord: KeyChord = "cmd+s".parse().unwrap();
        assert_eq!(chord, KeyChord::cmd('s'));
        assert_eq!(chord.to_string(), "Cmd+S");
        assert!("Ctrl+".parse::<KeyChord>().is_err());
        assert!("Ctrl+ab".parse::<KeyChord>().is_err());
    }
}
