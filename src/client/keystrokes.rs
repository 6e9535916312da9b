//! Local capture of what the participant typed.

/// Keyboard input relevant to the typing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Delete the last typed character.
    Backspace,
    /// A printable character.
    Char(char),
    /// Anything else (arrows, modifiers, function keys).
    Other,
}

impl Key {
    /// Map a key name (as reported by keyboard events) to a [`Key`].
    /// Single-character names are printable; `"Backspace"` deletes.
    pub fn from_name(name: &str) -> Self {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Key::Char(c),
            _ if name == "Backspace" => Key::Backspace,
            _ => Key::Other,
        }
    }
}

/// Text typed so far. Never sent anywhere and never compared to the race text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBuffer {
    typed: String,
}

impl KeyBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key into the buffer.
    pub fn apply(&mut self, key: Key) {
        match key {
            Key::Backspace => {
                self.typed.pop();
            }
            Key::Char(c) => self.typed.push(c),
            Key::Other => {}
        }
    }

    /// Text typed so far.
    pub fn as_str(&self) -> &str {
        &self.typed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backspace_corrects_the_last_character() {
        let mut buffer = KeyBuffer::new();
        for name in ["c", "a", "t", "Backspace", "r"] {
            buffer.apply(Key::from_name(name));
        }
        assert_eq!(buffer.as_str(), "car");
    }

    #[test]
    fn named_keys_other_than_backspace_are_ignored() {
        let mut buffer = KeyBuffer::new();
        for name in ["Shift", "ArrowLeft", "Backspace", "F1", " ", "é"] {
            buffer.apply(Key::from_name(name));
        }
        assert_eq!(buffer.as_str(), " é");
        assert_eq!(Key::from_name(""), Key::Other);
    }
}
