//! The in-memory conversation transcript.
//!
//! A [`Transcript`] is an append-only, chronologically ordered list of
//! [`Turn`]s. It lives exactly as long as the chat session that owns it.

use std::fmt;
use std::slice;

/// Who authored a turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person typing into the chat.
    User,

    /// The model.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One message of the conversation.  Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Create a turn with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The author of this turn.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The text of this turn.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered, append-only sequence of turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript whose first turn is the assistant greeting.
    pub fn seeded(greeting: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.seed_if_empty(greeting);
        transcript
    }

    /// Push the greeting as an assistant turn, but only into an empty transcript.
    ///
    /// Returns true if the greeting was added.
    pub fn seed_if_empty(&mut self, greeting: impl Into<String>) -> bool {
        if self.turns.is_empty() {
            self.turns.push(Turn::assistant(greeting));
            true
        } else {
            false
        }
    }

    /// Append a turn at the end.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns, oldest first.
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    /// Iterate over the turns, oldest first.
    pub fn iter(&self) -> slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// The most recent turn.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True if no turn has been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_transcript_starts_with_greeting() {
        let transcript = Transcript::seeded("Hello!");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.all()[0], Turn::assistant("Hello!"));
    }

    #[test]
    fn seed_only_when_empty() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert!(transcript.seed_if_empty("first"));
        assert!(!transcript.seed_if_empty("second"));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.all()[0].content(), "first");
    }

    #[test]
    fn append_preserves_order() {
        let mut transcript = Transcript::seeded("hi");
        transcript.append(Turn::user("one"));
        transcript.append(Turn::assistant("two"));
        transcript.append(Turn::user("one"));

        let contents: Vec<&str> = transcript.iter().map(Turn::content).collect();
        assert_eq!(contents, vec!["hi", "one", "two", "one"]);
        assert_eq!(transcript.last(), Some(&Turn::user("one")));
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Turn::user("x").role(), Role::User);
    }

    #[test]
    fn borrowed_iteration() {
        let transcript = Transcript::seeded("hi");
        let mut count = 0;
        for turn in &transcript {
            assert_eq!(turn.role(), Role::Assistant);
            count += 1;
        }
        assert_eq!(count, 1);
    }
}
