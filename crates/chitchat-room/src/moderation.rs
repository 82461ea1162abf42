//! Message moderation.
//!
//! The router asks a [`ContentFilter`] about every chat message before
//! fanning it out. [`Denylist`] is the shipped implementation: a fixed set
//! of words, matched whole-word and case-insensitively. It is built once
//! at startup and never changes afterwards, so the router can consult it
//! without any locking.
//!
//! A denylist will always miss creative spellings and occasionally flag
//! an innocent word. That is accepted; it is a coarse gate, not a
//! classifier.

use std::collections::HashSet;

/// Decides whether a chat message may be delivered.
pub trait ContentFilter: Send + Sync + 'static {
    /// Returns `true` if `text` must not be delivered.
    fn is_blocked(&self, text: &str) -> bool;
}

impl<F: ContentFilter + ?Sized> ContentFilter for Box<F> {
    fn is_blocked(&self, text: &str) -> bool {
        (**self).is_blocked(text)
    }
}

impl<F: ContentFilter + ?Sized> ContentFilter for std::sync::Arc<F> {
    fn is_blocked(&self, text: &str) -> bool {
        (**self).is_blocked(text)
    }
}

/// A filter that lets everything through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ContentFilter for AllowAll {
    fn is_blocked(&self, _text: &str) -> bool {
        false
    }
}

/// Terms blocked by [`Denylist::default`].
const DEFAULT_WORDS: &[&str] = &[
    "arse", "arsehole", "ass", "asshole", "bastard", "bitch", "bitches",
    "bollocks", "bullshit", "cock", "crap", "cunt", "damn", "dick",
    "dickhead", "douche", "douchebag", "dumbass", "fuck", "fucked",
    "fucker", "fucking", "jackass", "motherfucker", "piss", "pissed",
    "prick", "shit", "shitty", "slut", "twat", "wanker", "whore",
];

/// Whole-word, case-insensitive denylist.
///
/// A *word* is a maximal run of alphanumeric characters, so `"shit!"` and
/// `"SHIT"` match `shit` while `"shitake"` does not.
///
/// Terms containing spaces or punctuation (`"son of a bitch"`, `"a$$"`)
/// are matched as phrases: the text must contain the term, with runs of
/// whitespace treated as one space, and must not continue it with a
/// letter or digit on either side.
///
/// ```rust
/// use chitchat_room::{ContentFilter, Denylist};
///
/// let filter = Denylist::new(["darn", "sh!t"]);
/// assert!(filter.is_blocked("well DARN it"));
/// assert!(!filter.is_blocked("darning socks"));
/// assert!(filter.is_blocked("Sh!t happens"));
/// ```
#[derive(Debug, Clone)]
pub struct Denylist {
    /// Single-word terms, looked up once per word of the message.
    words: HashSet<String>,
    /// Terms with spaces or punctuation, searched for in the whole text.
    phrases: HashSet<String>,
}

impl Denylist {
    /// Builds a denylist from the given terms. Terms are trimmed and
    /// lowercased; blank ones are dropped.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: HashSet::new(),
            phrases: HashSet::new(),
        }
        .with_words(words)
    }

    /// Parses a denylist file: one term per line, blank lines and lines
    /// starting with `#` ignored.
    pub fn parse(source: &str) -> Self {
        Self::new(
            source
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    /// Adds terms to the list.
    pub fn with_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for term in words.into_iter().filter_map(|w| normalize_term(w.as_ref())) {
            if term.chars().all(char::is_alphanumeric) {
                self.words.insert(term);
            } else {
                self.phrases.insert(term);
            }
        }
        self
    }

    /// Removes terms from the list.
    pub fn without_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            if let Some(term) = normalize_term(word.as_ref()) {
                self.words.remove(&term);
                self.phrases.remove(&term);
            }
        }
        self
    }

    /// Returns `true` if `word` is on the list (case-insensitive).
    pub fn contains(&self, word: &str) -> bool {
        normalize_term(word).is_some_and(|term| {
            self.words.contains(&term) || self.phrases.contains(&term)
        })
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.words.len() + self.phrases.len()
    }

    /// Returns `true` if the list blocks nothing.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.phrases.is_empty()
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS)
    }
}

impl ContentFilter for Denylist {
    fn is_blocked(&self, text: &str) -> bool {
        let word_hit = !self.words.is_empty()
            && text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|word| !word.is_empty())
                .any(|word| self.words.contains(&word.to_lowercase()));
        if word_hit || self.phrases.is_empty() {
            return word_hit;
        }

        let text = fold(text);
        self.phrases
            .iter()
            .any(|phrase| contains_phrase(&text, phrase))
    }
}

/// Lowercases and collapses whitespace runs to single spaces.
fn fold(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_term(term: &str) -> Option<String> {
    let term = fold(term);
    (!term.is_empty()).then_some(term)
}

/// Finds `phrase` in `text` without a letter or digit touching either end.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    text.match_indices(phrase).any(|(start, found)| {
        let before = text[..start].chars().next_back();
        let after = text[start + found.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric)
            && !after.is_some_and(char::is_alphanumeric)
    })
}
