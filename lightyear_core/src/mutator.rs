use crate::constraint::RegexConstraint;
use crate::dedup::DedupCache;
use crate::error::MutationError;
use rand::Rng;

/// Default bound on rejection-sampling draws for a single mutation.
pub const DEFAULT_MAX_RETRIES: u64 = 100_000;
/// Symbols that may be inserted in addition to letters and digits.
pub const DEFAULT_INSERT_SYMBOLS: &str = "!?";

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const PUNCTUATION: &str = r##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;

/// Produces a new candidate password from an existing one.
///
/// # Type Parameters
/// * `R`: The random number generator used for mutation decisions.
pub trait Mutator<R: Rng + ?Sized> {
    /// Returns a candidate derived from `input` by one atomic edit.
    ///
    /// # Arguments
    /// * `input`: The string to mutate. It does not itself need to satisfy any
    ///   constraint.
    /// * `rng`: Source of randomness.
    /// * `seen`: When `Some`, candidates already present in the cache are
    ///   rejected and redrawn.
    ///
    /// # Errors
    /// [`MutationError::Infeasible`] if no acceptable candidate was found
    /// within the mutator's retry bound.
    fn mutate(
        &mut self,
        input: &str,
        rng: &mut R,
        seen: Option<&DedupCache>,
    ) -> Result<String, MutationError>;
}

/// The five atomic edits a [`RegexMutator`] can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// Replace one character with another of the same class.
    Substitute,
    /// Splice a letter, digit or allowed symbol in at any position.
    Insert,
    Delete,
    SwapAdjacent,
    ToggleCase,
}

impl EditKind {
    pub const ALL: [EditKind; 5] = [
        EditKind::Substitute,
        EditKind::Insert,
        EditKind::Delete,
        EditKind::SwapAdjacent,
        EditKind::ToggleCase,
    ];

    /// Shortest buffer this edit can be applied to.
    pub fn min_len(self) -> usize {
        match self {
            EditKind::Insert => 0,
            EditKind::Substitute | EditKind::ToggleCase => 1,
            EditKind::Delete | EditKind::SwapAdjacent => 2,
        }
    }

    pub fn is_applicable(self, len: usize) -> bool {
        len >= self.min_len()
    }

    /// Draws an edit kind uniformly, re-rolling kinds that cannot be applied
    /// to a buffer of length `len`. `Insert` always applies, so this returns.
    pub fn choose<R: Rng + ?Sized>(rng: &mut R, len: usize) -> EditKind {
        loop {
            let kind = Self::ALL[rng.random_range(0..Self::ALL.len())];
            if kind.is_applicable(len) {
                return kind;
            }
        }
    }
}

/// Character class used to keep substitutions format-preserving. Every pool
/// is ASCII, so it can be indexed by byte.
fn substitution_pool(original: char) -> &'static [u8] {
    let pool = if original.is_lowercase() {
        LOWERCASE
    } else if original.is_uppercase() {
        UPPERCASE
    } else if original.is_ascii_digit() {
        DIGITS
    } else {
        PUNCTUATION
    };
    pool.as_bytes()
}

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[char]) -> char {
    pool[rng.random_range(0..pool.len())]
}

fn pick_ascii<R: Rng + ?Sized>(rng: &mut R, pool: &[u8]) -> char {
    char::from(pool[rng.random_range(0..pool.len())])
}

fn swap_case(c: char) -> char {
    let mapped: Vec<char> = if c.is_lowercase() {
        c.to_uppercase().collect()
    } else if c.is_uppercase() {
        c.to_lowercase().collect()
    } else {
        return c;
    };
    // Leave characters whose case mapping expands (e.g. 'ß') untouched.
    match mapped.as_slice() {
        [single] => *single,
        _ => c,
    }
}

/// Rejection-sampling mutator: applies one random [`EditKind`] and keeps the
/// result only if it differs from the input, fully matches the constraint
/// and, when a cache is supplied, has not been seen before.
#[derive(Debug, Clone)]
pub struct RegexMutator {
    constraint: RegexConstraint,
    insert_alphabet: Vec<char>,
    max_retries: u64,
}

impl RegexMutator {
    pub fn new(constraint: RegexConstraint) -> Self {
        Self {
            constraint,
            insert_alphabet: insert_alphabet(DEFAULT_INSERT_SYMBOLS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the symbols allowed for insertion (letters and digits are always
    /// allowed).
    pub fn with_insert_symbols(mut self, symbols: &str) -> Self {
        self.insert_alphabet = insert_alphabet(symbols);
        self
    }

    /// Bounds the number of draws per call; clamped to at least 1.
    pub fn with_max_retries(mut self, max_retries: u64) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn constraint(&self) -> &RegexConstraint {
        &self.constraint
    }

    /// Applies `kind` to `buf` in place. The caller guarantees
    /// `kind.is_applicable(buf.len())`.
    pub fn apply_edit<R: Rng + ?Sized>(&self, buf: &mut Vec<char>, kind: EditKind, rng: &mut R) {
        debug_assert!(kind.is_applicable(buf.len()));
        match kind {
            EditKind::Substitute => {
                let idx = rng.random_range(0..buf.len());
                buf[idx] = pick_ascii(rng, substitution_pool(buf[idx]));
            }
            EditKind::Insert => {
                let c = pick(rng, &self.insert_alphabet);
                let idx = rng.random_range(0..=buf.len());
                buf.insert(idx, c);
            }
            EditKind::Delete => {
                let idx = rng.random_range(0..buf.len());
                buf.remove(idx);
            }
            EditKind::SwapAdjacent => {
                let idx = rng.random_range(0..buf.len() - 1);
                buf.swap(idx, idx + 1);
            }
            EditKind::ToggleCase => {
                let idx = rng.random_range(0..buf.len());
                buf[idx] = swap_case(buf[idx]);
            }
        }
    }
}

fn insert_alphabet(symbols: &str) -> Vec<char> {
    let mut alphabet: Vec<char> = LOWERCASE.chars().chain(UPPERCASE.chars()).collect();
    alphabet.extend(DIGITS.chars());
    for symbol in symbols.chars() {
        if !alphabet.contains(&symbol) {
            alphabet.push(symbol);
        }
    }
    alphabet
}

impl<R: Rng + ?Sized> Mutator<R> for RegexMutator {
    fn mutate(
        &mut self,
        input: &str,
        rng: &mut R,
        seen: Option<&DedupCache>,
    ) -> Result<String, MutationError> {
        let original: Vec<char> = input.chars().collect();

        for _ in 0..self.max_retries {
            let mut buf = original.clone();
            let kind = EditKind::choose(rng, buf.len());
            self.apply_edit(&mut buf, kind, rng);

            // A no-op edit (same-char substitution, case toggle on a digit).
            if buf == original {
                continue;
            }
            let candidate: String = buf.into_iter().collect();
            if !self.constraint.full_match(&candidate) {
                continue;
            }
            if seen.is_some_and(|cache| cache.contains(&candidate)) {
                continue;
            }
            return Ok(candidate);
        }

        Err(MutationError::Infeasible {
            input: input.to_string(),
            retries: self.max_retries,
        })
    }
}
