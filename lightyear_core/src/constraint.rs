use crate::error::ConfigError;
use regex::Regex;
use std::fmt;

/// A compiled password format that candidates must match in full.
///
/// The user-supplied pattern is kept for display; matching goes through an
/// anchored copy so that a substring match never counts.
#[derive(Clone)]
pub struct RegexConstraint {
    pattern: String,
    anchored: Regex,
}

impl RegexConstraint {
    /// Compiles `pattern`, failing with [`ConfigError::InvalidPattern`] when it
    /// is not a valid regular expression.
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        };
        Regex::new(pattern).map_err(invalid)?;

        // In verbose mode a trailing `# comment` runs to the end of the line
        // and would swallow the closing anchor, so end it with a newline.
        let anchored = Regex::new(&format!("^(?:{pattern})$"))
            .or_else(|_| Regex::new(&format!("^(?:{pattern}\n)$")))
            .map_err(invalid)?;
        Ok(Self {
            pattern: pattern.to_string(),
            anchored,
        })
    }

    /// Returns `true` iff the whole of `candidate` matches the pattern.
    pub fn full_match(&self, candidate: &str) -> bool {
        self.anchored.is_match(candidate)
    }

    /// Checks that the seed password satisfies the constraint.
    pub fn validate_seed(&self, seed: &str) -> Result<(), ConfigError> {
        if self.full_match(seed) {
            Ok(())
        } else {
            Err(ConfigError::SeedMismatch {
                seed: seed.to_string(),
                pattern: self.pattern.clone(),
            })
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for RegexConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexConstraint")
            .field(&self.pattern)
            .finish()
    }
}
