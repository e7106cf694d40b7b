//! Password and passphrase generation, plus a rough strength estimate.
//!
//! These are pure helpers used by the CLI before `add`/`edit`; the vault
//! itself never judges password strength. All randomness comes from the
//! thread-local CSPRNG.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::errors::{Result, VaultError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

pub const MIN_WORD_COUNT: usize = 3;
pub const MAX_WORD_COUNT: usize = 12;
pub const DEFAULT_WORD_COUNT: usize = 4;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
pub const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+[]{}|;:,.<>?";

/// Characters dropped by `exclude_ambiguous`.
const AMBIGUOUS: &[u8] = b"loIO01";

const WORDS: &[&str] = &[
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
    "uniform", "victor", "whiskey", "xray", "yankee", "zulu", "cloud", "forest", "mountain",
    "river", "ocean", "desert", "valley", "canyon", "island", "glacier", "tiger", "eagle", "wolf",
    "bear", "lion", "hawk", "phoenix", "dragon", "falcon", "panther", "cobra", "viper", "harbor",
    "meadow", "ember", "comet", "lantern", "granite", "willow", "summit", "thunder", "prairie",
    "orchid", "cedar", "quartz", "saddle", "beacon", "tundra",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which character classes to draw from.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub length: usize,
    pub lowercase: bool,
    pub uppercase: bool,
    pub digits: bool,
    pub symbols: bool,
    /// Skip look-alike characters such as `l`, `1`, `O` and `0`.
    pub exclude_ambiguous: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: DEFAULT_PASSWORD_LENGTH,
            lowercase: true,
            uppercase: true,
            digits: true,
            symbols: true,
            exclude_ambiguous: false,
        }
    }
}

/// Result of `estimate_strength`. `score` is 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strength {
    pub label: &'static str,
    pub score: u8,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate a random password.
///
/// At least one character from each enabled class is guaranteed; the
/// rest are drawn from the combined pool and the result is shuffled.
pub fn generate(options: &GeneratorOptions) -> Result<String> {
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&options.length) {
        return Err(VaultError::GeneratorError(format!(
            "length must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH}, got {}",
            options.length
        )));
    }

    let classes = [
        (options.lowercase, LOWERCASE),
        (options.uppercase, UPPERCASE),
        (options.digits, DIGITS),
        (options.symbols, SYMBOLS),
    ];

    let mut rng = rand::rng();
    let mut pool: Vec<u8> = Vec::new();
    let mut chars: Vec<u8> = Vec::with_capacity(options.length);

    for (enabled, class) in classes {
        if !enabled {
            continue;
        }
        let allowed: Vec<u8> = class
            .iter()
            .copied()
            .filter(|c| !(options.exclude_ambiguous && AMBIGUOUS.contains(c)))
            .collect();
        chars.push(allowed[rng.random_range(0..allowed.len())]);
        pool.extend_from_slice(&allowed);
    }

    if pool.is_empty() {
        return Err(VaultError::GeneratorError(
            "at least one character class must be enabled".into(),
        ));
    }

    while chars.len() < options.length {
        chars.push(pool[rng.random_range(0..pool.len())]);
    }
    chars.shuffle(&mut rng);

    String::from_utf8(chars).map_err(|e| VaultError::GeneratorError(e.to_string()))
}

/// Generate a passphrase of `word_count` words joined by `separator`.
pub fn generate_passphrase(word_count: usize, separator: &str) -> Result<String> {
    if !(MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&word_count) {
        return Err(VaultError::GeneratorError(format!(
            "word count must be between {MIN_WORD_COUNT} and {MAX_WORD_COUNT}, got {word_count}"
        )));
    }

    let mut rng = rand::rng();
    let words: Vec<&str> = (0..word_count)
        .map(|_| WORDS[rng.random_range(0..WORDS.len())])
        .collect();
    Ok(words.join(separator))
}

/// Heuristic score: length (up to 30), class variety (10 per class),
/// and share of distinct characters (up to 30).
pub fn estimate_strength(password: &str) -> Strength {
    let length = password.chars().count();

    let length_score = (length * 2).min(30);

    let has_lower = password.chars().any(char::is_lowercase);
    let has_upper = password.chars().any(char::is_uppercase);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.bytes().any(|b| SYMBOLS.contains(&b));
    let variety_score = [has_lower, has_upper, has_digit, has_symbol]
        .iter()
        .filter(|&&present| present)
        .count()
        * 10;

    let uniqueness_score = if length == 0 {
        0
    } else {
        let mut distinct: Vec<char> = password.chars().collect();
        distinct.sort_unstable();
        distinct.dedup();
        distinct.len() * 30 / length
    };

    let score = (length_score + variety_score + uniqueness_score).min(100);
    let label = if score >= 80 {
        "Strong"
    } else if score >= 60 {
        "Good"
    } else if score >= 40 {
        "Fair"
    } else {
        "Weak"
    };

    Strength {
        label,
        score: u8::try_from(score).unwrap_or(100),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
