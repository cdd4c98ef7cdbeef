//! Random password generation for new vault items.

use rand::{rngs::OsRng, seq::SliceRandom, CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};

use keyward_common::{Error, Result, SensitiveString};

/// Length used when none is given.
pub const DEFAULT_PASSWORD_LENGTH: usize = 20;

/// Longest password the generator will produce.
pub const MAX_PASSWORD_LENGTH: usize = 256;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+[]{};:,.<>?";

/// Character classes a generated password draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharsetConfig {
    pub lowercase: bool,
    pub uppercase: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for CharsetConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            uppercase: true,
            digits: true,
            symbols: true,
        }
    }
}

impl CharsetConfig {
    /// Enabled classes, in a fixed order.
    fn classes(&self) -> Vec<&'static [u8]> {
        [
            (self.lowercase, LOWERCASE),
            (self.uppercase, UPPERCASE),
            (self.digits, DIGITS),
            (self.symbols, SYMBOLS),
        ]
        .into_iter()
        .filter_map(|(on, set)| on.then_some(set))
        .collect()
    }
}

/// Generate a password from the OS random source.
///
/// # Errors
/// See [`generate_password_with_rng`].
pub fn generate_password(length: usize, charset: &CharsetConfig) -> Result<SensitiveString> {
    generate_password_with_rng(length, charset, &mut OsRng)
}

/// Generate a password drawing randomness from `rng`.
///
/// # Postconditions
/// - Exactly `length` ASCII characters
/// - At least one character from every enabled class
///
/// # Errors
/// - `InvalidInput` if no class is enabled
/// - `InvalidInput` if `length` is shorter than the number of enabled
///   classes or longer than [`MAX_PASSWORD_LENGTH`]
pub fn generate_password_with_rng<R>(
    length: usize,
    charset: &CharsetConfig,
    rng: &mut R,
) -> Result<SensitiveString>
where
    R: RngCore + CryptoRng,
{
    let classes = charset.classes();
    if classes.is_empty() {
        return Err(Error::InvalidInput(
            "At least one character class must be enabled".to_string(),
        ));
    }
    if length < classes.len() || length > MAX_PASSWORD_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Password length must be between {} and {}",
            classes.len(),
            MAX_PASSWORD_LENGTH
        )));
    }

    let pool: Vec<u8> = classes.iter().flat_map(|set| set.iter().copied()).collect();

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|set| set[rng.gen_range(0..set.len())])
        .collect();
    while chars.len() < length {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }
    chars.shuffle(rng);

    // Every byte comes from an ASCII table.
    let password: String = chars.iter().map(|&b| b as char).collect();
    Ok(SensitiveString::from(password))
}
