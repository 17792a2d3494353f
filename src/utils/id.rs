/// Random identifier generation
///
/// Ids are sampled uniformly from a fixed alphabet. There is no uniqueness
/// guarantee: callers that need one must check for collisions themselves.
use rand::Rng;

use crate::error::{Error, Result};

/// Digits, used alone for numeric ids
pub const NUMBER_CHARACTERS: &[u8] = b"0123456789";

/// Upper and lower case ASCII letters
pub const ALPHABET_CHARACTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length used when the caller has no preference
pub const DEFAULT_ID_LENGTH: usize = 8;

/// Pick one character uniformly from `characters`
fn random_character<R: Rng + ?Sized>(rng: &mut R, characters: &[u8]) -> char {
    characters[rng.gen_range(0..characters.len())] as char
}

/// Generate a random id using the thread-local RNG
///
/// `length` accepts any integer type; zero, negative, or oversized values
/// are rejected with [`Error::InvalidArgument`].
pub fn generate_id<L>(length: L, only_number: bool) -> Result<String>
where
    L: TryInto<usize>,
{
    generate_id_with(&mut rand::thread_rng(), length, only_number)
}

/// Generate a random id from an injected RNG
///
/// Numeric ids never start with `0`. Alphanumeric ids draw every character,
/// the first included, from letters followed by digits.
pub fn generate_id_with<R, L>(rng: &mut R, length: L, only_number: bool) -> Result<String>
where
    R: Rng + ?Sized,
    L: TryInto<usize>,
{
    let length = match length.try_into() {
        Ok(len) if len > 0 => len,
        _ => return Err(Error::invalid("Length must be a positive number.")),
    };

    let characters: Vec<u8> = if only_number {
        NUMBER_CHARACTERS.to_vec()
    } else {
        [ALPHABET_CHARACTERS, NUMBER_CHARACTERS].concat()
    };

    let mut id = String::with_capacity(length);
    if only_number {
        // 1-9 for the leading digit
        id.push(random_character(rng, &NUMBER_CHARACTERS[1..]));
    } else {
        id.push(random_character(rng, &characters));
    }

    for _ in 1..length {
        id.push(random_character(rng, &characters));
    }

    Ok(id)
}
