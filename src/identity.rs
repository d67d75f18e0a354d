//! Username acquisition.
//!
//! The username is generated once and persisted under `chatUsername`, so every
//! later start reuses it.

use rand::{Rng, TryRngCore};
use tracing::info;

use crate::storage::{KeyValueStore, StorageError};

pub const USERNAME_KEY: &str = "chatUsername";

const USERNAME_PREFIX: &str = "User-";
const UUID_TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";

/// Load the stored username, generating and persisting one if absent.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn acquire_username(store: &dyn KeyValueStore) -> Result<String, StorageError> {
    let username = match store.get(USERNAME_KEY)? {
        Some(stored) if !stored.is_empty() => stored,
        _ => {
            let generated = generate_username();
            info!(username = %generated, "generated new username");
            generated
        }
    };
    store.set(USERNAME_KEY, &username)?;
    Ok(username)
}

/// `User-` plus the first 8 characters of a random UUID.
#[must_use]
pub fn generate_username() -> String {
    username_from_token(&random_token())
}

fn username_from_token(token: &str) -> String {
    let short: String = token.chars().take(8).collect();
    format!("{USERNAME_PREFIX}{short}")
}

/// A random UUID v4 string. Falls back to the thread RNG if the OS source fails.
fn random_token() -> String {
    let mut bytes = [0u8; 16];
    if getrandom_bytes(&mut bytes) {
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    } else {
        fallback_token(&mut rand::rng())
    }
}

fn getrandom_bytes(buf: &mut [u8]) -> bool {
    rand::rngs::OsRng.try_fill_bytes(buf).is_ok()
}

/// UUID-shaped token from an arbitrary RNG: `x` is any hex digit, `y` is `8..=b`.
pub(crate) fn fallback_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    UUID_TEMPLATE
        .chars()
        .map(|c| match c {
            'x' => hex_digit(rng.random_range(0..16)),
            'y' => hex_digit(rng.random_range(0..4) | 0x8),
            other => other,
        })
        .collect()
}

fn hex_digit(v: u32) -> char {
    char::from_digit(v, 16).unwrap_or('0')
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
