// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password verifiers.
//!
//! Hashes are PBKDF2-HMAC-SHA256 (ring) with a random 16-byte salt,
//! encoded as:
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<base64 salt>$<base64 hash>
//! ```
//!
//! The iteration count is read back from the encoded value, so raising the
//! configured cost only affects new hashes.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Default PBKDF2 rounds.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("system random generator failed")]
    Rng,
}

/// Hashes and verifies passwords.
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
    /// Verified against when the username is unknown, so both failure
    /// paths cost one PBKDF2 run.
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Result<Self, PasswordError> {
        let iterations = NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN);
        let mut hasher = Self {
            iterations,
            rng: SystemRandom::new(),
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash("dummy password")?;
        Ok(hasher)
    }

    /// Produce an encoded verifier for `password`.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| PasswordError::Rng)?;

        let mut derived = [0u8; HASH_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut derived,
        );

        Ok(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            Base64::encode_string(&salt),
            Base64::encode_string(&derived)
        ))
    }

    /// Constant-time check of `password` against an encoded verifier.
    ///
    /// A malformed verifier never matches.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Some((iterations, salt, expected)) = decode(encoded) else {
            tracing::warn!("Stored password hash is malformed");
            return false;
        };

        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            &salt,
            password.as_bytes(),
            &expected,
        )
        .is_ok()
    }

    /// Burn one verification so an unknown username takes as long as a
    /// wrong password.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

fn decode(encoded: &str) -> Option<(NonZeroU32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations = parts.next()?.parse::<u32>().ok().and_then(NonZeroU32::new)?;
    let salt = Base64::decode_vec(parts.next()?).ok()?;
    let hash = Base64::decode_vec(parts.next()?).ok()?;
    if parts.next().is_some() || hash.is_empty() {
        return None;
    }
    Some((iterations, salt, hash))
}
