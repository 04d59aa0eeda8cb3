use argon2::{
    Argon2,
    password_hash::{self, PasswordHasher, PasswordVerifier, SaltString},
};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const PASSWORD_SALT_LEN: usize = 16;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct PasswordHashError(password_hash::Error);

/// A plaintext password as typed by the user. Only ever hashed, never stored.
#[derive(Clone, Eq, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

/// An argon2 hash in PHC string format, salt and parameters included.
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl Password {
    pub fn hash(&self, argon2: &Argon2<'_>) -> Result<PasswordHash, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;

        let hash = argon2
            .hash_password(self.0.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(PasswordHash(hash.to_string()))
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl PasswordHash {
    /// Checks `password` against this hash using the parameters stored in it.
    /// A malformed hash never verifies.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        let Ok(parsed) = password_hash::PasswordHash::new(&self.0) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.0.as_bytes(), &parsed)
            .is_ok()
    }

    #[must_use]
    pub fn as_phc_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordHash").field(&"[redacted]").finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::auth::{Password, PasswordHash};
    use argon2::{Algorithm, Argon2, Params, Version};

    fn cheap_argon2() -> Argon2<'static> {
        Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None).unwrap(),
        )
    }

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = Password::from("Password1").hash(&cheap_argon2()).unwrap();

        assert!(hash.verify(&Password::from("Password1")));
        assert!(!hash.verify(&Password::from("password1")));
        assert!(!hash.verify(&Password::from("")));
    }

    #[test]
    fn hashes_are_salted() {
        let argon2 = cheap_argon2();
        let first = Password::from("same").hash(&argon2).unwrap();
        let second = Password::from("same").hash(&argon2).unwrap();

        assert_ne!(first, second);
        assert!(first.as_phc_str().starts_with("$argon2id$"));
        assert!(!first.as_phc_str().contains("same"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hash: PasswordHash = serde_json::from_str("\"password123\"").unwrap();
        assert!(!hash.verify(&Password::from("password123")));
    }

    #[test]
    fn debug_output_is_redacted() {
        let debug = format!("{:?}", Password::from("hunter2"));
        assert!(!debug.contains("hunter2"));
    }
}
