use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;

/// Stored credentials for one username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// base64 salt
    #[serde(default)]
    pub salt: String,
    /// hex sha256(salt + password)
    pub password_hash: String,
}

impl UserRecord {
    /// Fresh record with a random salt.
    pub fn new(password: &str) -> Self {
        let salt = gen_salt();
        let password_hash = hash_password(password, &salt);
        Self { salt, password_hash }
    }

    pub fn verify(&self, password: &str) -> bool {
        hash_password(password, &self.salt) == self.password_hash
    }
}

/// 16 random bytes, base64-encoded.
pub fn gen_salt() -> String {
    let mut bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Lowercase hex SHA-256 of `salt ‖ password`.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
