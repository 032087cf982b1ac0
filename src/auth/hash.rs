// Credential hashing for the OpenList/AList login exchange

use sha2::{Digest, Sha256};

/// Literal appended to the password before hashing, fixed by the server's login protocol
const HASH_SUFFIX: &str = "-https://github.com/alist-org/alist";

/// Characters of a hash that may appear in logs
const MASKED_PREFIX_LEN: usize = 10;

/// Hash a plaintext password into the credential sent to `/api/auth/login/hash`
///
/// Returns 64 lowercase hex characters.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(HASH_SUFFIX.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Short, log-safe form of a credential hash
pub fn mask_hash(hash: &str) -> String {
    let prefix: String = hash.chars().take(MASKED_PREFIX_LEN).collect();
    format!("{}***", prefix)
}
