// Authentication module
// Credential hashing, token store and login lifecycle

mod hash;
mod manager;
mod types;

pub use hash::{hash_password, mask_hash};
pub use manager::{AuthManager, LOGIN_PATH, REFRESH_RATIO, TOKEN_LIFETIME_HOURS};
pub use types::{Credentials, SessionToken};
