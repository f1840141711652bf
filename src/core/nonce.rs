//! CSRF-style action tokens.
//!
//! A token is an HMAC-SHA256 over the action name and a time tick. The tick
//! advances every half lifetime and a token is accepted for its own tick and
//! the one before, so a token lives between one half and one full lifetime.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Action guarding the extension status check.
pub const STATUS_ACTION: &str = "extension_status";

/// Action guarding required-extension installs.
pub const INSTALL_ACTION: &str = "install_extension";

/// Action guarding the self-update trigger.
pub const SELF_UPDATE_ACTION: &str = "self_update";

/// Issues and verifies action tokens.
#[derive(Clone)]
pub struct NonceManager {
    secret: Vec<u8>,
    lifetime: Duration,
}

impl std::fmt::Debug for NonceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceManager").field("lifetime", &self.lifetime).finish()
    }
}

impl NonceManager {
    /// Default token lifetime (one day).
    pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(86_400);

    pub fn new(secret: impl Into<Vec<u8>>, lifetime: Duration) -> Self {
        let lifetime = if lifetime < Duration::from_secs(2) { Self::DEFAULT_LIFETIME } else { lifetime };
        Self { secret: secret.into(), lifetime }
    }

    fn tick_at(&self, unix_secs: u64) -> u64 {
        unix_secs / (self.lifetime.as_secs() / 2)
    }

    fn now() -> u64 {
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }

    fn mac(&self, action: &str, tick: u64) -> HmacSha256 {
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC accepts keys of any size"),
        };
        mac.update(action.as_bytes());
        mac.update(b"|");
        mac.update(tick.to_string().as_bytes());
        mac
    }

    fn token_for(&self, action: &str, tick: u64) -> String {
        let bytes = self.mac(action, tick).finalize().into_bytes();
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Issue a token for `action`.
    pub fn create(&self, action: &str) -> String {
        self.create_at(action, Self::now())
    }

    /// Issue a token for `action` as of `unix_secs`.
    pub fn create_at(&self, action: &str, unix_secs: u64) -> String {
        self.token_for(action, self.tick_at(unix_secs))
    }

    /// Check a token for `action`.
    pub fn verify(&self, token: &str, action: &str) -> bool {
        self.verify_at(token, action, Self::now())
    }

    /// Check a token for `action` as of `unix_secs`.
    pub fn verify_at(&self, token: &str, action: &str, unix_secs: u64) -> bool {
        let Some(bytes) = decode_hex(token) else {
            return false;
        };

        let tick = self.tick_at(unix_secs);
        [tick, tick.saturating_sub(1)]
            .into_iter()
            .any(|t| self.mac(action, t).verify_slice(&bytes).is_ok())
    }
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok()).collect()
}
