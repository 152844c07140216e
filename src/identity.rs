//! Anonymous client identity for usage accounting.
//!
//! The id identifies a device/profile to the rate limiter only; it is never
//! used for authentication. Once persisted it is reused for every request,
//! logged in or not.

use rand::Rng;

use crate::storage::{CLIENT_ID_KEY, SharedStore};

const UUID_TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

#[derive(Clone)]
pub struct ClientIdentity {
    storage: SharedStore,
}

impl ClientIdentity {
    #[must_use]
    pub fn new(storage: SharedStore) -> Self {
        Self { storage }
    }

    /// Return the persisted client id, creating and storing one on first use.
    ///
    /// Without persistent storage a fresh id is generated on every call.
    #[must_use]
    pub fn get_or_create(&self) -> String {
        let Some(storage) = &self.storage else {
            return generate_uuid();
        };
        if let Some(existing) = storage.get(CLIENT_ID_KEY).filter(|id| !id.is_empty()) {
            return existing;
        }
        let id = generate_uuid();
        if let Err(e) = storage.set(CLIENT_ID_KEY, &id) {
            tracing::warn!(error = %e, "failed to persist client id");
        }
        id
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }
}

/// Generate a UUID-v4-shaped string, one random nibble per hex digit.
///
/// The version nibble is fixed to `4` and the variant nibble to `8..=b`.
#[must_use]
pub fn generate_uuid() -> String {
    let mut rng = rand::rng();
    UUID_TEMPLATE
        .chars()
        .map(|c| match c {
            'x' => char::from(HEX_DIGITS[rng.random_range(0..16)]),
            'y' => char::from(HEX_DIGITS[(rng.random_range(0..16) & 0x3) | 0x8]),
            other => other,
        })
        .collect()
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
