//! Storage key layout.
//!
//! | Record | Key |
//! |--------|-----|
//! | product state | `{origin}\|{handle}\|{destination}` |
//! | legacy product state | `{origin}\|{handle}` |
//! | access state | `access\|{origin}\|{destination}` |
//! | catalog index | `index\|{origin}\|{destination}` |

use std::fmt;

use stockwatch_core::{ProductHandle, StorefrontOrigin};

/// Identity of one product as tracked into one destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub origin: StorefrontOrigin,
    pub handle: ProductHandle,
    pub destination: String,
}

impl ProductKey {
    #[must_use]
    pub fn new(origin: &StorefrontOrigin, handle: &ProductHandle, destination: &str) -> Self {
        Self {
            origin: origin.clone(),
            handle: handle.clone(),
            destination: destination.to_owned(),
        }
    }

    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}|{}|{}", self.origin, self.handle, self.destination)
    }

    /// Key used before state was scoped per destination.
    #[must_use]
    pub fn legacy_storage_key(&self) -> String {
        format!("{}|{}", self.origin, self.handle)
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

#[must_use]
pub fn access_key(origin: &StorefrontOrigin, destination: &str) -> String {
    format!("access|{origin}|{destination}")
}

#[must_use]
pub fn index_key(origin: &StorefrontOrigin, destination: &str) -> String {
    format!("index|{origin}|{destination}")
}
