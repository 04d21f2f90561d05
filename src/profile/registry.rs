//! Profile registry — one record per id, kept in registration order.
//!
//! Backed by a fixed-capacity `heapless::Vec`: the id space is `u8`, so
//! 256 slots always suffice once duplicates are replaced.

use std::sync::{Arc, PoisonError, RwLock};

use heapless::Vec;
use log::debug;

use super::Profile;

/// One slot per possible profile id.
pub const MAX_PROFILES: usize = 256;

#[derive(Default)]
pub struct Registry {
    profiles: RwLock<Vec<Arc<Profile>, MAX_PROFILES>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `profile`, replacing any record with the same id.
    ///
    /// The replaced record (if any) is returned; the new record moves to
    /// the end of the registration order.
    pub fn upsert(&self, profile: Arc<Profile>) -> Option<Arc<Profile>> {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = profiles
            .iter()
            .position(|p| p.id() == profile.id())
            .map(|idx| profiles.remove(idx));

        debug!(
            "registry: upsert profile {} ({})",
            profile.id(),
            if replaced.is_some() { "replaced" } else { "new" }
        );

        if profiles.push(profile).is_err() {
            unreachable!("registry corrupted: more than {MAX_PROFILES} distinct u8 ids");
        }
        replaced
    }

    pub fn get(&self, id: u8) -> Option<Arc<Profile>> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    /// Snapshot of every record in registration order.
    pub fn all(&self) -> std::vec::Vec<Arc<Profile>> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn remove(&self, id: u8) -> Option<Arc<Profile>> {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        let idx = profiles.iter().position(|p| p.id() == id)?;
        Some(profiles.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.profiles.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
