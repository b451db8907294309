use std::collections::HashMap;

use super::identity::{IdentityId, IdentityProfile};
use crate::shared::constants::UNKNOWN_LABEL;

/// In-memory id → label map mirroring the store's writes.
#[derive(Debug, Default)]
pub struct DisplayNameCache {
    names: HashMap<IdentityId, String>,
}

impl DisplayNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: IdentityId, profile: &IdentityProfile) {
        self.names.insert(id, profile.display_name());
    }

    pub fn get(&self, id: IdentityId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
