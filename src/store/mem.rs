// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
use std::collections::HashSet;
use std::sync::Arc;

use ethers::types::{U256, U64};
use parking_lot::RwLock;

use super::{HistoryStore, ProcessedSequenceStore};

/// InMemoryStore keeps the processed-sequence record of the current run, and
/// doubles as a throwaway checkpoint store in tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    last_block_number: Arc<RwLock<Option<U64>>>,
    processed_sequences: Arc<RwLock<HashSet<U256>>>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish()
    }
}

impl HistoryStore for InMemoryStore {
    #[tracing::instrument(skip(self))]
    fn get_last_block_number(
        &self,
        default_block_number: U64,
    ) -> crate::Result<U64> {
        let guard = self.last_block_number.read();
        Ok(guard.unwrap_or(default_block_number))
    }

    #[tracing::instrument(skip(self))]
    fn set_last_block_number(&self, block_number: U64) -> crate::Result<U64> {
        let mut guard = self.last_block_number.write();
        let old = guard.replace(block_number);
        Ok(old.unwrap_or(block_number))
    }
}

impl ProcessedSequenceStore for InMemoryStore {
    #[tracing::instrument(skip(self))]
    fn mark_sequence_processed(&self, sequence: U256) -> crate::Result<()> {
        let mut guard = self.processed_sequences.write();
        guard.insert(sequence);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn is_sequence_processed(&self, sequence: U256) -> crate::Result<bool> {
        let guard = self.processed_sequences.read();
        Ok(guard.contains(&sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_sequences_are_not_processed() {
        let store = InMemoryStore::default();
        assert!(!store.is_sequence_processed(U256::from(7)).unwrap());
        store.mark_sequence_processed(U256::from(7)).unwrap();
        assert!(store.is_sequence_processed(U256::from(7)).unwrap());
        assert!(!store.is_sequence_processed(U256::from(8)).unwrap());
    }

    #[test]
    fn marking_twice_is_harmless() {
        let store = InMemoryStore::default();
        store.mark_sequence_processed(U256::from(1)).unwrap();
        store.mark_sequence_processed(U256::from(1)).unwrap();
        assert!(store.is_sequence_processed(U256::from(1)).unwrap());
    }

    #[test]
    fn last_block_defaults_until_set() {
        let store = InMemoryStore::default();
        assert_eq!(
            store.get_last_block_number(U64::from(100)).unwrap(),
            U64::from(100),
        );
        store.set_last_block_number(U64::from(101)).unwrap();
        assert_eq!(
            store.get_last_block_number(U64::from(100)).unwrap(),
            U64::from(101),
        );
    }

    #[test]
    fn clones_share_the_same_record() {
        let store = InMemoryStore::default();
        let clone = store.clone();
        clone.mark_sequence_processed(U256::from(3)).unwrap();
        assert!(store.is_sequence_processed(U256::from(3)).unwrap());
    }
}
