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
//! # Relayer Store Module
//!
//! A module for managing the storage of the relayer: the durable block
//! checkpoint bounding the scan window, and the in-memory record of the
//! sequences released during the current run.

use ethers::types::{U256, U64};

/// A module for the durable, file-backed block checkpoint.
pub mod file;
/// A module for managing in-memory storage of the relayer.
pub mod mem;

/// HistoryStore is a simple trait for storing and retrieving the last
/// fully-processed source block number.
///
/// The caller promises to store a block number only once every lock event at
/// or below it has reached a terminal status on the destination chain. The
/// stored value is therefore monotonically non-decreasing for the lifetime
/// of the relayer.
pub trait HistoryStore: Clone + Send + Sync {
    /// Sets the new last scanned block number and returns the old one.
    fn set_last_block_number(&self, block_number: U64) -> crate::Result<U64>;
    /// Gets the last scanned block number.
    /// If none was ever stored, returns the `default_block_number`.
    fn get_last_block_number(
        &self,
        default_block_number: U64,
    ) -> crate::Result<U64>;
}

/// A record of the sequence numbers already driven to a terminal status
/// during the current run.
///
/// This is an optimization only; the destination contract is the authority
/// on consumed sequences and rejects any replay, so the record does not
/// survive restarts.
pub trait ProcessedSequenceStore: Send + Sync {
    /// Marks the sequence as released (or found already consumed).
    fn mark_sequence_processed(&self, sequence: U256) -> crate::Result<()>;
    /// Whether the sequence was already handled during this run.
    fn is_sequence_processed(&self, sequence: U256) -> crate::Result<bool>;
}
