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
use std::fs;
use std::io;
use std::path::PathBuf;

use ethers::types::U64;

use super::HistoryStore;
use crate::error::Error;

/// A block checkpoint persisted as a single decimal number in a plain text
/// file, so an operator can read or pre-seed it with any editor.
///
/// Writes go to a temporary file in the same directory followed by a rename,
/// so a crash leaves either the old checkpoint or the new one, never a torn
/// write.
#[derive(Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl std::fmt::Debug for FileCheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCheckpointStore")
            .field("path", &self.path)
            .finish()
    }
}

impl FileCheckpointStore {
    /// Creates a checkpoint store at the given path. The file itself is
    /// created on the first store.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl HistoryStore for FileCheckpointStore {
    #[tracing::instrument(skip(self))]
    fn get_last_block_number(
        &self,
        default_block_number: U64,
    ) -> crate::Result<U64> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            // a missing file means the relayer never ran here before.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(default_block_number)
            }
            Err(e) => return Err(e.into()),
        };
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Ok(default_block_number);
        }
        let block = trimmed.parse::<u64>().map_err(|_| {
            Error::Generic("checkpoint file is not a decimal block number")
        })?;
        Ok(U64::from(block))
    }

    #[tracing::instrument(skip(self))]
    fn set_last_block_number(&self, block_number: U64) -> crate::Result<U64> {
        let old = self.get_last_block_number(block_number)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, format!("{}\n", block_number.as_u64()))?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(old)
    }
}
