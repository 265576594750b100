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
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Lockbridge Relayer Crate
//!
//! A one-way token bridge relayer. The relayer watches a bridge contract on a
//! source chain for `TokensLocked` events, signs an authorization binding the
//! recipient, amount and sequence number of each lock, and submits a matching
//! `releaseTokens` transaction to the bridge contract on a destination chain.
//!
//! ## Overview
//!
//! The relayer is a single long-running loop built from a few small pieces:
//!
//!   1. An event watcher polling the source chain for new lock events,
//!      bounded by a durable block checkpoint.
//!   2. An authorization signer producing the ECDSA signature the destination
//!      bridge verifies before releasing funds.
//!   3. A release submitter driving every lock event to a terminal status on
//!      the destination chain and classifying every failure.
//!
//! The destination contract refuses to consume the same sequence number
//! twice, so the relayer is safe to restart from an older checkpoint at any
//! time; re-submitted releases come back as benign rejections.

/// A module for the configuration file surface of the relayer.
pub mod config;
/// A module for managing the context of the relayer.
pub mod context;
/// Typed bindings for the two bridge contracts.
pub mod contracts;
/// A module for the errors the relayer can encounter, and their severity.
pub mod error;
/// A module that listens for lock events on the source chain.
pub mod events_watcher;
/// A module used for debugging relayer lifecycle, sync state, or other relayer state.
pub mod probe;
/// A module for starting the long-running relayer service.
pub mod service;
/// A module holding the authority key and producing release authorizations.
pub mod signer;
/// A module for managing the storage of the relayer.
pub mod store;
/// A module submitting release transactions to the destination chain.
pub mod tx_relay;

pub use error::{Error, Result};
