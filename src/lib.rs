// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Solstice Relay - Fee-Sponsored SPL Token Transfer Service
//!
//! This crate implements gasless token transfers: users hold their own keys
//! in a password-protected vault and sign transfers locally, while a relay
//! service co-signs as fee payer and covers network fees, collecting a
//! platform fee in the transferred token instead.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `vault` - Password-protected key storage (PBKDF2 + AES-GCM)
//! - `address` - Address parsing and token sub-account derivation
//! - `fee` - Platform fee rules
//! - `transaction` - Transaction types and the transfer builder
//! - `signer` - Owner-side signing
//! - `relay` - Validation, co-signing and submission
//! - `ledger` - Ledger JSON-RPC client
//! - `storage` - Transaction records and key blobs on disk

pub mod address;
pub mod api;
pub mod config;
pub mod error;
pub mod fee;
pub mod ledger;
pub mod models;
pub mod relay;
pub mod signer;
pub mod state;
pub mod storage;
pub mod transaction;
pub mod vault;
