// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

use std::path::PathBuf;
use std::sync::Arc;

use crate::address::Address;
use crate::fee::FeeRule;
use crate::ledger::LedgerClient;
use crate::relay::FeeRelay;
use crate::storage::records::TransactionRepository;

/// Shared application state. Everything here is constructed once at startup
/// and read-only afterwards; concurrent requests never contend on locks.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<FeeRelay>,
    pub ledger: Arc<dyn LedgerClient>,
    pub records: Arc<TransactionRepository>,
    pub fee_rule: FeeRule,
    pub mint: Address,
    pub decimals: u8,
    pub data_dir: PathBuf,
}
