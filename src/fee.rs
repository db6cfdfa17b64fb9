// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Platform fee rules and fee computation.
//!
//! The fee rule is loaded from configuration once and shared read-only; fee
//! computation itself is a pure function of `(amount, rule)`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::TransferError;

/// How the platform fee is computed for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeeRule {
    /// A flat fee in whole-token units, independent of the amount.
    Fixed { value: f64 },
    /// A proportional fee (`amount * value`), optionally floored at `min`.
    Ratio {
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
    },
}

/// Compute the platform fee for a transfer of `amount` whole tokens.
///
/// The amount must be strictly positive and finite; so must the resulting
/// fee. Callers add `amount + fee` and compare against the sender's balance
/// *before* building a transaction, to avoid a doomed round trip.
pub fn compute_fee(amount: f64, rule: &FeeRule) -> Result<f64, TransferError> {
    validate_amount(amount)?;

    let fee = match rule {
        FeeRule::Fixed { value } => *value,
        FeeRule::Ratio { value, min } => {
            let proportional = amount * value;
            match min {
                Some(min) => proportional.max(*min),
                None => proportional,
            }
        }
    };

    if !fee.is_finite() || fee <= 0.0 {
        return Err(TransferError::InvalidAmount(format!(
            "computed fee must be positive, got {fee}"
        )));
    }
    Ok(fee)
}

/// Reject non-positive or non-finite transfer amounts.
pub fn validate_amount(amount: f64) -> Result<(), TransferError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(TransferError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_rule_ignores_amount() {
        let rule = FeeRule::Fixed { value: 2.0 };
        assert_eq!(compute_fee(1.0, &rule).unwrap(), 2.0);
        assert_eq!(compute_fee(1_000_000.0, &rule).unwrap(), 2.0);
    }

    #[test]
    fn ratio_rule_applies_minimum() {
        let rule = FeeRule::Ratio {
            value: 0.01,
            min: Some(0.5),
        };
        // 10 * 0.01 = 0.1, floored to 0.5.
        assert_eq!(compute_fee(10.0, &rule).unwrap(), 0.5);
        // 1000 * 0.01 = 10.0, above the floor.
        assert_eq!(compute_fee(1000.0, &rule).unwrap(), 10.0);
    }

    #[test]
    fn ratio_rule_without_minimum() {
        let rule = FeeRule::Ratio {
            value: 0.01,
            min: None,
        };
        assert_eq!(compute_fee(1000.0, &rule).unwrap(), 10.0);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let rule = FeeRule::Fixed { value: 2.0 };
        assert!(matches!(
            compute_fee(0.0, &rule),
            Err(TransferError::InvalidAmount(_))
        ));
        assert!(compute_fee(-5.0, &rule).is_err());
        assert!(compute_fee(f64::NAN, &rule).is_err());
        assert!(compute_fee(f64::INFINITY, &rule).is_err());
    }

    #[test]
    fn zero_fee_rule_is_rejected() {
        // A misconfigured Fixed(0) must not silently allow free transfers.
        let rule = FeeRule::Fixed { value: 0.0 };
        assert!(compute_fee(10.0, &rule).is_err());
    }

    #[test]
    fn serde_matches_config_shape() {
        let rule: FeeRule = serde_json::from_str(r#"{"type":"fixed","value":0.5}"#).unwrap();
        assert_eq!(rule, FeeRule::Fixed { value: 0.5 });

        let rule: FeeRule =
            serde_json::from_str(r#"{"type":"ratio","value":0.01,"min":0.5}"#).unwrap();
        assert_eq!(
            rule,
            FeeRule::Ratio {
                value: 0.01,
                min: Some(0.5)
            }
        );

        let json = serde_json::to_string(&FeeRule::Ratio {
            value: 0.02,
            min: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"ratio","value":0.02}"#);
    }
}
