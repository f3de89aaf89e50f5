use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::record::Amount;

const BASIS_POINTS_PER_UNIT: i128 = 10_000;

/// Allowed difference between the absolute amounts of a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmountTolerance {
    /// Fixed slack in cents.
    Absolute { cents: i64 },
    /// Slack proportional to the source's absolute amount.
    Relative {
        #[serde(rename = "basisPoints")]
        basis_points: u32,
    },
}

impl AmountTolerance {
    /// Whether `delta_cents` (already absolute) is within tolerance for a
    /// source of amount `source`. Boundary values are accepted.
    pub fn accepts(&self, source: Amount, delta_cents: i64) -> bool {
        match *self {
            AmountTolerance::Absolute { cents } => delta_cents <= cents,
            AmountTolerance::Relative { basis_points } => {
                i128::from(delta_cents) * BASIS_POINTS_PER_UNIT
                    <= i128::from(basis_points) * i128::from(source.cents().unsigned_abs())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tolerance {
    pub amount: AmountTolerance,
    pub date_window_days: u32,
}

impl Tolerance {
    /// Transfers against statement lines: one cent, one day.
    pub fn statement() -> Self {
        Self {
            amount: AmountTolerance::Absolute { cents: 1 },
            date_window_days: 1,
        }
    }

    /// Fines against invoices: 2% within a month.
    pub fn invoice() -> Self {
        Self {
            amount: AmountTolerance::Relative { basis_points: 200 },
            date_window_days: 31,
        }
    }

    /// Transfers against salary lines: 2% within five days.
    pub fn payroll() -> Self {
        Self {
            amount: AmountTolerance::Relative { basis_points: 200 },
            date_window_days: 5,
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if let AmountTolerance::Absolute { cents } = self.amount {
            if cents < 0 {
                return Err(ConfigError::InvalidTolerance {
                    name: name.to_string(),
                    reason: format!("absolute tolerance must not be negative, got {}", cents),
                });
            }
        }
        Ok(())
    }
}
