//! The spend gate: decides whether a user may pay for a thread publish.
//!
//! Authorization is advisory - it is a pure function of the user's current
//! financial state and never mutates anything. The actual deduction happens
//! transactionally at commit time in the publish coordinator, so a stale
//! decision can only ever fail closed there.

use crate::db::models::users::UserDBResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// How an allowed publish will be funded at commit time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Funding {
    /// Consumes one free cast credit, no balance deduction
    FreeCast,
    /// Deducts the thread cost from the prepaid balance
    Balance,
}

/// Why the spend gate refused a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotApproved,
    InsufficientBalance,
    LimitExceeded,
}

impl DenyReason {
    /// Stable machine-readable code for API payloads
    pub fn as_code(&self) -> &'static str {
        match self {
            DenyReason::NotApproved => "not_approved",
            DenyReason::InsufficientBalance => "insufficient_balance",
            DenyReason::LimitExceeded => "limit_exceeded",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NotApproved => write!(f, "Spending has not been approved for this account"),
            DenyReason::InsufficientBalance => write!(f, "Balance is too low to cover the publish cost"),
            DenyReason::LimitExceeded => write!(f, "Publishing would exceed the configured spending limit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allow(Funding),
    Deny(DenyReason),
}

/// Evaluate the ordered spending policy for `cost`.
///
/// 1. A remaining free cast always wins and costs nothing.
/// 2. Otherwise the user must have approved spending, hold at least `cost`
///    in balance, and stay within the spending limit when one is set.
///
/// The first unmet rule produces the denial, so callers always get the most
/// actionable reason.
pub fn authorize(user: &UserDBResponse, cost: Decimal) -> Authorization {
    if user.free_casts_remaining > 0 {
        return Authorization::Allow(Funding::FreeCast);
    }
    if !user.spending_approved {
        return Authorization::Deny(DenyReason::NotApproved);
    }
    if user.balance < cost {
        return Authorization::Deny(DenyReason::InsufficientBalance);
    }
    if let Some(limit) = user.spending_limit
        && user.total_spent + cost > limit
    {
        return Authorization::Deny(DenyReason::LimitExceeded);
    }
    Authorization::Allow(Funding::Balance)
}
