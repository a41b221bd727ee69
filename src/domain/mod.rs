//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `billing` - Subscription reconciliation across payment providers

pub mod billing;
pub mod foundation;
