//! State machine trait for status enums.

use super::ValidationError;

/// Trait for status enums whose values move along a fixed transition graph.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for SubscriptionStatus {
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Active => vec![Active, Cancelled, Expired, BillingIssue],
///             // ... etc
///         }
///     }
/// }
///
/// let next = current.transition_to(SubscriptionStatus::Expired)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }
}
