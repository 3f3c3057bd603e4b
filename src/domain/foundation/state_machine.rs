//! State machine trait for lifecycle enums.
//!
//! Gives lifecycle enums (currently the realtime connection state) one
//! place to declare their legal transitions and a checked way to move
//! between them.

use super::ValidationError;

/// Trait for enums whose values form a state machine.
///
/// ```ignore
/// let next = ConnectionState::Connecting.transition_to(ConnectionState::Open)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

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
