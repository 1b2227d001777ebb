//! Transition rules for status enums.

use super::ValidationError;

/// A status enum with a fixed set of legal transitions.
///
/// Implementors list the targets reachable from each state; the default
/// methods derive validation from that list.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Every state reachable in one step from `self`.
    fn valid_transitions(&self) -> Vec<Self>;

    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_transition(self, target))
        }
    }

    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
