//! Discrete agent action.

use serde::{Deserialize, Serialize};

/// Action applied to the agent for one environment step.
///
/// Each component is a signed rate, normally `-1`, `0` or `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    /// Turn rate around the vertical axis (positive turns left).
    pub look: i32,
    /// Lateral rate (positive moves left).
    pub strafe: i32,
    /// Forward rate (positive moves forward).
    #[serde(rename = "move")]
    pub forward: i32,
}

impl Action {
    /// Create an action from its three components.
    pub const fn new(look: i32, strafe: i32, forward: i32) -> Self {
        Self {
            look,
            strafe,
            forward,
        }
    }

    /// Build an action from the `[look, strafe, move]` array form.
    ///
    /// Returns `None` unless the slice has exactly three elements.
    pub fn from_slice(values: &[i32]) -> Option<Self> {
        match values {
            [look, strafe, forward] => Some(Self::new(*look, *strafe, *forward)),
            _ => None,
        }
    }

    /// `true` when every component is zero.
    pub fn is_idle(&self) -> bool {
        self.look == 0 && self.strafe == 0 && self.forward == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        assert_eq!(Action::from_slice(&[1, 0, -1]), Some(Action::new(1, 0, -1)));
        assert_eq!(Action::from_slice(&[1, 0]), None);
        assert_eq!(Action::from_slice(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn test_idle() {
        assert!(Action::default().is_idle());
        assert!(!Action::new(0, 0, 1).is_idle());
    }
}
