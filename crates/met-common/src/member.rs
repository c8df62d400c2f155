//! Ensemble member identity.

use serde::{Deserialize, Serialize};

/// Identity of an ensemble member.
///
/// Source fields may lack a realization number (the control run). Those are
/// tagged [`MemberId::Control`] so every contribution is addressable the same
/// way downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberId {
    Realization(u32),
    Control,
}

impl MemberId {
    /// Tag used for contributions without an explicit realization.
    pub const CONTROL: MemberId = MemberId::Control;

    /// Map an optional realization number onto a member id.
    pub fn from_realization(realization: Option<u32>) -> Self {
        realization.map(MemberId::Realization).unwrap_or(Self::CONTROL)
    }

    pub fn realization(&self) -> Option<u32> {
        match self {
            MemberId::Realization(n) => Some(*n),
            MemberId::Control => None,
        }
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberId::Realization(n) => write!(f, "{:03}", n),
            MemberId::Control => write!(f, "control"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_realization_is_control() {
        assert_eq!(MemberId::from_realization(None), MemberId::CONTROL);
        assert_eq!(MemberId::from_realization(Some(4)), MemberId::Realization(4));
    }

    #[test]
    fn test_display() {
        assert_eq!(MemberId::Realization(7).to_string(), "007");
        assert_eq!(MemberId::Control.to_string(), "control");
    }
}
