//! Bang-bang excitation law.
//!
//! The torque flips sign whenever the joint reaches one of the two position
//! bounds and is held in between, driving the joint back and forth across
//! the excitation range.

/// Outcome of one excitation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorqueDecision {
    /// At or below the lower bound: push with `+magnitude`.
    PushUp,
    /// At or above the upper bound: push with `−magnitude`.
    PushDown,
    /// Strictly between the bounds: keep the previous torque.
    Hold,
}

impl TorqueDecision {
    /// Decide from the current position.
    ///
    /// The lower bound wins when both fire, which only happens with inverted
    /// bounds (`lower >= upper`).
    #[inline]
    pub fn from_position(position: f64, lower: f64, upper: f64) -> Self {
        if position <= lower {
            Self::PushUp
        } else if position >= upper {
            Self::PushDown
        } else {
            Self::Hold
        }
    }

    /// Torque to command given the magnitude and the previously held torque.
    #[inline]
    pub fn torque(self, magnitude: f64, held: f64) -> f64 {
        match self {
            Self::PushUp => magnitude,
            Self::PushDown => -magnitude,
            Self::Hold => held,
        }
    }
}
