//! Control types and the table binding each one to a signal

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::signals::SignalSet;
use crate::tracking::landmarks::Side;

/// Which signal drives an asset instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlType {
    LeftHand,
    RightHand,
    Mouth,
    Head,
    TopOfHead,
    BothHands,
    #[serde(rename = "position", alias = "fixedPosition")]
    FixedPosition,
}

/// How an asset's yaw is derived after its position update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YawSource {
    /// Lean toward the direction of horizontal travel
    Travel,
    /// Spread between the two hand pointers
    HandSpread,
    /// Smoothed palm orientation of one hand
    Palm(Side),
}

/// One row of the dispatch table
#[derive(Debug, Clone, Copy)]
pub struct ControlBinding {
    pub control: ControlType,
    pub label: &'static str,
    pub anchor: fn(&SignalSet) -> Vec2,
    pub yaw: YawSource,
}

fn left_pointer(s: &SignalSet) -> Vec2 {
    s.left_pointer.current()
}

fn right_pointer(s: &SignalSet) -> Vec2 {
    s.right_pointer.current()
}

fn mouth(s: &SignalSet) -> Vec2 {
    s.mouth.current()
}

fn head(s: &SignalSet) -> Vec2 {
    s.head.current()
}

fn top_of_head(s: &SignalSet) -> Vec2 {
    s.top_of_head.current()
}

fn hands_average(s: &SignalSet) -> Vec2 {
    (s.left_pointer.current() + s.right_pointer.current()) / 2.0
}

fn fixed(_: &SignalSet) -> Vec2 {
    Vec2::ZERO
}

/// Indexed by `ControlType as usize`
const BINDINGS: [ControlBinding; 7] = [
    ControlBinding {
        control: ControlType::LeftHand,
        label: "Left Hand",
        anchor: left_pointer,
        yaw: YawSource::Palm(Side::Left),
    },
    ControlBinding {
        control: ControlType::RightHand,
        label: "Right Hand",
        anchor: right_pointer,
        yaw: YawSource::Palm(Side::Right),
    },
    ControlBinding {
        control: ControlType::Mouth,
        label: "Mouth",
        anchor: mouth,
        yaw: YawSource::Travel,
    },
    ControlBinding {
        control: ControlType::Head,
        label: "Head",
        anchor: head,
        yaw: YawSource::Travel,
    },
    ControlBinding {
        control: ControlType::TopOfHead,
        label: "Top of Head",
        anchor: top_of_head,
        yaw: YawSource::Travel,
    },
    ControlBinding {
        control: ControlType::BothHands,
        label: "Both Hands",
        anchor: hands_average,
        yaw: YawSource::HandSpread,
    },
    ControlBinding {
        control: ControlType::FixedPosition,
        label: "Fixed Position",
        anchor: fixed,
        yaw: YawSource::Travel,
    },
];

impl ControlType {
    /// Display order used by the settings surface
    pub const ALL: [ControlType; 7] = [
        ControlType::BothHands,
        ControlType::RightHand,
        ControlType::LeftHand,
        ControlType::Head,
        ControlType::TopOfHead,
        ControlType::Mouth,
        ControlType::FixedPosition,
    ];

    pub fn binding(self) -> &'static ControlBinding {
        &BINDINGS[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.binding().label
    }

    /// The signal value this control type follows
    pub fn anchor(self, signals: &SignalSet) -> Vec2 {
        (self.binding().anchor)(signals)
    }

    pub fn yaw_source(self) -> YawSource {
        self.binding().yaw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_discriminants() {
        for control in ControlType::ALL {
            assert_eq!(control.binding().control, control);
        }
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&ControlType::TopOfHead).unwrap(),
            "\"topOfHead\""
        );
        assert_eq!(
            serde_json::to_string(&ControlType::FixedPosition).unwrap(),
            "\"position\""
        );
        let alias: ControlType = serde_json::from_str("\"fixedPosition\"").unwrap();
        assert_eq!(alias, ControlType::FixedPosition);
        let both: ControlType = serde_json::from_str("\"bothHands\"").unwrap();
        assert_eq!(both, ControlType::BothHands);
    }

    #[test]
    fn test_both_hands_average() {
        let mut signals = SignalSet::default();
        signals.left_pointer = crate::pipeline::signals::SignalState::new(Vec2::new(-1.0, 0.0));
        signals.right_pointer = crate::pipeline::signals::SignalState::new(Vec2::new(1.0, 2.0));
        assert_eq!(ControlType::BothHands.anchor(&signals), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_fixed_position_ignores_signals() {
        let mut signals = SignalSet::default();
        signals.head = crate::pipeline::signals::SignalState::new(Vec2::new(3.0, 3.0));
        assert_eq!(ControlType::FixedPosition.anchor(&signals), Vec2::ZERO);
        assert_eq!(ControlType::Head.anchor(&signals), Vec2::new(3.0, 3.0));
    }

    #[test]
    fn test_labels() {
        assert_eq!(ControlType::BothHands.label(), "Both Hands");
        assert_eq!(ControlType::TopOfHead.label(), "Top of Head");
        assert_eq!(ControlType::FixedPosition.label(), "Fixed Position");
    }
}
