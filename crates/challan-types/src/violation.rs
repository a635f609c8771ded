//! Fixed registry of reportable violation kinds

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Every violation the rule engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    HelmetViolation,
    TripleRiding,
    WrongWay,
    MobileUsage,
    SeatbeltViolation,
    SignalJump,
    Speeding,
    WrongParking,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 8] = [
        ViolationKind::HelmetViolation,
        ViolationKind::TripleRiding,
        ViolationKind::WrongWay,
        ViolationKind::MobileUsage,
        ViolationKind::SeatbeltViolation,
        ViolationKind::SignalJump,
        ViolationKind::Speeding,
        ViolationKind::WrongParking,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::HelmetViolation => "helmet_violation",
            ViolationKind::TripleRiding => "triple_riding",
            ViolationKind::WrongWay => "wrong_way",
            ViolationKind::MobileUsage => "mobile_usage",
            ViolationKind::SeatbeltViolation => "seatbelt_violation",
            ViolationKind::SignalJump => "signal_jump",
            ViolationKind::Speeding => "speeding",
            ViolationKind::WrongParking => "wrong_parking",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ViolationKind::HelmetViolation => "No Helmet",
            ViolationKind::TripleRiding => "Triple Riding",
            ViolationKind::WrongWay => "Wrong Way Driving",
            ViolationKind::MobileUsage => "Mobile Phone Usage",
            ViolationKind::SeatbeltViolation => "No Seatbelt",
            ViolationKind::SignalJump => "Red Light Violation",
            ViolationKind::Speeding => "Speeding",
            ViolationKind::WrongParking => "Parking Violation",
        }
    }

    /// Violation-type code used by the review backend, where one exists
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ViolationKind::HelmetViolation => Some("NH001"),
            ViolationKind::TripleRiding => Some("TR001"),
            ViolationKind::WrongWay => Some("WW001"),
            ViolationKind::MobileUsage => Some("MP001"),
            ViolationKind::SeatbeltViolation => None,
            ViolationKind::SignalJump => Some("RL001"),
            ViolationKind::Speeding => Some("SP001"),
            ViolationKind::WrongParking => Some("PV001"),
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViolationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ViolationKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown violation kind: {}", s))
    }
}
