//! Order status vocabulary shared by the router, the venue and the
//! record store.

use std::fmt;

/// Status of an order as carried by OrdStatus (tag 39) and, for the
/// execution-specific subset, ExecType (tag 150).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OrdStatus {
    /// Accepted downstream, nothing executed yet.
    New,

    /// Some quantity executed, more may follow.
    PartialFill,

    /// Fully executed.
    Fill,

    /// Cancelled before completion.
    Canceled,

    /// Refused by the venue.
    Rejected,
}

impl OrdStatus {
    /// FIX code for this status.
    pub fn code(self) -> &'static str {
        match self {
            OrdStatus::New => "0",
            OrdStatus::PartialFill => "1",
            OrdStatus::Fill => "2",
            OrdStatus::Canceled => "4",
            OrdStatus::Rejected => "8",
        }
    }

    /// Parse a FIX status code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(OrdStatus::New),
            "1" => Some(OrdStatus::PartialFill),
            "2" => Some(OrdStatus::Fill),
            "4" => Some(OrdStatus::Canceled),
            "8" => Some(OrdStatus::Rejected),
            _ => None,
        }
    }

    /// Terminal statuses end the life of a routing entry.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrdStatus::Fill | OrdStatus::Canceled | OrdStatus::Rejected)
    }

    /// Human-readable name, as shown in admin responses and logs.
    pub fn name(self) -> &'static str {
        match self {
            OrdStatus::New => "New",
            OrdStatus::PartialFill => "PartialFill",
            OrdStatus::Fill => "Fill",
            OrdStatus::Canceled => "Canceled",
            OrdStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for OrdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
