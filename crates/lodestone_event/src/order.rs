//! Listener ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The slot a listener runs in.
///
/// Listeners run in ascending slot order. `PRE` is meant for listeners that
/// only observe the incoming event and `POST` for listeners reacting to the
/// final outcome; neither should modify the event.
///
/// The `*IgnoreCancelled` slots keep receiving an event after it has been
/// cancelled. Every other slot is skipped once cancellation happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Order {
    Pre,
    First,
    FirstIgnoreCancelled,
    Early,
    EarlyIgnoreCancelled,
    Default,
    DefaultIgnoreCancelled,
    Late,
    LateIgnoreCancelled,
    Last,
    LastIgnoreCancelled,
    Post,
}

impl Order {
    /// Every slot, in execution order.
    pub const ALL: [Order; 12] = [
        Order::Pre,
        Order::First,
        Order::FirstIgnoreCancelled,
        Order::Early,
        Order::EarlyIgnoreCancelled,
        Order::Default,
        Order::DefaultIgnoreCancelled,
        Order::Late,
        Order::LateIgnoreCancelled,
        Order::Last,
        Order::LastIgnoreCancelled,
        Order::Post,
    ];

    /// Stable position of the slot, `0` for `Pre` through `11` for `Post`.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether listeners in this slot still run after the event was cancelled.
    pub const fn ignores_cancelled(self) -> bool {
        matches!(
            self,
            Order::FirstIgnoreCancelled
                | Order::EarlyIgnoreCancelled
                | Order::DefaultIgnoreCancelled
                | Order::LateIgnoreCancelled
                | Order::LastIgnoreCancelled
        )
    }
}

impl Default for Order {
    fn default() -> Self {
        Order::Default
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Order::Pre => "PRE",
            Order::First => "FIRST",
            Order::FirstIgnoreCancelled => "FIRST_IGNORE_CANCELLED",
            Order::Early => "EARLY",
            Order::EarlyIgnoreCancelled => "EARLY_IGNORE_CANCELLED",
            Order::Default => "DEFAULT",
            Order::DefaultIgnoreCancelled => "DEFAULT_IGNORE_CANCELLED",
            Order::Late => "LATE",
            Order::LateIgnoreCancelled => "LATE_IGNORE_CANCELLED",
            Order::Last => "LAST",
            Order::LastIgnoreCancelled => "LAST_IGNORE_CANCELLED",
            Order::Post => "POST",
        };
        f.write_str(name)
    }
}
