//! Numeric identifiers for teams, users, matches and round robin groups.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Get the raw numeric value.
            pub fn as_u32(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a tournament team.
    TeamId
);

numeric_id!(
    /// Identifier of an individual player.
    UserId
);

numeric_id!(
    /// Identifier of a match: its index in the owning bracket's match arena.
    MatchId
);

numeric_id!(
    /// Round robin group identifier. Groups are numbered from 1 ("Group A").
    GroupId
);

impl MatchId {
    /// Position of the match in its bracket's arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl GroupId {
    /// Human readable group label: 1 -> "A", 2 -> "B", 27 -> "AA".
    pub fn label(&self) -> String {
        let mut n = self.0;
        let mut label = Vec::new();
        while n > 0 {
            let rem = ((n - 1) % 26) as u8;
            label.push((b'A' + rem) as char);
            n = (n - 1) / 26;
        }
        label.iter().rev().collect()
    }
}
