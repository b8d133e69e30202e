//! Coalition membership.

use serde::{Deserialize, Serialize};

/// A side in the conflict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coalition {
    Red,
    Blue,
    #[default]
    Neutral,
}

impl Coalition {
    /// The opposing coalition. Neutral has no opponent and maps to itself.
    pub fn opposite(self) -> Coalition {
        match self {
            Coalition::Red => Coalition::Blue,
            Coalition::Blue => Coalition::Red,
            Coalition::Neutral => Coalition::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposites() {
        assert_eq!(Coalition::Red.opposite(), Coalition::Blue);
        assert_eq!(Coalition::Blue.opposite(), Coalition::Red);
        assert_eq!(Coalition::Neutral.opposite(), Coalition::Neutral);
    }
}
