use serde::{Deserialize, Serialize};
use std::fmt;

/// Position identifier. Assigned sequentially per run, so identical inputs
/// always produce identical ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:06}", self.0)
    }
}

/// Monotonic id generator owned by one run.
#[derive(Debug, Default, Clone)]
pub struct IdGen {
    next_position: u64,
}

impl IdGen {
    pub fn next_position_id(&mut self) -> PositionId {
        self.next_position += 1;
        PositionId(self.next_position)
    }
}

/// BLAKE3 hex digest newtype.
macro_rules! hash_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn from_bytes(bytes: &[u8]) -> Self {
                Self(blake3::hash(bytes).to_hex().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

hash_newtype!(
    /// Hash of the behaviour-affecting configuration subset.
    ConfigHash
);
hash_newtype!(
    /// Hash of the raw input data file bytes.
    DataHash
);
hash_newtype!(
    /// Run identity: hash over every other provenance field.
    RunId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_ids_are_sequential() {
        let mut ids = IdGen::default();
        assert_eq!(ids.next_position_id(), PositionId(1));
        assert_eq!(ids.next_position_id(), PositionId(2));
        assert_eq!(PositionId(7).to_string(), "P000007");
    }

    #[test]
    fn hash_newtypes_are_deterministic() {
        assert_eq!(DataHash::from_bytes(b"abc"), DataHash::from_bytes(b"abc"));
        assert_ne!(DataHash::from_bytes(b"abc"), DataHash::from_bytes(b"abd"));
        assert_eq!(ConfigHash::from_bytes(b"x").as_str().len(), 64);
    }
}
