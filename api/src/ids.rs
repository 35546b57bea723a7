use serde::{Deserialize, Serialize};

/// The backend's identifier for a place. Serialized as the bare integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaceID(pub i64);

impl std::fmt::Display for PlaceID {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
