//! Messages from the location collaborator.

use std::str::FromStr;

use crate::error::ValidationError;
use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationUpdate {
    Position(Coordinate),
    /// Location permission was granted or revoked.
    Authorization(bool),
}

/// Line format: `lat,lon`, `allow` or `deny`.
impl FromStr for LocationUpdate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "allow" => Ok(LocationUpdate::Authorization(true)),
            "deny" => Ok(LocationUpdate::Authorization(false)),
            other => other.parse().map(LocationUpdate::Position),
        }
    }
}
