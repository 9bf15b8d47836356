//! This module defines the error types used by the `gridwalk-navigation` crate.

#![warn(missing_docs)]

/// Error type for navigation operations.
///
/// Only setup-time problems are errors. An unreachable goal or an unknown plan
/// step name is reported through `Option`/status values instead.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationError {
    /// Error for an invalid cell size.
    /// This variant is returned when a cell size is not positive and finite.
    InvalidResolution(&'static str),
    /// Error for invalid grid dimensions.
    /// This variant is returned when grid width or height is zero or too large.
    InvalidDimensions(&'static str),
    /// Error for an invalid mover speed.
    InvalidSpeed(&'static str),
    /// Error for an invalid arrival tolerance.
    InvalidTolerance(&'static str),
    /// Error for a zero driver tick interval.
    InvalidInterval(&'static str),
    /// Error for out-of-bounds access.
    /// This variant is returned when editing cells outside the valid range.
    OutOfBounds(&'static str),
    /// A required collaborator (grid, mover, plan) was not supplied at setup.
    MissingCollaborator(&'static str),
}

impl core::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NavigationError::InvalidResolution(msg) => write!(f, "Invalid cell size: {}", msg),
            NavigationError::InvalidDimensions(msg) => write!(f, "Invalid grid dimensions: {}", msg),
            NavigationError::InvalidSpeed(msg) => write!(f, "Invalid mover speed: {}", msg),
            NavigationError::InvalidTolerance(msg) => {
                write!(f, "Invalid arrival tolerance: {}", msg)
            }
            NavigationError::InvalidInterval(msg) => write!(f, "Invalid tick interval: {}", msg),
            NavigationError::OutOfBounds(msg) => write!(f, "Grid access out of bounds: {}", msg),
            NavigationError::MissingCollaborator(what) => {
                write!(f, "Missing required collaborator: {}", what)
            }
        }
    }
}

impl core::error::Error for NavigationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_missing_collaborator() {
        let err = NavigationError::MissingCollaborator("grid");
        assert_eq!(err.to_string(), "Missing required collaborator: grid");
    }
}
