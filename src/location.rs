/// Device position resolution.
///
/// On a phone this is the OS location service behind a permission prompt.
/// The service has no such sensor, so the shipped provider reads a fixed
/// position and a permission flag from configuration; anything implementing
/// `LocationProvider` can stand in for it.

use crate::model::{Coordinate, LocationError};
use std::future::Future;

pub trait LocationProvider {
    /// Current position, or why it cannot be had.
    fn current_coordinate(&self) -> impl Future<Output = Result<Coordinate, LocationError>>;
}

/// Position taken from configuration or the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfiguredLocation {
    permission_granted: bool,
    coordinate: Option<Coordinate>,
}

impl ConfiguredLocation {
    pub fn new(permission_granted: bool, coordinate: Option<Coordinate>) -> Self {
        ConfiguredLocation {
            permission_granted,
            coordinate,
        }
    }
}

impl LocationProvider for ConfiguredLocation {
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
        if !self.permission_granted {
            return Err(LocationError::PermissionDenied);
        }
        self.coordinate.ok_or(LocationError::PositionUnavailable)
    }
}
