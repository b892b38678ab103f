//! Session capacity tracker.
//!
//! Owns the `spots_booked <= capacity` invariant. Over-booking or releasing
//! a spot that was never taken is a bug in the caller, so both are rejected
//! instead of being clamped.

use serde::Serialize;

use crate::class_session::validate_capacity;
use crate::error::CoreError;

/// Capacity counters of one class session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotCounter {
    pub capacity: i32,
    pub spots_booked: i32,
}

impl SpotCounter {
    pub fn new(capacity: i32, spots_booked: i32) -> Self {
        Self {
            capacity,
            spots_booked,
        }
    }

    pub fn has_open_spot(&self) -> bool {
        self.spots_booked < self.capacity
    }

    pub fn open_spots(&self) -> i32 {
        (self.capacity - self.spots_booked).max(0)
    }

    /// Take one spot.
    pub fn increment(&mut self) -> Result<(), CoreError> {
        if !self.has_open_spot() {
            return Err(CoreError::Conflict(format!(
                "Capacity invariant violated: cannot book beyond capacity {}",
                self.capacity
            )));
        }
        self.spots_booked += 1;
        Ok(())
    }

    /// Release one spot.
    pub fn decrement(&mut self) -> Result<(), CoreError> {
        if self.spots_booked <= 0 {
            return Err(CoreError::Conflict(
                "Capacity invariant violated: no booked spot to release".into(),
            ));
        }
        self.spots_booked -= 1;
        Ok(())
    }

    /// Change the capacity without dropping below the spots already taken.
    pub fn resize(&mut self, capacity: i32) -> Result<(), CoreError> {
        validate_capacity(capacity)?;
        if capacity < self.spots_booked {
            return Err(CoreError::Conflict(format!(
                "Capacity {capacity} is below the {} spots already booked",
                self.spots_booked
            )));
        }
        self.capacity = capacity;
        Ok(())
    }
}
