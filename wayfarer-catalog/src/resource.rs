use wayfarer_shared::{DateWindow, ResourceStatus, Room, Vehicle};

/// Common view over hotel rooms and vehicles for availability checks.
pub trait Bookable {
    /// Admin-controlled switch. `false` blocks every booking.
    fn is_flagged_available(&self) -> bool;

    fn status(&self) -> ResourceStatus;

    fn capacity(&self) -> u32;

    fn maintenance_windows(&self) -> &[DateWindow];
}

impl Bookable for Room {
    fn is_flagged_available(&self) -> bool {
        self.is_available
    }

    fn status(&self) -> ResourceStatus {
        self.maintenance_status
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn maintenance_windows(&self) -> &[DateWindow] {
        &self.maintenance_windows
    }
}

impl Bookable for Vehicle {
    fn is_flagged_available(&self) -> bool {
        self.is_available
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn maintenance_windows(&self) -> &[DateWindow] {
        &self.maintenance_windows
    }
}
