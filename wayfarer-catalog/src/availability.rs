use serde::{Deserialize, Serialize};
use wayfarer_shared::{DateWindow, Reservation, ResourceStatus};

use crate::resource::Bookable;

/// What a customer asks for: an interval and a party size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub window: DateWindow,
    pub guests: u32,
}

/// First rule that ruled a resource out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unavailable {
    #[error("resource is currently not available for booking")]
    Disabled,
    #[error("resource status is {0}")]
    Status(ResourceStatus),
    #[error("capacity {capacity} is below the requested {requested} guests")]
    Capacity { capacity: u32, requested: u32 },
    #[error("requested dates overlap reservation {reference}")]
    Reserved { reference: String },
    #[error("requested dates overlap scheduled maintenance")]
    Maintenance,
}

/// Inclusive overlap: `a` and `b` conflict iff `a.start <= b.end && b.start <= a.end`.
///
/// Touching boundaries count as a conflict, so a stay ending on the day the
/// next one starts blocks it.
pub fn overlaps(a: &DateWindow, b: &DateWindow) -> bool {
    a.start <= b.end && b.start <= a.end
}

/// Check a resource against a request. `reservations` are the resource's
/// reservations; cancelled ones are ignored.
pub fn check<R: Bookable>(
    resource: &R,
    request: &AvailabilityRequest,
    reservations: &[Reservation],
) -> Result<(), Unavailable> {
    if !resource.is_flagged_available() {
        return Err(Unavailable::Disabled);
    }

    if resource.status() != ResourceStatus::Available {
        return Err(Unavailable::Status(resource.status()));
    }

    if resource.capacity() < request.guests {
        return Err(Unavailable::Capacity {
            capacity: resource.capacity(),
            requested: request.guests,
        });
    }

    if let Some(conflict) = reservations
        .iter()
        .filter(|r| r.is_active())
        .find(|r| overlaps(&r.window(), &request.window))
    {
        return Err(Unavailable::Reserved {
            reference: conflict.reference.clone(),
        });
    }

    if resource
        .maintenance_windows()
        .iter()
        .any(|w| overlaps(w, &request.window))
    {
        return Err(Unavailable::Maintenance);
    }

    Ok(())
}

pub fn is_available<R: Bookable>(resource: &R, request: &AvailabilityRequest, reservations: &[Reservation]) -> bool {
    check(resource, request, reservations).is_ok()
}
