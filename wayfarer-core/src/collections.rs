//! Collection names, document bindings and the process-wide collection registry.
//!
//! Every collection is declared once here. Backends consult [`registry`] to
//! set up per-collection indexes at startup.

use std::collections::HashMap;
use std::sync::OnceLock;

use uuid::Uuid;
use wayfarer_shared::{Activity, Destination, Faq, Favorite, Hotel, Notification, Reservation, Trip, Vehicle};

use crate::repository::Document;

macro_rules! document {
    ($ty:ty, $collection:expr, $entity:expr) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $collection;
            const ENTITY: &'static str = $entity;

            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

document!(Destination, "destinations", "Destination");
document!(Hotel, "hotels", "Hotel");
document!(Vehicle, "vehicles", "Vehicle");
document!(Activity, "activities", "Activity");
document!(Trip, "trips", "Trip");
document!(Favorite, "favorites", "Favorite");
document!(Notification, "notifications", "Notification");
document!(Faq, "faqs", "FAQ");
document!(Reservation, "reservations", "Reservation");

/// Static description of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub entity: &'static str,
    /// Document fields worth an expression index.
    pub indexed_fields: &'static [&'static str],
}

fn spec_of<T: Document>(indexed_fields: &'static [&'static str]) -> CollectionSpec {
    CollectionSpec {
        name: T::COLLECTION,
        entity: T::ENTITY,
        indexed_fields,
    }
}

static REGISTRY: OnceLock<HashMap<&'static str, CollectionSpec>> = OnceLock::new();

/// All known collections, keyed by name. Built on first use.
pub fn registry() -> &'static HashMap<&'static str, CollectionSpec> {
    REGISTRY.get_or_init(|| {
        [
            spec_of::<Destination>(&["city", "country", "category"]),
            spec_of::<Hotel>(&["destinationId", "address.city"]),
            spec_of::<Vehicle>(&["category", "city"]),
            spec_of::<Activity>(&["destinationId", "category"]),
            spec_of::<Trip>(&["userId", "status"]),
            spec_of::<Favorite>(&["userId", "itemId"]),
            spec_of::<Notification>(&["userId", "isRead"]),
            spec_of::<Faq>(&["category"]),
            spec_of::<Reservation>(&["userId", "resource.roomId", "resource.vehicleId", "status"]),
        ]
        .into_iter()
        .map(|spec| (spec.name, spec))
        .collect()
    })
}
