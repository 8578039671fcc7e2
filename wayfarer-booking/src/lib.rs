pub mod reference;
pub mod service;

pub use reference::{generate_reference, reference_for, ReferenceKind};
pub use service::{
    AvailableRoom, BookingService, CancelRequest, HotelBookingRequest, RoomAvailability, VehicleAvailability,
    VehicleRentalRequest,
};
