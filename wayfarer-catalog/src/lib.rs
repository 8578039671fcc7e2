pub mod resource;
pub mod pricing;
pub mod availability;

pub use resource::Bookable;
pub use pricing::{PricingConfig, PricingEngine, PricingError, Modifier, RoomQuote};
pub use availability::{AvailabilityRequest, Unavailable};
