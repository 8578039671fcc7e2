pub mod common;
pub mod destination;
pub mod hotel;
pub mod vehicle;
pub mod activity;
pub mod trip;
pub mod favorite;
pub mod notification;
pub mod faq;
pub mod reservation;

pub use common::{Address, DateWindow, GeoPoint, ResourceStatus};
pub use destination::Destination;
pub use hotel::{Hotel, Room, SeasonalRate};
pub use vehicle::{InsuranceOption, Vehicle};
pub use activity::Activity;
pub use trip::{Budget, BudgetCategory, SpentBreakdown, Trip, TripDestination, TripItem, TripStatus};
pub use favorite::{Favorite, FavoriteItemType};
pub use notification::{Notification, NotificationKind};
pub use faq::Faq;
pub use reservation::{PriceBreakdown, Reservation, ReservationStatus, ResourceKind, ResourceRef};
