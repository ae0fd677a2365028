pub mod booking;
pub mod lifecycle;
pub mod rollover;

pub use booking::BookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use rollover::RolloverService;
