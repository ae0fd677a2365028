//! # Appointment Cell
//!
//! Booking, cancellation and weekly rollover of doctor schedule slots.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                 Appointment Cell                    |
//! +-----------------------------------------------------+
//! |  models.rs      |  Appointment, status, errors      |
//! |  services/      |                                   |
//! |    lifecycle.rs |  Appointment state machine        |
//! |    booking.rs   |  BookingService (entry points)    |
//! |    rollover.rs  |  Weekly slot rollover             |
//! |  store/         |                                   |
//! |    mod.rs       |  BookingStore / transaction seam  |
//! |    memory.rs    |  In-process store                 |
//! |    postgres.rs  |  sqlx-backed store                |
//! +-----------------------------------------------------+
//! ```
//!
//! A slot's `enabled` flag is the booking mutex: booking flips it to `false`
//! under the slot's row lock, cancellation and rollover flip it back.

pub mod models;
pub mod services;
pub mod store;

pub use models::*;
pub use services::*;
pub use store::{BookingStore, BookingTransaction, InMemoryBookingStore, PostgresBookingStore, StoreError};
