// libs/doctor-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// SCHEDULE MODELS
// ==============================================================================

/// A recurring weekly time block belonging to one doctor.
///
/// `enabled` doubles as the booking mutex for the current weekly occurrence:
/// it is `true` while the slot can take a new booking and `false` while an
/// appointment holds it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub enabled: bool,
}

impl ScheduleSlot {
    pub fn new(doctor_id: Uuid, day: Weekday, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            day,
            start_time,
            end_time,
            enabled: true,
        }
    }

    /// Day-of-week ordinal, 0 = Sunday .. 6 = Saturday.
    pub fn day_ordinal(&self) -> u32 {
        self.day.num_days_from_sunday()
    }

    pub fn is_open(&self) -> bool {
        self.enabled
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Inverse of [`ScheduleSlot::day_ordinal`].
pub fn weekday_from_ordinal(ordinal: i16) -> Option<Weekday> {
    match ordinal {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// One concrete weekly instance of a slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotOccurrence {
    pub slot: ScheduleSlot,
    pub date: NaiveDate,
}
