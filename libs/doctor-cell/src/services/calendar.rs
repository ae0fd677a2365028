// libs/doctor-cell/src/services/calendar.rs
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone};
use tracing::debug;

use crate::models::{ScheduleSlot, SlotOccurrence};

/// Pure weekly-cycle arithmetic over a doctor's slots. Never touches storage.
#[derive(Debug, Default, Clone)]
pub struct SlotCalendar;

impl SlotCalendar {
    pub fn new() -> Self {
        Self
    }

    /// A slot is due when its day ordinal is strictly less than today's
    /// (0 = Sunday). Same-day slots wait until the next calendar day, and the
    /// comparison does not wrap around the Saturday/Sunday boundary.
    pub fn is_due<Tz: TimeZone>(&self, slot: &ScheduleSlot, now: &DateTime<Tz>) -> bool {
        slot.day_ordinal() < now.weekday().num_days_from_sunday()
    }

    /// The subset of `slots` whose weekly occurrence has elapsed and must be
    /// closed out and reopened for the next cycle.
    pub fn due_for_rollover<Tz: TimeZone>(
        &self,
        slots: &[ScheduleSlot],
        now: &DateTime<Tz>,
    ) -> Vec<ScheduleSlot> {
        let due: Vec<ScheduleSlot> = slots
            .iter()
            .filter(|slot| self.is_due(slot, now))
            .cloned()
            .collect();

        debug!(
            "{} of {} slots due for rollover (today ordinal {})",
            due.len(),
            slots.len(),
            now.weekday().num_days_from_sunday()
        );

        due
    }

    /// Next calendar date on or after `now` that falls on the slot's weekday.
    pub fn next_occurrence<Tz: TimeZone>(&self, slot: &ScheduleSlot, now: &DateTime<Tz>) -> NaiveDate {
        let today = now.date_naive();
        let today_ordinal = today.weekday().num_days_from_sunday();
        let offset = (slot.day_ordinal() + 7 - today_ordinal) % 7;

        today + Days::new(u64::from(offset))
    }

    /// The doctor's week as concrete occurrences, ordered by day ordinal then
    /// start time.
    pub fn weekly_schedule<Tz: TimeZone>(
        &self,
        slots: &[ScheduleSlot],
        now: &DateTime<Tz>,
    ) -> Vec<SlotOccurrence> {
        let mut ordered: Vec<&ScheduleSlot> = slots.iter().collect();
        ordered.sort_by_key(|slot| (slot.day_ordinal(), slot.start_time));

        ordered
            .into_iter()
            .map(|slot| SlotOccurrence {
                slot: slot.clone(),
                date: self.next_occurrence(slot, now),
            })
            .collect()
    }
}
