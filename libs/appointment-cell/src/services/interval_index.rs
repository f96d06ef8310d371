// libs/appointment-cell/src/services/interval_index.rs
//
// Ordered index over a physiotherapist's booked intervals. Appointments are
// half-open [start, end): a booking that ends exactly when the next one
// starts does not conflict.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::Appointment;

#[derive(Debug, Clone, PartialEq)]
pub struct BookedInterval {
    pub id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BookedInterval {
    pub fn new(id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { id, start, end }
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

impl From<&Appointment> for BookedInterval {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            start: appointment.start_time,
            end: appointment.end_time(),
        }
    }
}

/// Intervals keyed by (start, id) so probes are bounded range scans rather
/// than a pass over every booking in the window.
#[derive(Debug)]
pub struct IntervalIndex {
    by_start: BTreeMap<(DateTime<Utc>, Uuid), BookedInterval>,
    max_len: Duration,
}

impl Default for IntervalIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self {
            by_start: BTreeMap::new(),
            max_len: Duration::zero(),
        }
    }

    /// Build the index from the active appointments fetched for a window.
    pub fn from_appointments<'a, I>(appointments: I) -> Self
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        let mut index = Self::new();
        for appointment in appointments {
            if appointment.is_active() {
                index.insert(BookedInterval::from(appointment));
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.by_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    pub fn insert(&mut self, interval: BookedInterval) {
        let length = interval.end - interval.start;
        if length > self.max_len {
            self.max_len = length;
        }
        self.by_start.insert((interval.start, interval.id), interval);
    }

    pub fn remove(&mut self, id: Uuid, start: DateTime<Utc>) -> Option<BookedInterval> {
        // max_len is left as-is: it only has to stay an upper bound.
        self.by_start.remove(&(start, id))
    }

    /// Every indexed interval overlapping [start, end), in start order.
    ///
    /// Candidates all have `interval.start < end`, so the scan walks the
    /// range below `end` backwards and stops as soon as no earlier interval
    /// can still reach `start` (their starts only decrease, and no interval
    /// is longer than `max_len`).
    pub fn conflicts_with(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Vec<BookedInterval> {
        let mut hits = Vec::new();

        let upper = (end, Uuid::nil());
        for ((interval_start, _), interval) in self.by_start.range(..upper).rev() {
            if *interval_start + self.max_len <= start {
                break;
            }
            if interval.end > start && exclude != Some(interval.id) {
                hits.push(interval.clone());
            }
        }

        hits.reverse();
        hits
    }

    pub fn is_free(&self, start: DateTime<Utc>, end: DateTime<Utc>, exclude: Option<Uuid>) -> bool {
        self.conflicts_with(start, end, exclude).is_empty()
    }

    /// First gap of at least `duration` starting at or after `from` and
    /// ending no later than `until`.
    pub fn next_gap_after(
        &self,
        from: DateTime<Utc>,
        duration: Duration,
        until: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let mut candidate = from;

        // An interval already underway at `from` pushes the first candidate out.
        for interval in self.conflicts_with(from, from + duration, None) {
            if interval.end > candidate {
                candidate = interval.end;
            }
        }

        loop {
            if candidate + duration > until {
                return None;
            }
            let blockers = self.conflicts_with(candidate, candidate + duration, None);
            match blockers.into_iter().map(|b| b.end).max() {
                None => return Some(candidate),
                Some(next_free) => candidate = next_free,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, hour, min, 0).unwrap()
    }

    fn interval(start: DateTime<Utc>, end: DateTime<Utc>) -> BookedInterval {
        BookedInterval::new(Uuid::new_v4(), start, end)
    }

    #[test]
    fn boundary_touching_intervals_do_not_conflict() {
        let mut index = IntervalIndex::new();
        index.insert(interval(at(9, 0), at(10, 0)));

        // [10:00, 11:00) starts exactly when the booking ends
        assert!(index.is_free(at(10, 0), at(11, 0), None));
        // [8:00, 9:00) ends exactly when the booking starts
        assert!(index.is_free(at(8, 0), at(9, 0), None));
    }

    #[test]
    fn true_overlap_conflicts_in_both_orders() {
        let mut index = IntervalIndex::new();
        index.insert(interval(at(9, 0), at(10, 0)));

        assert!(!index.is_free(at(9, 30), at(10, 30), None));
        assert!(!index.is_free(at(8, 30), at(9, 30), None));
        // Containment both ways
        assert!(!index.is_free(at(9, 15), at(9, 45), None));
        assert!(!index.is_free(at(8, 0), at(12, 0), None));
    }

    #[test]
    fn excluded_appointment_does_not_conflict_with_itself() {
        let booked = interval(at(9, 0), at(10, 0));
        let id = booked.id;
        let mut index = IntervalIndex::new();
        index.insert(booked);

        assert!(index.is_free(at(9, 30), at(10, 30), Some(id)));
        assert!(!index.is_free(at(9, 30), at(10, 30), None));
    }

    #[test]
    fn long_interval_before_short_ones_is_still_found() {
        let mut index = IntervalIndex::new();
        // A long booking starting early, followed by short ones
        index.insert(interval(at(8, 0), at(12, 0)));
        index.insert(interval(at(12, 0), at(12, 30)));
        index.insert(interval(at(13, 0), at(13, 30)));

        let hits = index.conflicts_with(at(11, 0), at(11, 30), None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].start, at(8, 0));
    }

    #[test]
    fn conflicts_are_returned_in_start_order() {
        let mut index = IntervalIndex::new();
        index.insert(interval(at(11, 0), at(12, 0)));
        index.insert(interval(at(9, 0), at(10, 0)));
        index.insert(interval(at(10, 0), at(11, 0)));

        let hits = index.conflicts_with(at(9, 30), at(11, 30), None);
        let starts: Vec<_> = hits.iter().map(|h| h.start).collect();
        assert_eq!(starts, vec![at(9, 0), at(10, 0), at(11, 0)]);
    }

    #[test]
    fn removal_frees_the_slot() {
        let booked = interval(at(14, 0), at(15, 0));
        let (id, start) = (booked.id, booked.start);
        let mut index = IntervalIndex::new();
        index.insert(booked);

        assert!(!index.is_free(at(14, 0), at(15, 0), None));
        index.remove(id, start);
        assert!(index.is_free(at(14, 0), at(15, 0), None));
    }

    #[test]
    fn next_gap_skips_busy_stretch() {
        let mut index = IntervalIndex::new();
        index.insert(interval(at(9, 0), at(10, 0)));
        index.insert(interval(at(10, 0), at(11, 0)));
        index.insert(interval(at(11, 30), at(12, 0)));

        // A 30-minute gap opens at 11:00
        let gap = index.next_gap_after(at(9, 0), Duration::minutes(30), at(19, 0));
        assert_eq!(gap, Some(at(11, 0)));

        // A 60-minute slot only fits after 12:00
        let gap = index.next_gap_after(at(9, 0), Duration::minutes(60), at(19, 0));
        assert_eq!(gap, Some(at(12, 0)));
    }

    #[test]
    fn next_gap_respects_the_horizon() {
        let mut index = IntervalIndex::new();
        index.insert(interval(at(9, 0), at(18, 30)));

        let gap = index.next_gap_after(at(9, 0), Duration::minutes(60), at(19, 0));
        assert_eq!(gap, None);
    }

    #[test]
    fn inactive_appointments_are_not_indexed() {
        use crate::models::{Appointment, AppointmentStatus, AppointmentType};

        let mut cancelled = Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            physiotherapist_id: Uuid::new_v4(),
            start_time: at(9, 0),
            duration_minutes: 60,
            status: AppointmentStatus::Cancelled,
            appointment_type: AppointmentType::Session,
            room: None,
            notes: None,
            cancellation_reason: Some("patient request".to_string()),
            recurrence_group_id: None,
            created_at: at(8, 0),
            updated_at: at(8, 0),
        };

        let index = IntervalIndex::from_appointments([&cancelled.clone()]);
        assert!(index.is_empty());

        cancelled.status = AppointmentStatus::Confirmed;
        let index = IntervalIndex::from_appointments([&cancelled]);
        assert_eq!(index.len(), 1);
        assert!(!index.is_free(at(9, 0), at(9, 30), None));
    }
}
