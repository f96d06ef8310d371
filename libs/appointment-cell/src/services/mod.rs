pub mod availability;
pub mod booking;
pub mod conflict;
pub mod interval_index;
pub mod recurrence;
pub mod rules;
