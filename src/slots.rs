//! Free-interval bookkeeping: slots, their running total, and the sweep that
//! carves busy time out of a working window.

use crate::scheduler::BusyInterval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A half-open stretch `[start, end)` of free UTC time.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSlot {
	pub start: DateTime<Utc>,
	pub end: DateTime<Utc>,
}

impl TimeSlot {
	/// Whole minutes between start and end, truncated.
	#[must_use]
	pub fn duration_minutes(&self) -> i64 {
		(self.end - self.start).num_minutes()
	}
}

/// Chronologically ordered, disjoint free slots plus a cached total.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AvailableSlots {
	pub slots: Vec<TimeSlot>,
	pub total_minutes: i64,
}

impl AvailableSlots {
	/// Append slots, keeping the cached total in step.
	pub fn push_slots(&mut self, slots: Vec<TimeSlot>) {
		self.total_minutes += slots.iter().map(TimeSlot::duration_minutes).sum::<i64>();
		self.slots.extend(slots);
	}

	/// Absorb another collection, assumed to be later in time.
	pub fn merge(&mut self, other: AvailableSlots) {
		self.total_minutes += other.total_minutes;
		self.slots.extend(other.slots);
	}
}

/// The maximal disjoint free sub-intervals of `[window_start, window_end)`
/// not covered by any of `busy`. Emitted slots are strictly positive width,
/// disjoint, and chronological.
#[must_use]
pub fn subtract_busy(
	window_start: DateTime<Utc>,
	window_end: DateTime<Utc>,
	busy: &[&BusyInterval],
) -> Vec<TimeSlot> {
	if busy.is_empty() {
		return vec![TimeSlot {
			start: window_start,
			end: window_end,
		}];
	}

	let mut sorted = busy.to_vec();
	sorted.sort_by_key(|interval| interval.start_time);

	let mut cursor = window_start;
	let mut free = Vec::new();
	for interval in sorted {
		if interval.start_time > cursor {
			free.push(TimeSlot {
				start: cursor,
				end: interval.start_time.min(window_end),
			});
		}
		// Nested intervals must never pull the cursor backwards
		cursor = cursor.max(interval.end_time);
	}
	if cursor < window_end {
		free.push(TimeSlot {
			start: cursor,
			end: window_end,
		});
	}
	free
}
