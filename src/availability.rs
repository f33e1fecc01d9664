//! The recurring weekly availability template, and its expansion into
//! concrete free UTC intervals for one week at a time.

use crate::scheduler::BusyInterval;
use crate::slots::{subtract_busy, AvailableSlots};
use crate::time::from_user_zone;
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Days of the week, numbered from zero the ISO way.
#[derive(
	Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Weekday {
	Mon,
	Tue,
	Wed,
	Thu,
	Fri,
	Sat,
	Sun,
}

impl Weekday {
	/// All days in template order.
	pub const ALL: [Weekday; 7] = [
		Weekday::Mon,
		Weekday::Tue,
		Weekday::Wed,
		Weekday::Thu,
		Weekday::Fri,
		Weekday::Sat,
		Weekday::Sun,
	];

	/// Numeric encoding, 0 = Monday through 6 = Sunday.
	#[must_use]
	pub fn number(self) -> u8 {
		self as u8
	}
}

impl From<chrono::Weekday> for Weekday {
	fn from(day: chrono::Weekday) -> Self {
		match day {
			chrono::Weekday::Mon => Weekday::Mon,
			chrono::Weekday::Tue => Weekday::Tue,
			chrono::Weekday::Wed => Weekday::Wed,
			chrono::Weekday::Thu => Weekday::Thu,
			chrono::Weekday::Fri => Weekday::Fri,
			chrono::Weekday::Sat => Weekday::Sat,
			chrono::Weekday::Sun => Weekday::Sun,
		}
	}
}

impl fmt::Display for Weekday {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Weekday::Mon => "Monday",
			Weekday::Tue => "Tuesday",
			Weekday::Wed => "Wednesday",
			Weekday::Thu => "Thursday",
			Weekday::Fri => "Friday",
			Weekday::Sat => "Saturday",
			Weekday::Sun => "Sunday",
		};
		write!(f, "{name}")
	}
}

/// One contiguous stretch of working time on some weekday, as the user's
/// local wall clock. Must end after it starts.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailyWindow {
	pub start: NaiveTime,
	pub end: NaiveTime,
}

/// The weekday -> windows template. A weekday with no entry is a day off.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct WeekTemplate {
	pub windows: BTreeMap<Weekday, Vec<DailyWindow>>,
}

impl WeekTemplate {
	/// Build a template from flat rows, grouping by weekday and sorting each
	/// day's windows by start time.
	pub fn from_windows(rows: impl IntoIterator<Item = (Weekday, DailyWindow)>) -> Self {
		let mut windows: BTreeMap<Weekday, Vec<DailyWindow>> = BTreeMap::new();
		for (day, window) in rows {
			windows.entry(day).or_default().push(window);
		}
		for day_windows in windows.values_mut() {
			day_windows.sort_by_key(|window| window.start);
		}
		Self { windows }
	}

	/// Expand the template against one week of real time, starting at
	/// `week_anchor` and running through the following Sunday.
	///
	/// Windows are projected from the user's zone to UTC day by day, the
	/// anchor day is clamped so nothing lands before the anchor, and every
	/// projected window has the overlapping `busy` intervals subtracted.
	#[must_use]
	pub fn materialize_week(
		&self,
		week_anchor: DateTime<Utc>,
		busy: &[BusyInterval],
		zone: &str,
	) -> AvailableSlots {
		let mut available = AvailableSlots::default();
		let anchor_date = week_anchor.date_naive();
		let anchor_index = i64::from(Weekday::from(week_anchor.weekday()).number());

		for day_offset in anchor_index..7 {
			let current_date = anchor_date + Duration::days(day_offset - anchor_index);
			let weekday = Weekday::from(current_date.weekday());
			let Some(day_windows) = self.windows.get(&weekday) else {
				continue;
			};

			for window in day_windows {
				let mut window_start = from_user_zone(current_date.and_time(window.start), zone);
				let window_end = from_user_zone(current_date.and_time(window.end), zone);

				if day_offset == anchor_index {
					if window_end <= week_anchor {
						continue;
					}
					if window_start < week_anchor {
						window_start = week_anchor;
					}
				}

				let overlapping: Vec<&BusyInterval> = busy
					.iter()
					.filter(|interval| {
						interval.start_time < window_end && interval.end_time > window_start
					})
					.collect();

				available.push_slots(subtract_busy(window_start, window_end, &overlapping));
			}
		}
		available
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]
	use super::{DailyWindow, Weekday, WeekTemplate};
	use crate::scheduler::BusyInterval;
	use chrono::{DateTime, NaiveTime, TimeZone, Utc};

	fn window(start: (u32, u32), end: (u32, u32)) -> DailyWindow {
		DailyWindow {
			start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
			end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
		}
	}

	fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
	}

	#[test]
	fn rows_group_by_day_and_sort_by_start() {
		let template = WeekTemplate::from_windows([
			(Weekday::Mon, window((13, 0), (17, 0))),
			(Weekday::Wed, window((9, 0), (12, 0))),
			(Weekday::Mon, window((9, 0), (12, 0))),
		]);
		assert_eq!(
			template.windows[&Weekday::Mon],
			vec![window((9, 0), (12, 0)), window((13, 0), (17, 0))]
		);
		assert_eq!(template.windows[&Weekday::Wed].len(), 1);
		assert!(!template.windows.contains_key(&Weekday::Fri));
	}

	#[test]
	fn anchor_day_window_is_clamped_to_the_anchor() {
		let template =
			WeekTemplate::from_windows([(Weekday::Mon, window((9, 0), (17, 0)))]);
		// 2024-06-03 is a Monday; the anchor falls inside the window.
		let anchor = utc(2024, 6, 3, 9, 30);
		let slots = template.materialize_week(anchor, &[], "UTC");
		assert_eq!(slots.slots.len(), 1);
		assert_eq!(slots.slots[0].start, anchor);
		assert_eq!(slots.slots[0].end, utc(2024, 6, 3, 17, 0));
		assert_eq!(slots.total_minutes, 450);
	}

	#[test]
	fn anchor_day_window_already_over_is_skipped() {
		let template = WeekTemplate::from_windows([(Weekday::Mon, window((8, 0), (10, 0)))]);
		let slots = template.materialize_week(utc(2024, 6, 3, 12, 0), &[], "UTC");
		assert!(slots.slots.is_empty());
		assert_eq!(slots.total_minutes, 0);
	}

	#[test]
	fn window_ending_exactly_at_the_anchor_is_skipped() {
		let template = WeekTemplate::from_windows([(Weekday::Mon, window((8, 0), (10, 0)))]);
		let slots = template.materialize_week(utc(2024, 6, 3, 10, 0), &[], "UTC");
		assert!(slots.slots.is_empty());
	}

	#[test]
	fn later_days_are_not_clamped() {
		let template = WeekTemplate::from_windows([
			(Weekday::Mon, window((8, 0), (17, 0))),
			(Weekday::Tue, window((9, 0), (18, 0))),
			(Weekday::Wed, window((10, 0), (19, 0))),
		]);
		// Anchor on Tuesday 10:00: Monday is behind us, Tuesday clamps,
		// Wednesday materializes whole.
		let anchor = utc(2024, 6, 4, 10, 0);
		let slots = template.materialize_week(anchor, &[], "UTC");
		assert_eq!(slots.slots.len(), 2);
		assert_eq!(slots.slots[0].start, anchor);
		assert_eq!(slots.slots[0].end, utc(2024, 6, 4, 18, 0));
		assert_eq!(slots.slots[1].start, utc(2024, 6, 5, 10, 0));
		assert_eq!(slots.slots[1].end, utc(2024, 6, 5, 19, 0));
		assert_eq!(slots.total_minutes, 8 * 60 + 9 * 60);
	}

	#[test]
	fn busy_intervals_are_subtracted_inside_windows() {
		let template = WeekTemplate::from_windows([(Weekday::Mon, window((9, 0), (17, 0)))]);
		let meeting = BusyInterval {
			task_id: None,
			start_time: utc(2024, 6, 3, 10, 0),
			end_time: utc(2024, 6, 3, 11, 0),
			title: Some("standup".into()),
		};
		let slots = template.materialize_week(utc(2024, 6, 3, 9, 30), &[meeting], "UTC");
		assert_eq!(slots.slots.len(), 2);
		assert_eq!(slots.slots[0].start, utc(2024, 6, 3, 9, 30));
		assert_eq!(slots.slots[0].end, utc(2024, 6, 3, 10, 0));
		assert_eq!(slots.slots[1].start, utc(2024, 6, 3, 11, 0));
		assert_eq!(slots.slots[1].end, utc(2024, 6, 3, 17, 0));
	}

	#[test]
	fn local_windows_project_into_utc() {
		// Monday 09:00-12:00 in New York is 13:00-16:00 UTC during June.
		let template = WeekTemplate::from_windows([(Weekday::Mon, window((9, 0), (12, 0)))]);
		let slots =
			template.materialize_week(utc(2024, 6, 3, 9, 30), &[], "America/New_York");
		assert_eq!(slots.slots.len(), 1);
		assert_eq!(slots.slots[0].start, utc(2024, 6, 3, 13, 0));
		assert_eq!(slots.slots[0].end, utc(2024, 6, 3, 16, 0));
	}

	#[test]
	fn spring_forward_shrinks_a_straddling_window() {
		// 2024-03-10 in New York skips 02:00-03:00; a 01:00-04:00 window
		// only holds two real hours.
		let template = WeekTemplate::from_windows([(Weekday::Sun, window((1, 0), (4, 0)))]);
		let slots = template.materialize_week(utc(2024, 3, 10, 6, 0), &[], "America/New_York");
		assert_eq!(slots.slots.len(), 1);
		assert_eq!(slots.total_minutes, 120);
		assert_eq!(slots.slots[0].start, utc(2024, 3, 10, 6, 0));
		assert_eq!(slots.slots[0].end, utc(2024, 3, 10, 8, 0));
	}

	#[test]
	fn empty_template_materializes_nothing() {
		let slots =
			WeekTemplate::default().materialize_week(utc(2024, 6, 3, 9, 30), &[], "UTC");
		assert!(slots.slots.is_empty());
	}
}
