//! UTC-first time helpers.
//! Everything the planner reasons about is UTC; the user's zone only shows up
//! at the edges, when wall-clock input comes in or agenda output goes out.

use crate::availability::Weekday;
use chrono::{
	DateTime, Datelike, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

/// The current wall clock as a UTC instant.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
	Utc::now()
}

/// Canonicalize a zoned instant to UTC, whatever zone it arrives in.
/// Idempotent; optional instants pass through via `Option::map`.
#[must_use]
pub fn ensure_utc<Z: TimeZone>(instant: DateTime<Z>) -> DateTime<Utc> {
	instant.with_timezone(&Utc)
}

/// Look up an IANA zone by name, falling back to UTC when the name is unknown.
fn parse_zone(zone: &str) -> Tz {
	zone.parse().unwrap_or(Tz::UTC)
}

/// Project a UTC instant into the user's zone for display.
#[must_use]
pub fn to_user_zone(instant: DateTime<Utc>, zone: &str) -> DateTime<Tz> {
	instant.with_timezone(&parse_zone(zone))
}

/// Localize a naive wall-clock reading under the user's zone, then convert to
/// UTC. Ambiguous wall times (DST fall-back) resolve to the earlier instant;
/// wall times inside a spring-forward gap are pushed an hour past it.
#[must_use]
pub fn from_user_zone(local: NaiveDateTime, zone: &str) -> DateTime<Utc> {
	let tz = parse_zone(zone);
	let localized = match tz.from_local_datetime(&local) {
		LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => instant,
		LocalResult::None => tz
			.from_local_datetime(&(local + Duration::hours(1)))
			.earliest()
			// A gap wider than an hour; read the wall clock as UTC instead.
			.unwrap_or_else(|| tz.from_utc_datetime(&local)),
	};
	localized.with_timezone(&Utc)
}

/// Round strictly forward to the next `:00` or `:30` wall minute.
/// An instant already on a half-hour advances a full 30 minutes.
#[must_use]
pub fn next_half_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
	let seconds = instant.timestamp();
	let rounded = seconds - seconds.rem_euclid(30 * 60) + 30 * 60;
	// Only fails many millennia out of range
	DateTime::from_timestamp(rounded, 0).unwrap_or(instant)
}

/// The next UTC midnight falling on `target`. An anchor already on `target`
/// moves forward a full week.
#[must_use]
pub fn next_weekday(from: DateTime<Utc>, target: Weekday) -> DateTime<Utc> {
	let current = i64::from(Weekday::from(from.weekday()).number());
	let days_ahead = (i64::from(target.number()) - current - 1).rem_euclid(7) + 1;
	from.date_naive().and_time(NaiveTime::MIN).and_utc() + Duration::days(days_ahead)
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]
	use super::{ensure_utc, from_user_zone, next_half_hour, next_weekday, to_user_zone};
	use crate::availability::Weekday;
	use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};

	fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
	}

	fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> chrono::NaiveDateTime {
		NaiveDate::from_ymd_opt(y, mo, d)
			.unwrap()
			.and_hms_opt(h, mi, 0)
			.unwrap()
	}

	#[test]
	fn ensure_utc_converts_offsets() {
		let plus_two: DateTime<FixedOffset> = "2024-06-03T10:00:00+02:00".parse().unwrap();
		assert_eq!(ensure_utc(plus_two), utc(2024, 6, 3, 8, 0, 0));
		// Idempotent once a value is in UTC.
		assert_eq!(ensure_utc(ensure_utc(plus_two)), utc(2024, 6, 3, 8, 0, 0));
		let absent: Option<DateTime<FixedOffset>> = None;
		assert_eq!(absent.map(ensure_utc), None);
	}

	#[test]
	fn half_hour_rounds_forward() {
		assert_eq!(
			next_half_hour(utc(2024, 6, 3, 9, 15, 0)),
			utc(2024, 6, 3, 9, 30, 0)
		);
		assert_eq!(
			next_half_hour(utc(2024, 6, 3, 9, 45, 12)),
			utc(2024, 6, 3, 10, 0, 0)
		);
	}

	#[test]
	fn half_hour_advances_exact_marks() {
		assert_eq!(
			next_half_hour(utc(2024, 6, 3, 9, 0, 0)),
			utc(2024, 6, 3, 9, 30, 0)
		);
		assert_eq!(
			next_half_hour(utc(2024, 6, 3, 9, 30, 0)),
			utc(2024, 6, 3, 10, 0, 0)
		);
		assert_eq!(
			next_half_hour(utc(2024, 6, 3, 23, 45, 0)),
			utc(2024, 6, 4, 0, 0, 0)
		);
	}

	#[test]
	fn half_hour_lands_on_marks() {
		for minute in [0, 1, 17, 29, 30, 31, 59] {
			let rounded = next_half_hour(utc(2024, 6, 3, 12, minute, 7));
			assert!(rounded.minute() == 0 || rounded.minute() == 30);
			assert_eq!(rounded.second(), 0);
			assert!(rounded > utc(2024, 6, 3, 12, minute, 7));
		}
	}

	#[test]
	fn next_weekday_skips_a_full_week_from_same_day() {
		// 2024-06-03 is a Monday; asking for Monday must not return today.
		assert_eq!(
			next_weekday(utc(2024, 6, 3, 9, 30, 0), Weekday::Mon),
			utc(2024, 6, 10, 0, 0, 0)
		);
	}

	#[test]
	fn next_weekday_finds_the_nearest_later_day() {
		// Wednesday 2024-06-05 -> the following Monday.
		assert_eq!(
			next_weekday(utc(2024, 6, 5, 13, 0, 0), Weekday::Mon),
			utc(2024, 6, 10, 0, 0, 0)
		);
		// Monday -> Friday of the same week.
		assert_eq!(
			next_weekday(utc(2024, 6, 3, 9, 30, 0), Weekday::Fri),
			utc(2024, 6, 7, 0, 0, 0)
		);
	}

	#[test]
	fn user_zone_round_trips_in_summer() {
		// New York is UTC-4 in June.
		let local = naive(2024, 6, 3, 9, 0);
		let instant = from_user_zone(local, "America/New_York");
		assert_eq!(instant, utc(2024, 6, 3, 13, 0, 0));
		let back = to_user_zone(instant, "America/New_York");
		assert_eq!(back.naive_local(), local);
	}

	#[test]
	fn unknown_zone_falls_back_to_utc() {
		let local = naive(2024, 6, 3, 9, 0);
		assert_eq!(from_user_zone(local, "Mars/Olympus_Mons"), utc(2024, 6, 3, 9, 0, 0));
		assert_eq!(
			to_user_zone(utc(2024, 6, 3, 9, 0, 0), "Mars/Olympus_Mons").naive_local(),
			local
		);
	}

	#[test]
	fn ambiguous_wall_time_takes_the_earlier_instant() {
		// 01:30 happens twice on 2024-11-03 in New York; EDT comes first.
		let instant = from_user_zone(naive(2024, 11, 3, 1, 30), "America/New_York");
		assert_eq!(instant, utc(2024, 11, 3, 5, 30, 0));
	}

	#[test]
	fn skipped_wall_time_moves_past_the_gap() {
		// 02:30 does not exist on 2024-03-10 in New York.
		let instant = from_user_zone(naive(2024, 3, 10, 2, 30), "America/New_York");
		assert_eq!(instant, utc(2024, 3, 10, 7, 30, 0));
	}
}
