//! Persisted records, the on-disk store, and the adapters that feed the
//! planner and absorb what it produces.

use crate::availability::{DailyWindow, Weekday, WeekTemplate};
use crate::scheduler::{
	self, BlockSource, BusyInterval, SchedulableTask, ScheduleBlock, SchedulingConfig,
	SchedulingRequest, SchedulingResponse,
};
use crate::time::{ensure_utc, next_half_hour, now_utc};
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Conversion failures between stored records and planner values. These are
/// caller bugs; the planner itself never raises.
#[derive(Error, Debug)]
pub enum AdapterError {
	#[error("task {title:?} has never been saved and has no id")]
	UnsavedTask { title: String },
	#[error("schedule item starting {start} does not end after it starts")]
	EmptyInterval { start: DateTime<Utc> },
	#[error("{day} window does not end after it starts")]
	WindowOrder { day: Weekday },
}

#[derive(Error, Debug)]
pub enum EventToItemError {
	#[error("Error parsing timezone")]
	TzError(#[from] chrono_tz::ParseError),
	#[error("Error parsing date string")]
	ChronoError(#[from] chrono::ParseError),
	#[error("Malformed event")]
	MalformedEvent,
}

/// A task as it sits in the store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredTask {
	/// Assigned on the first save; a task without one cannot be planned.
	pub id: Option<i64>,
	pub user_id: i64,
	pub title: String,
	pub description: Option<String>,
	/// Minutes of work, 1 through 480.
	pub expected_duration_minutes: i64,
	/// Short pointers the user attached while capturing the task.
	pub tips: Option<Vec<String>>,
	pub deadline: Option<DateTime<Utc>>,
	pub priority: u8,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// One committed calendar entry, imported or planner-made.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredScheduleItem {
	pub id: Option<i64>,
	pub user_id: i64,
	pub task_id: Option<i64>,
	pub start_time: DateTime<Utc>,
	pub end_time: DateTime<Utc>,
	/// "task" for planner output, "import" for calendar imports.
	pub source: String,
	pub title: Option<String>,
	pub description: Option<String>,
}

/// One availability row: a weekday plus a local start/end pair.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoredWindow {
	pub day_of_week: Weekday,
	pub start_time: NaiveTime,
	pub end_time: NaiveTime,
}

/// The user's single weekly availability record, kept as flat rows the way
/// it would live in a table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredAvailability {
	pub user_id: i64,
	pub windows: Vec<StoredWindow>,
}

/// Convert a stored task into the planner's value type.
pub fn task_to_schedulable(task: &StoredTask) -> Result<SchedulableTask, AdapterError> {
	let id = task.id.ok_or_else(|| AdapterError::UnsavedTask {
		title: task.title.clone(),
	})?;
	Ok(SchedulableTask {
		id,
		title: task.title.clone(),
		description: task.description.clone(),
		expected_duration_minutes: task.expected_duration_minutes,
		deadline: task.deadline.map(ensure_utc),
		priority: task.priority,
	})
}

/// Convert a committed calendar entry into a busy interval, normalizing both
/// endpoints to UTC on the way through.
pub fn item_to_busy_interval(item: &StoredScheduleItem) -> Result<BusyInterval, AdapterError> {
	let start_time = ensure_utc(item.start_time);
	let end_time = ensure_utc(item.end_time);
	if end_time <= start_time {
		return Err(AdapterError::EmptyInterval { start: start_time });
	}
	Ok(BusyInterval {
		task_id: item.task_id,
		start_time,
		end_time,
		title: item.title.clone(),
	})
}

/// Group the flat availability rows into the planner's weekly template.
pub fn availability_to_template(
	availability: &StoredAvailability,
) -> Result<WeekTemplate, AdapterError> {
	for window in &availability.windows {
		if window.end_time <= window.start_time {
			return Err(AdapterError::WindowOrder {
				day: window.day_of_week,
			});
		}
	}
	Ok(WeekTemplate::from_windows(availability.windows.iter().map(
		|window| {
			(
				window.day_of_week,
				DailyWindow {
					start: window.start_time,
					end: window.end_time,
				},
			)
		},
	)))
}

/// Turn a planner block into the calendar entry the store persists.
#[must_use]
pub fn block_to_item(block: &ScheduleBlock, user_id: i64) -> StoredScheduleItem {
	StoredScheduleItem {
		id: None,
		user_id,
		task_id: Some(block.task_id),
		start_time: block.start_time,
		end_time: block.end_time,
		source: block.source.to_string(),
		title: block.title.clone(),
		description: block.description.clone(),
	}
}

fn planner_made(item: &StoredScheduleItem) -> bool {
	item.source == BlockSource::Task.to_string()
}

/// The database struct, as stored on disk.
#[derive(Serialize, Deserialize, Clone)]
pub struct Store {
	pub user_id: i64,
	/// Counter backing task id assignment.
	pub next_task_id: i64,
	pub tasks: BTreeMap<i64, StoredTask>,
	pub items: Vec<StoredScheduleItem>,
	pub availability: StoredAvailability,
	pub config: SchedulingConfig,
}

impl Default for Store {
	#[allow(clippy::unwrap_used)]
	fn default() -> Self {
		let nine_to_five = |day| StoredWindow {
			day_of_week: day,
			start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
			end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
		};
		Self {
			user_id: 1,
			next_task_id: 1,
			tasks: BTreeMap::default(),
			items: vec![],
			availability: StoredAvailability {
				user_id: 1,
				windows: vec![
					nine_to_five(Weekday::Mon),
					nine_to_five(Weekday::Tue),
					nine_to_five(Weekday::Wed),
					nine_to_five(Weekday::Thu),
					nine_to_five(Weekday::Fri),
				],
			},
			config: SchedulingConfig::default(),
		}
	}
}

impl Store {
	/// Save a task, assigning an id if it has none yet. Returns the id.
	pub fn add_task(&mut self, mut task: StoredTask) -> i64 {
		let id = task.id.unwrap_or_else(|| {
			let id = self.next_task_id;
			self.next_task_id += 1;
			id
		});
		task.id = Some(id);
		task.updated_at = now_utc();
		self.tasks.insert(id, task);
		id
	}

	/// Drop a task and any planner blocks that were committed for it.
	pub fn remove_task(&mut self, id: i64) -> Option<StoredTask> {
		self.items
			.retain(|item| item.task_id != Some(id) || !planner_made(item));
		self.tasks.remove(&id)
	}

	/// Replace the windows on one weekday.
	pub fn set_windows(&mut self, day: Weekday, windows: Vec<(NaiveTime, NaiveTime)>) {
		self.availability
			.windows
			.retain(|window| window.day_of_week != day);
		self.availability
			.windows
			.extend(windows.into_iter().map(|(start_time, end_time)| StoredWindow {
				day_of_week: day,
				start_time,
				end_time,
			}));
		self.availability
			.windows
			.sort_by_key(|window| (window.day_of_week, window.start_time));
	}

	/// Run the planner over the store as it stands. Previously committed
	/// planner blocks are ignored as busy time, since a new plan replaces
	/// them; imported and manual entries stay busy.
	pub fn plan(&self) -> Result<SchedulingResponse, AdapterError> {
		let tasks = self
			.tasks
			.values()
			.map(task_to_schedulable)
			.collect::<Result<Vec<_>, _>>()?;
		let busy_intervals = self
			.items
			.iter()
			.filter(|item| !planner_made(item))
			.map(item_to_busy_interval)
			.collect::<Result<Vec<_>, _>>()?;
		let availability = availability_to_template(&self.availability)?;
		let request = SchedulingRequest {
			tasks,
			busy_intervals,
			availability,
			config: self.config.clone(),
			start_time: next_half_hour(now_utc()),
		};
		Ok(scheduler::schedule(&request))
	}

	/// Persist a plan, replacing whatever the planner committed before.
	pub fn commit_plan(&mut self, response: &SchedulingResponse) {
		self.items.retain(|item| !planner_made(item));
		self.items.extend(
			response
				.schedule_blocks
				.iter()
				.map(|block| block_to_item(block, self.user_id)),
		);
		self.items.sort_by_key(|item| item.start_time);
	}
}

impl TryFrom<IcalEvent> for StoredScheduleItem {
	type Error = EventToItemError;

	fn try_from(event: IcalEvent) -> Result<Self, Self::Error> {
		let properties: HashMap<_, _> = event
			.properties
			.iter()
			.map(|prop| (prop.name.as_str(), prop))
			.collect();
		let title = properties.get("SUMMARY").and_then(|e| e.value.clone());
		let Some(start) = properties.get("DTSTART") else {
			return Err(EventToItemError::MalformedEvent);
		};
		let Some(end) = properties.get("DTEND") else {
			return Err(EventToItemError::MalformedEvent);
		};
		let start_time = date_conversion(start)?;
		let end_time = date_conversion(end)?;
		if end_time <= start_time {
			return Err(EventToItemError::MalformedEvent);
		}
		Ok(StoredScheduleItem {
			id: None,
			user_id: 0,
			task_id: None,
			start_time,
			end_time,
			source: "import".into(),
			title,
			description: None,
		})
	}
}

/// Read a DTSTART/DTEND property: either a UTC `...Z` literal, or a local
/// stamp carrying a `TZID` parameter.
pub fn date_conversion(property: &Property) -> Result<DateTime<Utc>, EventToItemError> {
	let value = property
		.value
		.clone()
		.ok_or(EventToItemError::MalformedEvent)?;
	if let Some(stripped) = value.strip_suffix('Z') {
		let date = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S")?;
		return Ok(date.and_utc());
	}

	let params = property
		.params
		.as_ref()
		.ok_or(EventToItemError::MalformedEvent)?;
	let tz = params
		.iter()
		.find(|(id, _)| id == "TZID")
		.and_then(|(_, values)| values.first())
		.ok_or(EventToItemError::MalformedEvent)?;
	let tz: Tz = tz.parse()?;

	let date = NaiveDateTime::parse_from_str(&value, "%Y%m%dT%H%M%S")?;
	let date = tz
		.from_local_datetime(&date)
		.earliest()
		.ok_or(EventToItemError::MalformedEvent)?;
	Ok(ensure_utc(date))
}
