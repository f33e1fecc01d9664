//! The greedy planner: rank tasks by urgency, then walk the free slots in
//! order and pack tasks into them, optionally splitting long tasks across
//! slot boundaries.

use crate::availability::{Weekday, WeekTemplate};
use crate::slots::{AvailableSlots, TimeSlot};
use crate::time::next_weekday;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info};

/// Sort rank handed to tasks with no deadline; later than any real one.
const NO_DEADLINE_RANK: i64 = 999_999_999;

/// A task the planner may place, detached from whatever storage it came from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SchedulableTask {
	pub id: i64,
	pub title: String,
	pub description: Option<String>,
	/// Minutes of work the task is expected to take, 1 through 480.
	pub expected_duration_minutes: i64,
	pub deadline: Option<DateTime<Utc>>,
	/// 0 is the most urgent, 4 the least.
	pub priority: u8,
}

impl SchedulableTask {
	fn fits_within(&self, minutes: i64) -> bool {
		self.expected_duration_minutes <= minutes
	}
}

/// An occupied UTC interval the planner must leave untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BusyInterval {
	pub task_id: Option<i64>,
	pub start_time: DateTime<Utc>,
	pub end_time: DateTime<Utc>,
	pub title: Option<String>,
}

/// Where a schedule block came from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockSource {
	Task,
}

impl fmt::Display for BlockSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BlockSource::Task => write!(f, "task"),
		}
	}
}

/// One placed stretch of work on the calendar.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ScheduleBlock {
	pub task_id: i64,
	pub start_time: DateTime<Utc>,
	pub end_time: DateTime<Utc>,
	pub source: BlockSource,
	pub title: Option<String>,
	pub description: Option<String>,
}

/// Knobs for one planning run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SchedulingConfig {
	/// How many weeks ahead the planner is willing to look.
	pub max_scheduling_weeks: u32,
	/// Whether an over-long task may be fragmented across slots.
	pub allow_splitting: bool,
	/// IANA zone the availability template is written in.
	pub timezone: String,
}

impl Default for SchedulingConfig {
	fn default() -> Self {
		Self {
			max_scheduling_weeks: 12,
			allow_splitting: true,
			timezone: "UTC".into(),
		}
	}
}

/// Everything one planning run consumes.
#[derive(Clone, Debug)]
pub struct SchedulingRequest {
	pub tasks: Vec<SchedulableTask>,
	pub busy_intervals: Vec<BusyInterval>,
	pub availability: WeekTemplate,
	pub config: SchedulingConfig,
	/// The earliest possible block start, already rounded to a half hour.
	pub start_time: DateTime<Utc>,
}

/// The planner's output: placed blocks, plus the tasks that found no room.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulingResponse {
	pub schedule_blocks: Vec<ScheduleBlock>,
	pub warnings: Vec<SchedulableTask>,
}

/// Order tasks by urgency: nearest deadline first, then priority, then
/// longest duration. Deadline-less tasks sort after every deadlined one.
#[must_use]
pub fn rank_tasks(mut tasks: Vec<SchedulableTask>, now: DateTime<Utc>) -> Vec<SchedulableTask> {
	tasks.sort_by_key(|task| {
		let deadline_rank = task
			.deadline
			.map_or(NO_DEADLINE_RANK, |deadline| (deadline - now).num_minutes());
		(
			deadline_rank,
			i64::from(task.priority),
			-task.expected_duration_minutes,
		)
	});
	tasks
}

/// Run one full planning pass over the request.
///
/// The first week runs from the anchor to the next Monday midnight, every
/// further week is a straight seven days; each is materialized against the
/// busy intervals that start inside it, and the ranked tasks are packed into
/// the combined slots.
#[must_use]
pub fn schedule(request: &SchedulingRequest) -> SchedulingResponse {
	if request.tasks.is_empty() {
		return SchedulingResponse::default();
	}

	let ranked = rank_tasks(request.tasks.clone(), request.start_time);

	let mut week_end = next_weekday(request.start_time, Weekday::Mon);
	let mut available = request.availability.materialize_week(
		request.start_time,
		&week_busy(&request.busy_intervals, request.start_time, week_end),
		&request.config.timezone,
	);
	for _ in 1..request.config.max_scheduling_weeks {
		let week_start = week_end;
		week_end = week_start + Duration::days(7);
		available.merge(request.availability.materialize_week(
			week_start,
			&week_busy(&request.busy_intervals, week_start, week_end),
			&request.config.timezone,
		));
	}
	debug!(
		slots = available.slots.len(),
		free_minutes = available.total_minutes,
		weeks = request.config.max_scheduling_weeks,
		"materialized availability"
	);

	let (schedule_blocks, warnings) =
		place_tasks_in_slots(ranked, &available, request.config.allow_splitting);
	info!(
		blocks = schedule_blocks.len(),
		unscheduled = warnings.len(),
		"planning finished"
	);
	SchedulingResponse {
		schedule_blocks,
		warnings,
	}
}

/// The busy intervals that start inside `[week_start, week_end)`.
fn week_busy(
	busy: &[BusyInterval],
	week_start: DateTime<Utc>,
	week_end: DateTime<Utc>,
) -> Vec<BusyInterval> {
	busy.iter()
		.filter(|interval| week_start <= interval.start_time && interval.start_time < week_end)
		.cloned()
		.collect()
}

/// Walk the free slots in order, consuming tasks from the ranked queue.
/// Whatever is still queued afterwards comes back as unscheduled.
#[must_use]
pub fn place_tasks_in_slots(
	tasks: Vec<SchedulableTask>,
	available: &AvailableSlots,
	allow_splitting: bool,
) -> (Vec<ScheduleBlock>, Vec<SchedulableTask>) {
	let mut queue: VecDeque<SchedulableTask> = tasks.into();
	let mut blocks = Vec::new();
	for slot in &available.slots {
		blocks.extend(fill_single_slot(slot, &mut queue, allow_splitting));
	}
	(blocks, queue.into_iter().collect())
}

fn fill_single_slot(
	slot: &TimeSlot,
	queue: &mut VecDeque<SchedulableTask>,
	allow_splitting: bool,
) -> Vec<ScheduleBlock> {
	let mut cursor = slot.start;
	let mut remaining = slot.duration_minutes();
	let mut blocks = Vec::new();

	while remaining > 0 {
		let Some(mut task) = queue.pop_front() else {
			break;
		};

		if !task.fits_within(remaining) {
			if allow_splitting {
				// Fill the slot with the head of the task and requeue the
				// rest at the front of the line.
				let mut remainder = task.clone();
				remainder.expected_duration_minutes -= remaining;
				task.expected_duration_minutes = remaining;
				queue.push_front(remainder);
			} else {
				let fitting = queue.iter().position(|task| task.fits_within(remaining));
				if let Some(swap) = fitting.and_then(|index| queue.remove(index)) {
					// The head keeps its place in line; the slot goes to the
					// first task further back that happens to fit.
					queue.push_front(task);
					task = swap;
				} else {
					queue.push_front(task);
					break;
				}
			}
		}

		let block = block_for(&task, cursor);
		cursor = block.end_time;
		remaining -= task.expected_duration_minutes;
		blocks.push(block);
	}
	blocks
}

fn block_for(task: &SchedulableTask, start_time: DateTime<Utc>) -> ScheduleBlock {
	ScheduleBlock {
		task_id: task.id,
		start_time,
		end_time: start_time + Duration::minutes(task.expected_duration_minutes),
		source: BlockSource::Task,
		title: Some(task.title.clone()),
		description: task.description.clone(),
	}
}
