#![allow(clippy::unwrap_used)]

use chrono::{NaiveDateTime, NaiveTime};
use collie::{
	availability::Weekday,
	db::{Store, StoredScheduleItem, StoredTask},
	scheduler::SchedulingConfig,
	time::{from_user_zone, now_utc, to_user_zone},
};
use ical::parser::ical::component::IcalEvent;
use itertools::Itertools;
use std::{fs::File, io::BufReader};

pub fn view(store: &Store) {
	eprintln!("Begin agenda listing...");
	for item in store.items.iter().sorted_by_key(|item| item.start_time) {
		let start = to_user_zone(item.start_time, &store.config.timezone);
		let end = to_user_zone(item.end_time, &store.config.timezone);
		let title = item.title.as_deref().unwrap_or("(untitled)");
		println!("{}\t{}\t{title}", start.to_rfc2822(), end.to_rfc2822());
	}
	eprintln!("End agenda listing.");
	if !store.tasks.is_empty() {
		eprintln!("Open tasks:");
		for task in store.tasks.values() {
			match &task.tips {
				Some(tips) => eprintln!("{}\t(tips: {})", task.title, tips.join(", ")),
				None => eprintln!("{}", task.title),
			}
		}
	}
}

pub fn add(store: &mut Store) {
	loop {
		let title: String = dialoguer::Input::new()
			.with_prompt("Task title")
			.interact()
			.unwrap();
		let description: String = dialoguer::Input::new()
			.with_prompt("Description (empty for none)")
			.allow_empty(true)
			.interact()
			.unwrap();
		let tips: String = dialoguer::Input::new()
			.with_prompt("Tips (comma separated, empty for none)")
			.allow_empty(true)
			.interact()
			.unwrap();
		let tips: Vec<String> = tips
			.split(',')
			.map(str::trim)
			.filter(|tip| !tip.is_empty())
			.map(str::to_owned)
			.collect();
		let minutes: i64 = dialoguer::Input::new()
			.with_prompt("Expected duration (minutes, 1-480)")
			.validate_with(|minutes: &i64| {
				if (1..=480).contains(minutes) {
					Ok(())
				} else {
					Err("Must be between 1 and 480 minutes")
				}
			})
			.interact()
			.unwrap();
		let deadline: String = dialoguer::Input::new()
			.with_prompt("Deadline (YYYY-MM-DD HH:MM local, empty for none)")
			.allow_empty(true)
			.validate_with(|input: &String| {
				if input.is_empty()
					|| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M").is_ok()
				{
					Ok(())
				} else {
					Err("Use YYYY-MM-DD HH:MM")
				}
			})
			.interact()
			.unwrap();
		let deadline = NaiveDateTime::parse_from_str(&deadline, "%Y-%m-%d %H:%M")
			.ok()
			.map(|naive| from_user_zone(naive, &store.config.timezone));
		let priority: u8 = dialoguer::Input::new()
			.with_prompt("Priority (0 most urgent, 4 least)")
			.default(2)
			.validate_with(|priority: &u8| {
				if *priority <= 4 {
					Ok(())
				} else {
					Err("Must be 0 through 4")
				}
			})
			.interact()
			.unwrap();

		let task = StoredTask {
			id: None,
			user_id: store.user_id,
			title,
			description: (!description.is_empty()).then_some(description),
			expected_duration_minutes: minutes,
			tips: (!tips.is_empty()).then_some(tips),
			deadline,
			priority,
			created_at: now_utc(),
			updated_at: now_utc(),
		};
		eprintln!("{task:?}");
		if dialoguer::Confirm::new()
			.with_prompt("OK?")
			.interact()
			.unwrap()
		{
			store.add_task(task);
			break;
		}
	}
}

pub fn remove(store: &mut Store) {
	let tasks: Vec<(i64, String)> = store
		.tasks
		.iter()
		.map(|(id, task)| (*id, task.title.clone()))
		.collect();
	if tasks.is_empty() {
		eprintln!("No tasks");
		return;
	}
	if let Some(index) = dialoguer::FuzzySelect::new()
		.items(&tasks.iter().map(|(_id, title)| title).collect::<Vec<_>>())
		.with_prompt("Task to remove? (or esc)")
		.interact_opt()
		.unwrap()
	{
		store.remove_task(tasks[index].0);
	}
}

pub fn availability(store: &mut Store) {
	for day in Weekday::ALL {
		let windows = store
			.availability
			.windows
			.iter()
			.filter(|window| window.day_of_week == day)
			.map(|window| {
				format!(
					"{}-{}",
					window.start_time.format("%H:%M"),
					window.end_time.format("%H:%M")
				)
			})
			.join(", ");
		if windows.is_empty() {
			eprintln!("{day}: day off");
		} else {
			eprintln!("{day}: {windows}");
		}
	}
	let Some(index) = dialoguer::FuzzySelect::new()
		.items(&Weekday::ALL.map(|day| day.to_string()))
		.with_prompt("Day to edit? (or esc)")
		.interact_opt()
		.unwrap()
	else {
		return;
	};
	let day = Weekday::ALL[index];
	let spec: String = dialoguer::Input::new()
		.with_prompt("Windows (e.g. 09:00-12:00, 13:00-17:00; empty for a day off)")
		.allow_empty(true)
		.validate_with(|spec: &String| parse_windows(spec).map(|_| ()))
		.interact()
		.unwrap();
	store.set_windows(day, parse_windows(&spec).unwrap());
}

fn parse_windows(spec: &str) -> Result<Vec<(NaiveTime, NaiveTime)>, &'static str> {
	let mut windows = spec
		.split(',')
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.map(|part| {
			let (start, end) = part.split_once('-').ok_or("Windows look like 09:00-17:00")?;
			let start = parse_time(start.trim())?;
			let end = parse_time(end.trim())?;
			if end > start {
				Ok((start, end))
			} else {
				Err("Windows must end after they start")
			}
		})
		.collect::<Result<Vec<_>, _>>()?;
	windows.sort_by_key(|&(start, _)| start);
	if windows.windows(2).any(|pair| pair[1].0 < pair[0].1) {
		return Err("Windows on one day must not overlap");
	}
	Ok(windows)
}

fn parse_time(input: &str) -> Result<NaiveTime, &'static str> {
	NaiveTime::parse_from_str(input, "%H:%M")
		.or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
		.map_err(|_| "Times look like 09:00")
}

pub fn options(store: &mut Store) {
	let max_scheduling_weeks: u32 = dialoguer::Input::new()
		.with_prompt("Planning horizon (weeks)")
		.default(store.config.max_scheduling_weeks)
		.validate_with(|weeks: &u32| {
			if *weeks > 0 {
				Ok(())
			} else {
				Err("At least one week")
			}
		})
		.interact()
		.unwrap();
	let allow_splitting = dialoguer::Confirm::new()
		.with_prompt("Allow splitting tasks across slots?")
		.default(store.config.allow_splitting)
		.interact()
		.unwrap();
	let timezone: String = dialoguer::Input::new()
		.with_prompt("Timezone (IANA name)")
		.default(store.config.timezone.clone())
		.validate_with(|zone: &String| {
			zone.parse::<chrono_tz::Tz>()
				.map(|_| ())
				.map_err(|_| "Unknown timezone")
		})
		.interact()
		.unwrap();
	store.config = SchedulingConfig {
		max_scheduling_weeks,
		allow_splitting,
		timezone,
	};
}

pub fn plan(store: &mut Store) {
	let response = match store.plan() {
		Ok(response) => response,
		Err(error) => {
			eprintln!("Planning failed: {error}");
			return;
		}
	};
	if response.schedule_blocks.is_empty() {
		eprintln!("Nothing could be placed");
	}
	for block in &response.schedule_blocks {
		let start = to_user_zone(block.start_time, &store.config.timezone);
		let end = to_user_zone(block.end_time, &store.config.timezone);
		let title = block.title.as_deref().unwrap_or("(untitled)");
		println!("{}\t{}\t{title}", start.to_rfc2822(), end.to_rfc2822());
	}
	if !response.warnings.is_empty() {
		let unplaced = response
			.warnings
			.iter()
			.map(|task| task.title.as_str())
			.collect_vec();
		eprintln!("Left unplaced:\n{unplaced:?}");
	}
	if !response.schedule_blocks.is_empty()
		&& dialoguer::Confirm::new()
			.with_prompt("Commit this plan?")
			.interact()
			.unwrap()
	{
		store.commit_plan(&response);
	}
}

pub fn import(store: &mut Store) {
	let source: String = dialoguer::Input::new()
		.with_prompt("Calendar link or path")
		.interact_text()
		.unwrap();
	let events = if source.starts_with("http") {
		let Ok(response) = reqwest::blocking::get(&source) else {
			println!("HTTP client failed");
			return;
		};
		read_events(BufReader::new(response))
	} else {
		let Ok(file) = File::open(&source) else {
			println!("Could not open {source}");
			return;
		};
		read_events(BufReader::new(file))
	};

	let mut imported = 0;
	'events: for event in events {
		let Ok(mut item): Result<StoredScheduleItem, _> = event.try_into() else {
			continue 'events;
		};
		item.user_id = store.user_id;
		println!("{item:?}");
		store.items.push(item);
		imported += 1;
	}
	store.items.sort_by_key(|item| item.start_time);
	eprintln!("Imported {imported} busy intervals");
}

fn read_events(reader: impl std::io::BufRead) -> Vec<IcalEvent> {
	ical::IcalParser::new(reader)
		.flatten()
		.flat_map(|calendar| calendar.events)
		.collect()
}
