#![warn(clippy::pedantic)]
#![warn(clippy::dbg_macro)]
#![deny(clippy::deref_by_slicing)]
#![warn(clippy::get_unwrap)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_used)]

use clap::Parser;
use collie::db::Store;
use rustbreak::{deser::Ron, PathDatabase};
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
	#[arg(long, env = "COLLIE_KENNEL", default_value = "./collie")]
	pub db_path: PathBuf,
}

mod menu;

fn main() {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let Args { db_path } = Args::parse();
	let db = PathDatabase::<Store, Ron>::load_from_path_or_default(db_path).expect("set up store");

	loop {
		db.save().expect("Save");
		let mut store = db.borrow_data_mut().expect("Clean store");
		match dialoguer::FuzzySelect::new()
			.items(&[
				"view agenda",
				"add task",
				"remove task",
				"edit availability",
				"options",
				"plan",
				"import calendar",
				"exit",
			])
			.interact()
			.expect("Main menu")
		{
			0 => menu::view(&store),
			1 => menu::add(&mut store),
			2 => menu::remove(&mut store),
			3 => menu::availability(&mut store),
			4 => menu::options(&mut store),
			5 => menu::plan(&mut store),
			6 => menu::import(&mut store),
			7 => break,
			_ => unreachable!(),
		}
	}
	db.save().expect("Save");
}
