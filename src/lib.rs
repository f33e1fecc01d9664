//! The library implementing everything that collie needs

#![warn(clippy::pedantic)]
#![warn(clippy::dbg_macro)]
#![deny(clippy::deref_by_slicing)]
#![warn(clippy::get_unwrap)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(missing_docs)]

pub mod availability;
pub mod db;
pub mod scheduler;
pub mod slots;
pub mod time;
