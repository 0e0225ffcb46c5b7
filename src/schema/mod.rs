pub mod calendar;
pub mod command;
pub mod event;
pub mod identity;
pub mod line;
