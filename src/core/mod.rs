pub mod animation;
pub mod config;
pub mod eligibility;
pub mod interpreter;
pub mod pipeline;
pub mod scroll;
pub mod store;
