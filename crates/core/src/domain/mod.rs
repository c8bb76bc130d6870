pub mod query;
pub mod ranking;
