pub mod provider;
pub mod returns;
pub mod types;
