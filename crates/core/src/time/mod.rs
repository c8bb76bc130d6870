pub mod as_of;
pub mod window;

pub use window::{resolve, DateWindow};
