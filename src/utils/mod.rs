pub mod error;
pub mod log_tail;
