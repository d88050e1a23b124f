pub mod exec;
pub mod param;
