pub mod command_timeout;
pub mod validation;

pub use command_timeout::run_command_with_timeout;
