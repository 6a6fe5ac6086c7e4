pub mod admin_handler;
pub mod hospital_handler;

pub use admin_handler::*;
pub use hospital_handler::*;
