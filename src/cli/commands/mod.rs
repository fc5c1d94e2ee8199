pub mod check;
pub mod import;
pub mod token;
pub mod usage;
