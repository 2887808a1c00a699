pub mod confusion;
pub mod errors;
