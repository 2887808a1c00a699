pub mod dataset;
pub mod io;
