/// Conditional maximum-entropy model over discrete tables
pub mod model;
/// Quasi-Newton minimization with a golden-section line search
pub mod optimizer;
pub mod params;
