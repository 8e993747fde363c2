pub mod calculator;
pub mod performance;
pub mod robot_targeting;
pub mod symbol_resolver;
