pub mod engine_actor;
pub mod refresh_scheduler;
