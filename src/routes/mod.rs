pub mod attendance;
pub mod health;
pub mod jobs;
pub mod public;
