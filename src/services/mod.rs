pub mod attendance_service;
pub mod email_service;
pub mod expiry_reaper;
pub mod notification_service;
pub mod sheet_generator;
pub mod window_manager;

/// How a job treats a failure halfway through its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// The whole run succeeds or fails as one unit; nothing is persisted on
    /// failure and the next scheduled invocation retries naturally.
    AllOrNothing,
    /// Each record is attempted independently; failures are logged and
    /// tallied, the loop keeps going.
    BestEffort,
}
