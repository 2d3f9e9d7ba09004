pub mod attendance_sheet;
pub mod notification;
pub mod schedule_slot;
pub mod signature;
pub mod user;
