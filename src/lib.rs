pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    attendance_service::AttendanceService, email_service::EmailService,
    expiry_reaper::ExpiryReaper, notification_service::NotificationService,
    sheet_generator::SheetGenerator, window_manager::WindowManager,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub attendance_service: AttendanceService,
    pub sheet_generator: SheetGenerator,
    pub window_manager: WindowManager,
    pub expiry_reaper: ExpiryReaper,
    pub notification_service: NotificationService,
    pub email_service: EmailService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        let attendance_service = AttendanceService::new(pool.clone());
        let sheet_generator = SheetGenerator::new(pool.clone());
        let window_manager = WindowManager::new(pool.clone());
        let expiry_reaper = ExpiryReaper::new(pool.clone());
        let notification_service = NotificationService::new(pool.clone());
        let email_service = EmailService::new(config.email_dispatch_url.clone());

        Self {
            pool,
            attendance_service,
            sheet_generator,
            window_manager,
            expiry_reaper,
            notification_service,
            email_service,
        }
    }
}
