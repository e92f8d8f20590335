pub mod event_repository;
pub mod notification_repository;
pub mod preferences_repository;
pub mod push_permission_repository;
pub mod reminder_repository;

pub use event_repository::EventRepository;
pub use notification_repository::NotificationRepository;
pub use preferences_repository::PreferencesRepository;
pub use push_permission_repository::PushPermissionRepository;
pub use reminder_repository::ReminderRepository;
