#![allow(unused_imports)]

//! Database models split into separate files.
//! This module re-exports individual model modules so imports like
//! `use crate::db::models::*;` work across the crate.

pub mod event;
pub mod in_app_notification;
pub mod preferences;
pub mod push_permission;
pub mod reminder;

pub use self::event::*;
pub use self::in_app_notification::*;
pub use self::preferences::*;
pub use self::push_permission::*;
pub use self::reminder::*;
