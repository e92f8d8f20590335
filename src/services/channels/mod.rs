//! Delivery channel implementations behind the [`Channel`] contract.
//!
//! [`Channel`]: crate::services::dispatcher::Channel

pub mod email;
pub mod in_app;
pub mod push;

pub use email::EmailChannel;
pub use in_app::InAppChannel;
pub use push::PushChannel;
