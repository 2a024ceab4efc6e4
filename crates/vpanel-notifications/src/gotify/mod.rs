//! Gotify push notifications.
//!
//! - `types`: [`GotifyConfig`], the message body and [`NotifyError`]
//! - `client`: [`GotifyClient`], the [`Notifier`] trait and [`dispatch`]

pub mod client;
pub mod types;

pub use client::{
    dispatch, message_endpoint, notifier_from_config, GotifyClient, NoopNotifier, Notifier,
    SharedNotifier,
};
pub use types::*;
