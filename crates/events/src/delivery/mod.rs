//! Outbound delivery channels for booking notifications.

pub mod webhook;
