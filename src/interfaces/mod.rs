//! Outer adapters driving the application layer.

pub mod http;
