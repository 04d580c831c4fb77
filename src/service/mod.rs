pub mod alert_stream;
pub mod client;
pub mod launcher;
pub mod protocol;

pub use alert_stream::AlertStream;
pub use client::{Session, SessionApi, SessionClient};
pub use launcher::ensure_backend_running;
