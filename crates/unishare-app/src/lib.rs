pub mod app;
pub mod session_sync;
