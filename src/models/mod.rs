pub mod access_log;
pub mod user;
