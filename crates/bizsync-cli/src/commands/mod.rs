pub mod common;
pub mod completions;
pub mod discover;
pub mod push;
pub mod register;
pub mod unregister;
