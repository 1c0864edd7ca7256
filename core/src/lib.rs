pub mod error;
pub mod events;
pub mod panel;
pub mod records;
