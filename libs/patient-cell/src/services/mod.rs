pub mod document;
pub mod patient;
