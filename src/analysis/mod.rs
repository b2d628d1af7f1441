pub mod form;
pub mod types;
