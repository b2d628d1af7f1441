pub mod api;
pub mod fetch;
#[cfg(test)]
pub mod mock;
pub mod translation;
pub mod types;
