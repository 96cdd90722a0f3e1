pub mod estimator;
pub mod output;
pub mod profile;
pub mod sample;
pub mod store;
pub mod timestamp;
