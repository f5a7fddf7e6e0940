pub mod hrv;
pub mod spectrum;
