mod adapter;

pub use adapter::{HfConfig, HfSummaryModel, DEFAULT_API_BASE, DEFAULT_MODEL};
