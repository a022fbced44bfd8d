pub mod batch;
pub mod cascade;
pub mod decode;
pub mod format;
pub mod garbage;
pub mod html;
pub mod normalize;
pub mod pipeline;
pub mod priority;
pub mod service;
pub mod summarize;

pub use batch::BatchOrchestrator;
pub use cascade::{Cascade, Stage};
pub use decode::decode;
pub use format::Format;
pub use pipeline::MessagePipeline;
pub use priority::classify;
pub use service::{DigestRequest, DigestService};
pub use summarize::Summarizer;
