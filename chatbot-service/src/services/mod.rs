pub mod dedup;
pub mod issuer;
pub mod metrics;
pub mod qr;
pub mod resolver;
pub mod worker;

pub use dedup::DedupCache;
pub use issuer::QrIssuer;
pub use metrics::{get_metrics, init_metrics};
pub use qr::QrComposer;
pub use resolver::CodeResolver;
pub use worker::{IssueJob, IssueWorkerPool};
