pub mod history;
pub mod metrics;

pub use history::HistoryLog;
pub use metrics::{get_metrics, init_metrics};
