mod job;
mod poller;
mod state;
mod traits;

pub use job::{
    CANCELLED_REASON, ExportOutcome, ExportRecord, Job, PollConfig, PollResult, PollStatus,
};
pub use poller::{ExportHandle, ExportPoller};
pub use state::{PollState, RetryReason, Transition};
pub use traits::{JobSubmitter, StatusChecker};
