//! CLI command handlers, one file per command.

mod fetch;
mod progress;
mod run;
mod status;

pub use fetch::run_fetch;
pub use run::run_manifest;
pub use status::run_status;

use depfetch_core::batch::BatchOutcome;

/// Exit status when the user interrupted the batch (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

/// Process exit status for a finished batch.
pub fn exit_code(outcome: BatchOutcome) -> i32 {
    match outcome {
        BatchOutcome::CompletedCleanly => 0,
        BatchOutcome::CompletedWithErrors => 1,
        BatchOutcome::Cancelled => EXIT_CANCELLED,
    }
}
