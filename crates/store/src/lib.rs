pub mod submissions;

pub use submissions::{PgSubmissionStore, Result, StoreError, Submission, SubmissionStore, connect_with_retry};
