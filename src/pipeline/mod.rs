// Run orchestration — fetch papers, then score, select and deliver digests.

pub mod digest;
pub mod fetch;
