// everymorning: a daily digest of recently published STEM papers.
//
// This is the library root. The ranking core lives in `scoring`; every other
// module is a collaborator around it (acquisition, storage, summarization,
// delivery) or glue that runs them in order.

pub mod config;
pub mod db;
pub mod delivery;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod semantic_scholar;
pub mod status;
pub mod summary;
