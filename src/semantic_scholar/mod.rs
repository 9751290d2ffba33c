// Paper acquisition — Semantic Scholar Graph API client and the PaperSource
// abstraction the fetch pipeline runs against.

pub mod client;
pub mod papers;
pub mod rate_limiter;
pub mod traits;
