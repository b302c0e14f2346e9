mod fetch;
mod http;
pub(crate) mod runtime;

pub(crate) use fetch::fetch_continuously;
pub use fetch::{Fetch, FetchError};
pub use http::{HeaderValue, HttpFetch, HttpOptions, MaxParallelDownloads};
