pub mod fetch;
pub mod resolve;

pub use fetch::{HttpFetcher, ListFetcher};
pub use resolve::{DnsResolver, HostResolver};
