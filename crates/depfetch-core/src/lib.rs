pub mod config;
pub mod logging;

pub mod batch;
pub mod cancel;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod filename;
pub mod http;
pub mod job;
pub mod manifest;
pub mod provider;
pub mod session;
pub mod storage;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;
