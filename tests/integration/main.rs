//! Integration tests for Sumi-Mirror
//!
//! - `crawl_tests`: crawl loop behavior against scripted fakes
//! - `mirror_tests`: HTTP driver and filesystem store against wiremock

mod crawl_tests;
mod mirror_tests;
mod support;
