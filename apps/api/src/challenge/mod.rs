//! Prompt Challenge Engine.
//! Round progression, forbidden-word filtering, scoring and judge parsing.
//! External services are reached only through the traits in `boundary`.

pub mod boundary;
pub mod catalog;
pub mod filter;
pub mod handlers;
pub mod machine;
pub mod parser;
pub mod scoring;
pub mod session;
pub mod store;
