//! Direct site probing.
//!
//! Sends one request per configured site and interprets the response with
//! simple heuristics (status code ranges and known substrings).

pub mod heuristics;
pub mod site;

pub use heuristics::classify;
pub use site::SiteProber;
