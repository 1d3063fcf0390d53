//! Cross-origin gap reconciliation.
//!
//! Under some site-isolation configurations the protocol reports a
//! cross-origin sub-request's start but never its completion size or
//! status. This module fills those gaps at session end: for every
//! request observed as started but never finished, whose origin differs
//! from the primary page, a disposable page re-navigates directly to
//! the URL and its own monitor's capture stands in as a best-effort
//! substitute measurement. The substitute is not byte-identical to the
//! original fetch; headers, cookies, and referrer context differ.

mod fetcher;
mod handler;

pub use fetcher::CrossOriginFetcher;
pub use handler::CrossOriginHandler;
