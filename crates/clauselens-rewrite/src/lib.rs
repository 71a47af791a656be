//! Optional language-model rewriting of answer bullets over HTTP.
//!
//! Candidates are only ever proposals: the caller runs them through
//! [`clauselens_core::validate_rewrite`] before use.

mod http;
pub use http::{HttpRewriter, RewriteConfig, RewriteError, extract_text_from_response};
