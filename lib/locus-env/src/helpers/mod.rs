//! Helpers for talking to cloud metadata and token services.

pub mod arn;
pub mod http;
pub mod imds;
pub mod sts;
