//! CLI command handlers, one file per command.

mod get;
mod pick;
mod probe;

use anyhow::{Context, Result};
use std::collections::HashMap;

pub use get::{run_get, GetRequest};
pub use pick::run_pick;
pub use probe::run_probe;

/// Parse `-H 'Name: value'` arguments into a header map.
pub(crate) fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|h| {
            let (name, value) = h
                .split_once(':')
                .with_context(|| format!("invalid header '{}' (expected 'Name: value')", h))?;
            let name = name.trim();
            anyhow::ensure!(!name.is_empty(), "invalid header '{}' (empty name)", h);
            Ok((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}
