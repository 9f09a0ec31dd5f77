//! `vdl pick` – list manifest streams and print the selected URL.

use anyhow::{Context, Result};
use std::path::Path;
use vdl_core::select::{select_stream, StreamCriteria, StreamManifest};

pub fn run_pick(manifest_path: &Path, quality: StreamCriteria) -> Result<()> {
    let manifest = StreamManifest::load(manifest_path)?;
    let chosen = select_stream(&manifest.streams, quality)
        .with_context(|| format!("no stream matches quality '{}'", quality))?;

    if let Some(title) = &manifest.title {
        println!("{}", title);
    }
    for (i, stream) in manifest.streams.iter().enumerate() {
        let marker = if std::ptr::eq(stream, chosen) { '*' } else { ' ' };
        println!("{} [{}] {}", marker, i, stream.describe());
    }
    println!("{}", chosen.url);
    Ok(())
}
