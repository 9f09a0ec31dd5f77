//! Stream manifests and quality selection.
//!
//! A manifest is the JSON an external resolver produces for one video: its
//! title plus every playable rendition. Selection is a pure function over the
//! candidate list.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// One playable rendition of a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCandidate {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub label: Option<String>,
}

impl StreamCandidate {
    /// Human label: explicit label, else `{width}p`, else `unknown`.
    pub fn describe(&self) -> String {
        match (&self.label, self.width) {
            (Some(label), _) => label.clone(),
            (None, Some(w)) => format!("{w}p"),
            (None, None) => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamManifest {
    #[serde(default)]
    pub title: Option<String>,
    pub streams: Vec<StreamCandidate>,
}

impl StreamManifest {
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("invalid stream manifest")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("in {}", path.display()))
    }
}

/// Which rendition to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamCriteria {
    /// Widest stream.
    #[default]
    Best,
    /// Narrowest stream.
    Worst,
    /// Position in the manifest list.
    Index(usize),
    /// Widest stream no wider than this.
    MaxWidth(u32),
}

impl FromStr for StreamCriteria {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "best" => return Ok(Self::Best),
            "worst" => return Ok(Self::Worst),
            _ => {}
        }
        if let Some(n) = s.strip_prefix("index:") {
            return n
                .parse()
                .map(Self::Index)
                .map_err(|_| format!("invalid stream index: {n}"));
        }
        if let Some(w) = s.strip_prefix("max:") {
            return w
                .trim_end_matches('p')
                .parse()
                .map(Self::MaxWidth)
                .map_err(|_| format!("invalid width: {w}"));
        }
        Err(format!(
            "unknown quality '{s}' (expected best, worst, index:N or max:W)"
        ))
    }
}

impl fmt::Display for StreamCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Best => write!(f, "best"),
            Self::Worst => write!(f, "worst"),
            Self::Index(i) => write!(f, "index:{i}"),
            Self::MaxWidth(w) => write!(f, "max:{w}"),
        }
    }
}

/// Pick a candidate by `criteria`. Streams without a width rank below any
/// stream with one; ties keep manifest order. `None` when nothing fits.
pub fn select_stream(
    candidates: &[StreamCandidate],
    criteria: StreamCriteria,
) -> Option<&StreamCandidate> {
    let width = |c: &&StreamCandidate| c.width.unwrap_or(0);
    match criteria {
        StreamCriteria::Index(i) => candidates.get(i),
        // max_by_key keeps the last maximum; reverse so the first one wins
        StreamCriteria::Best => candidates.iter().rev().max_by_key(width),
        StreamCriteria::Worst => candidates.iter().min_by_key(width),
        StreamCriteria::MaxWidth(max) => candidates
            .iter()
            .rev()
            .filter(|c| c.width.is_some_and(|w| w <= max))
            .max_by_key(width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(url: &str, width: Option<u32>) -> StreamCandidate {
        StreamCandidate {
            url: url.to_string(),
            width,
            height: None,
            label: None,
        }
    }

    fn candidates() -> Vec<StreamCandidate> {
        vec![
            stream("https://cdn.test/540", Some(960)),
            stream("https://cdn.test/1080", Some(1920)),
            stream("https://cdn.test/audio", None),
            stream("https://cdn.test/720", Some(1280)),
        ]
    }

    #[test]
    fn parse_criteria() {
        assert_eq!("best".parse::<StreamCriteria>().unwrap(), StreamCriteria::Best);
        assert_eq!("WORST".parse::<StreamCriteria>().unwrap(), StreamCriteria::Worst);
        assert_eq!(
            "index:2".parse::<StreamCriteria>().unwrap(),
            StreamCriteria::Index(2)
        );
        assert_eq!(
            "max:1280p".parse::<StreamCriteria>().unwrap(),
            StreamCriteria::MaxWidth(1280)
        );
        assert!("index:x".parse::<StreamCriteria>().is_err());
        assert!("medium".parse::<StreamCriteria>().is_err());
    }

    #[test]
    fn best_and_worst() {
        let c = candidates();
        assert_eq!(
            select_stream(&c, StreamCriteria::Best).unwrap().url,
            "https://cdn.test/1080"
        );
        assert_eq!(
            select_stream(&c, StreamCriteria::Worst).unwrap().url,
            "https://cdn.test/audio"
        );
    }

    #[test]
    fn max_width_picks_widest_fitting() {
        let c = candidates();
        assert_eq!(
            select_stream(&c, StreamCriteria::MaxWidth(1600)).unwrap().url,
            "https://cdn.test/720"
        );
        assert!(select_stream(&c, StreamCriteria::MaxWidth(100)).is_none());
    }

    #[test]
    fn index_out_of_range() {
        let c = candidates();
        assert_eq!(
            select_stream(&c, StreamCriteria::Index(0)).unwrap().url,
            "https://cdn.test/540"
        );
        assert!(select_stream(&c, StreamCriteria::Index(4)).is_none());
        assert!(select_stream(&[], StreamCriteria::Best).is_none());
    }

    #[test]
    fn ties_keep_manifest_order() {
        let c = vec![stream("a", Some(1280)), stream("b", Some(1280))];
        assert_eq!(select_stream(&c, StreamCriteria::Best).unwrap().url, "a");
        assert_eq!(select_stream(&c, StreamCriteria::Worst).unwrap().url, "a");
    }

    #[test]
    fn manifest_from_json() {
        let m = StreamManifest::from_json(
            r#"{
                "title": "Lecture 1",
                "streams": [
                    {"url": "https://cdn.test/a.mp4", "width": 1920, "height": 1080},
                    {"url": "https://cdn.test/b.mp4", "label": "mobile"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(m.title.as_deref(), Some("Lecture 1"));
        assert_eq!(m.streams[0].describe(), "1920p");
        assert_eq!(m.streams[1].describe(), "mobile");
        assert!(StreamManifest::from_json(r#"{"title": "x"}"#).is_err());
    }
}
