//! Title slugs and filesystem-safe names.

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Lowercase ASCII slug of `title`: runs of anything that is not an ASCII
/// letter or digit become a single `-`, with no leading or trailing `-`.
///
/// `"My Video: Part 2!"` → `"my-video-part-2"`.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else if c == '\'' {
            // "don't" → "dont"
            continue;
        } else {
            pending_dash = true;
        }
    }
    truncate_at_boundary(out, NAME_MAX - ".mp4".len())
}

/// Replace path separators, NUL and control characters with `_` and strip
/// leading/trailing dots and whitespace. Returns `None` when nothing usable
/// remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        return None;
    }
    Some(truncate_at_boundary(trimmed.to_string(), NAME_MAX))
}

fn truncate_at_boundary(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut take = max;
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        s.truncate(take);
    }
    s
}
