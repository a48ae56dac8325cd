/// Longest file name most filesystems accept, in bytes.
const MAX_NAME_BYTES: usize = 255;

/// Turn an arbitrary title into a name that is safe as a single path component.
///
/// Path separators, characters Windows refuses, and control characters become `_`.
/// The result is deterministic for a given input.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_end_matches(['.', ' ']);
    let truncated = truncate_on_char_boundary(trimmed, MAX_NAME_BYTES);

    match truncated {
        "" | "." | ".." => "_".to_string(),
        name => name.to_string(),
    }
}

/// File name for a track title, with the `.mp3` extension included in the length budget.
pub fn track_filename(sanitize: fn(&str) -> String, title: &str) -> String {
    const EXT: &str = ".mp3";
    let stem = sanitize(title);
    let stem = truncate_on_char_boundary(&stem, MAX_NAME_BYTES - EXT.len());
    format!("{stem}{EXT}")
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
