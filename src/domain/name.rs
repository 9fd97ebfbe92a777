/// The file extension of every document, without the leading dot.
pub const EXTENSION: &str = "md";

/// Maps an arbitrary title to a filesystem-safe document filename.
///
/// The title is lower-cased, every character outside `[a-z0-9]` becomes a
/// hyphen, runs of hyphens collapse to one, leading and trailing hyphens are
/// trimmed and the document extension is appended. A trailing `.md` on the
/// input is dropped first, so sanitising a sanitised name is a no-op.
///
/// A title with no usable characters yields the bare extension (`.md`).
#[must_use]
pub fn sanitize(title: &str) -> String {
    let base = strip_extension(title).to_lowercase();

    let mut safe = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            safe.push(c);
        } else if !safe.is_empty() && !safe.ends_with('-') {
            safe.push('-');
        }
    }
    let safe = safe.trim_end_matches('-');

    format!("{safe}.{EXTENSION}")
}

/// Returns the name with a trailing document extension removed, if present.
///
/// The extension match is case-insensitive.
#[must_use]
pub fn strip_extension(name: &str) -> &str {
    let Some(split) = name.len().checked_sub(EXTENSION.len() + 1) else {
        return name;
    };
    if !name.is_char_boundary(split) {
        return name;
    }

    let (stem, ext) = name.split_at(split);
    match ext.strip_prefix('.') {
        Some(ext) if ext.eq_ignore_ascii_case(EXTENSION) => stem,
        _ => name,
    }
}
