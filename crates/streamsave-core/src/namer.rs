//! File name resolution for downloads.
//!
//! Derives a filesystem-safe name from the URL, an optional caller-supplied
//! name, and the MIME type. Never fails: every input resolves to some usable
//! name with a plausible extension.

use chrono::Utc;
use url::Url;

/// Maximum length of a resolved file name, extension included.
const MAX_NAME_LEN: usize = 120;
/// Maximum stem length kept when truncating an over-long name.
const MAX_STEM_LEN: usize = 100;
/// Longest extension (without the dot) treated as plausible.
const MAX_EXT_LEN: usize = 10;

/// Extension used when neither the MIME type nor the URL yields one.
pub const FALLBACK_EXTENSION: &str = "mp4";

/// Resolve the on-disk file name for a download.
///
/// Preference order for the base name: the explicit name, then the last URL
/// path segment, then a synthesized `download_<timestamp>` stem.
pub fn resolve_file_name(url: &str, explicit_name: Option<&str>, mime_type: &str) -> String {
    let raw = explicit_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| file_name_from_url(url))
        .unwrap_or_default();

    let decoded = percent_decoded(raw.trim());
    let mut name = strip_illegal_chars(decoded.trim());

    if !has_extension(&name) {
        let ext = extension_from_mime(mime_type)
            .map(ToOwned::to_owned)
            .or_else(|| extension_from_url(url))
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
        if name.is_empty() {
            name = format!("download_{}", Utc::now().timestamp_millis());
        }
        name = format!("{name}.{ext}");
    }

    truncate_name(name)
}

/// Sanitize a caller-supplied path component (e.g. a subdirectory name).
///
/// Returns `None` when nothing usable remains after trimming.
pub fn sanitize_component(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(strip_illegal_chars(trimmed))
}

/// Percent-decode names like `The%20Pitt%20S01E01`; a failed decode keeps
/// the original string rather than erroring.
fn percent_decoded(name: &str) -> String {
    if !name.contains('%') {
        return name.to_string();
    }
    match urlencoding::decode(name) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => name.to_string(),
    }
}

/// Replace characters invalid on common filesystems: `\ / : * ? " < > |`
/// plus control characters.
fn strip_illegal_chars(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// A plausible extension is a `.` followed by 1..=10 characters, not at the
/// end of the string.
fn has_extension(name: &str) -> bool {
    match name.rfind('.') {
        Some(idx) => {
            let ext_len = name[idx + 1..].chars().count();
            (1..=MAX_EXT_LEN).contains(&ext_len)
        }
        None => false,
    }
}

fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.last()?;
    if last.is_empty() || !last.contains('.') {
        return None;
    }
    Some(last.chars().take(MAX_STEM_LEN).collect())
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.last()?;
    let idx = last.rfind('.')?;
    let ext = &last[idx + 1..];
    if ext.is_empty() || ext.chars().count() > MAX_EXT_LEN {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Map a MIME type to a file extension. Parameters (`; charset=...`) are
/// stripped before matching.
fn extension_from_mime(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let ext = match essence.as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "video/x-msvideo" => "avi",
        "video/quicktime" => "mov",
        "video/mp2t" => "ts",
        "application/x-mpegurl" | "application/vnd.apple.mpegurl" => "m3u8",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/aac" => "aac",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "application/x-subrip" => "srt",
        "text/vtt" => "vtt",
        "application/zip" => "zip",
        "application/pdf" => "pdf",
        "application/json" => "json",
        "text/html" => "html",
        "text/plain" => "txt",
        _ => return None,
    };
    Some(ext)
}

/// Keep the full name within `MAX_NAME_LEN` by shortening the stem, never
/// the extension.
fn truncate_name(name: String) -> String {
    if name.chars().count() <= MAX_NAME_LEN {
        return name;
    }
    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name.as_str(), ""),
    };
    let stem: String = stem.chars().take(MAX_STEM_LEN).collect();
    let ext: String = ext.chars().take(MAX_EXT_LEN).collect();
    format!("{stem}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_encoded_names_are_decoded() {
        let name = resolve_file_name(
            "https://example.com/videos/1",
            Some("My%20Movie.mp4"),
            "video/mp4",
        );
        assert_eq!(name, "My Movie.mp4");
    }

    #[test]
    fn illegal_characters_are_replaced() {
        let name = resolve_file_name(
            "https://example.com/x",
            Some("Movie: Part 1/2?.mp4"),
            "video/mp4",
        );
        assert_eq!(name, "Movie_ Part 1_2_.mp4");
    }

    #[test]
    fn extension_comes_from_mime_type_first() {
        let name = resolve_file_name("https://example.com/watch", Some("episode"), "video/webm");
        assert_eq!(name, "episode.webm");
    }

    #[test]
    fn extension_falls_back_to_url() {
        let name = resolve_file_name("https://example.com/clips/intro.mkv", Some("intro"), "");
        assert_eq!(name, "intro.mkv");
    }

    #[test]
    fn extension_falls_back_to_default() {
        let name = resolve_file_name("https://example.com/watch", Some("episode"), "");
        assert_eq!(name, "episode.mp4");
    }

    #[test]
    fn name_derived_from_url_when_not_supplied() {
        let name = resolve_file_name("https://example.com/media/trailer.mp4", None, "");
        assert_eq!(name, "trailer.mp4");
    }

    #[test]
    fn blank_inputs_synthesize_a_timestamped_name() {
        let name = resolve_file_name("https://example.com/", None, "video/mp4");
        assert!(name.starts_with("download_"), "got: {name}");
        assert!(name.ends_with(".mp4"));
    }

    #[test]
    fn url_segments_without_a_dot_are_not_names() {
        let name = resolve_file_name("https://example.com/stream/hd", None, "video/mp4");
        assert!(name.starts_with("download_"), "got: {name}");
    }

    #[test]
    fn long_names_are_truncated_preserving_extension() {
        let long = "a".repeat(300);
        let name = resolve_file_name(
            "https://example.com/x",
            Some(&format!("{long}.mp4")),
            "video/mp4",
        );
        assert!(name.chars().count() <= 120, "len = {}", name.chars().count());
        assert!(name.ends_with(".mp4"));
    }

    #[test]
    fn failed_decode_keeps_the_original_name() {
        // `%ZZ` is not a valid escape; the raw name survives sanitization.
        let name = resolve_file_name("https://example.com/x", Some("clip%ZZ.mp4"), "video/mp4");
        assert_eq!(name, "clip%ZZ.mp4");
    }

    #[test]
    fn mime_parameters_are_ignored() {
        assert_eq!(extension_from_mime("video/mp4; codecs=avc1"), Some("mp4"));
        assert_eq!(extension_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn overlong_url_extensions_are_rejected() {
        assert_eq!(
            extension_from_url("https://example.com/file.reallylongext"),
            None
        );
        assert_eq!(
            extension_from_url("https://example.com/file.MKV"),
            Some("mkv".to_string())
        );
    }

    #[test]
    fn sanitize_component_handles_blank_and_illegal_input() {
        assert_eq!(sanitize_component("   "), None);
        assert_eq!(
            sanitize_component("Action: Movies"),
            Some("Action_ Movies".to_string())
        );
        assert_eq!(sanitize_component("a/b\\c"), Some("a_b_c".to_string()));
    }

    #[test]
    fn dotted_names_with_terminal_dot_get_an_extension() {
        let name = resolve_file_name("https://example.com/x", Some("archive."), "application/zip");
        assert!(name.ends_with(".zip"), "got: {name}");
    }
}
