//! Title and description derivation for upload candidates
//!
//! The caption-field extractor is pure string processing so it can be tested
//! against literal caption bodies. Dashcam captions carry a location field
//! (`주소:`) and a time field (`시간:`); when present they make a far better
//! title than the raw filename.

use chrono::Local;
use regex::Regex;
use std::sync::OnceLock;

/// Label introducing the location field in caption text
const LOCATION_LABEL: &str = "주소:";
/// Label introducing the time field in caption text
const TIME_LABEL: &str = "시간:";
/// Unit marker ending the minutes component of a caption time value
const MINUTE_MARKER: &str = "분";

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("Failed to compile tag regex"))
}

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"{LOCATION_LABEL}\s*([^\n\r]+)"))
            .expect("Failed to compile location regex")
    })
}

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"{TIME_LABEL}\s*([^\n\r]+)"))
            .expect("Failed to compile time regex")
    })
}

/// Derive the title for a video: caption fields first, filename fallback
pub fn title_for(video_filename: &str, caption_body: Option<&str>) -> String {
    caption_body
        .and_then(caption_title)
        .unwrap_or_else(|| title_from_filename(video_filename))
}

/// Extract a title from caption text, if it carries the expected fields
///
/// Two passes: the whole text first (fields may be split across lines), then
/// line by line for whatever is still missing, stopping once both are found.
/// Malformed or missing fields are a normal outcome, never an error.
pub fn caption_title(body: &str) -> Option<String> {
    let clean = tag_regex().replace_all(body, "");

    let mut location = location_regex()
        .captures(&clean)
        .map(|c| c[1].trim().to_string());
    let mut time = time_regex()
        .captures(&clean)
        .map(|c| truncate_seconds(c[1].trim()));

    if location.is_none() || time.is_none() {
        for line in body.lines() {
            let line = tag_regex().replace_all(line.trim(), "");
            if location.is_none() && line.contains(LOCATION_LABEL) {
                location = location_regex()
                    .captures(&line)
                    .map(|c| c[1].trim().to_string());
            }
            if time.is_none() && line.contains(TIME_LABEL) {
                time = time_regex()
                    .captures(&line)
                    .map(|c| truncate_seconds(c[1].trim()));
            }
            if location.is_some() && time.is_some() {
                break;
            }
        }
    }

    match (location, time) {
        (Some(location), Some(time)) => Some(format!("{location}, {time}")),
        (Some(location), None) => Some(location),
        (None, Some(time)) => Some(time),
        (None, None) => None,
    }
}

/// Filename-derived title: drop the extension, `_`/`-` become spaces, and
/// each word is title-cased
pub fn title_from_filename(filename: &str) -> String {
    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);
    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Drop the trailing seconds component of a caption time value
///
/// "2025. 5. 18. 17시 53분 8초" becomes "2025. 5. 18. 17시 53분"; values
/// without a minutes marker pass through unchanged.
fn truncate_seconds(time: &str) -> String {
    match time.rfind(MINUTE_MARKER) {
        Some(idx) => time[..idx + MINUTE_MARKER.len()].to_string(),
        None => time.to_string(),
    }
}

/// Fixed description template for an uploaded video
pub fn description_for(original_filename: &str, size_mb: f64, has_caption: bool) -> String {
    let mut out = format!("Uploaded automatically from {original_filename}\n\n");
    out.push_str(&format!("File size: {size_mb:.2} MB\n"));
    if has_caption {
        out.push_str("Includes subtitles\n");
    }
    out.push_str(&format!(
        "\nUploaded on: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out
}

/// File size in megabytes
pub fn file_size_mb(size_bytes: u64) -> f64 {
    size_bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_with_location_and_time() {
        let body = "1\n00:00:01,000 --> 00:00:03,000\n주소: Seoul Station\n시간: 2025. 5. 18. 17시 53분 8초\n";
        assert_eq!(
            caption_title(body),
            Some("Seoul Station, 2025. 5. 18. 17시 53분".to_string())
        );
    }

    #[test]
    fn test_caption_fields_inside_markup() {
        let body = "<font color=\"white\">주소: Busan Harbor</font>\n<b>시간: 2025. 1. 2. 9시 5분 59초</b>";
        assert_eq!(
            caption_title(body),
            Some("Busan Harbor, 2025. 1. 2. 9시 5분".to_string())
        );
    }

    #[test]
    fn test_caption_location_only() {
        assert_eq!(
            caption_title("주소: Incheon Airport\n"),
            Some("Incheon Airport".to_string())
        );
    }

    #[test]
    fn test_caption_time_only_truncates_seconds() {
        assert_eq!(
            caption_title("시간: 2025. 5. 18. 17시 53분 8초"),
            Some("2025. 5. 18. 17시 53분".to_string())
        );
    }

    #[test]
    fn test_caption_without_fields_yields_none() {
        assert_eq!(caption_title("1\n00:00:01,000 --> 00:00:03,000\nHello\n"), None);
        assert_eq!(caption_title(""), None);
    }

    #[test]
    fn test_time_without_minute_marker_passes_through() {
        assert_eq!(caption_title("시간: 17:53:08"), Some("17:53:08".to_string()));
    }

    #[test]
    fn test_title_falls_back_to_filename() {
        assert_eq!(title_for("my_video-2.mp4", None), "My Video 2");
        assert_eq!(title_for("my_video-2.mp4", Some("no fields here")), "My Video 2");
    }

    #[test]
    fn test_title_prefers_caption_fields() {
        assert_eq!(
            title_for("my_video-2.mp4", Some("주소: Seoul Station")),
            "Seoul Station"
        );
    }

    #[test]
    fn test_filename_title_casing() {
        assert_eq!(title_from_filename("DASHCAM_front.mp4"), "Dashcam Front");
        assert_eq!(title_from_filename("clip"), "Clip");
    }

    #[test]
    fn test_description_template() {
        let description = description_for("trip.mp4", 12.345, true);
        assert!(description.starts_with("Uploaded automatically from trip.mp4\n"));
        assert!(description.contains("File size: 12.35 MB"));
        assert!(description.contains("Includes subtitles"));
        assert!(description.contains("Uploaded on: "));

        let without = description_for("trip.mp4", 1.0, false);
        assert!(!without.contains("Includes subtitles"));
    }

    #[test]
    fn test_file_size_mb() {
        assert_eq!(file_size_mb(2 * 1024 * 1024), 2.0);
    }
}
