//! Extension to MIME type mapping for served and uploaded media.

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi", "mkv", "m3u8", "ts", "flv", "wmv"];

fn extension(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Content type for a storage key or file name, chosen by its extension.
pub fn content_type_for(path: &str) -> &'static str {
    let Some(ext) = extension(path) else {
        return DEFAULT_CONTENT_TYPE;
    };

    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "m3u8" => "application/vnd.apple.mpegurl",
        "ts" => "video/mp2t",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "vtt" => "text/vtt",
        "srt" => "application/x-subrip",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Whether the upload tool should pick up this file.
pub fn is_video_file(path: &str) -> bool {
    extension(path).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(content_type_for("video/a.mp4"), "video/mp4");
        assert_eq!(content_type_for("a.webm"), "video/webm");
        assert_eq!(content_type_for("clip.MOV"), "video/quicktime");
        assert_eq!(content_type_for("x.avi"), "video/x-msvideo");
        assert_eq!(content_type_for("x.mkv"), "video/x-matroska");
        assert_eq!(content_type_for("hls/index.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(content_type_for("hls/seg-001.ts"), "video/mp2t");
        assert_eq!(content_type_for("x.flv"), "video/x-flv");
        assert_eq!(content_type_for("x.wmv"), "video/x-ms-wmv");
        assert_eq!(content_type_for("subs/en.vtt"), "text/vtt");
        assert_eq!(content_type_for("subs/en.srt"), "application/x-subrip");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back() {
        assert_eq!(content_type_for("readme.txt"), "application/octet-stream");
        assert_eq!(content_type_for("video/noext"), "application/octet-stream");
        assert_eq!(content_type_for("dir.mp4/file"), "application/octet-stream");
        assert_eq!(content_type_for(""), "application/octet-stream");
    }

    #[test]
    fn video_files_exclude_subtitles() {
        assert!(is_video_file("a/b/c.MP4"));
        assert!(is_video_file("seg.ts"));
        assert!(!is_video_file("en.vtt"));
        assert!(!is_video_file("notes.txt"));
        assert!(!is_video_file("mp4"));
    }
}
