pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// MIME type for a file extension; the leading dot and case are ignored.
pub fn mime_type_for_extension(extension: &str) -> &'static str {
    let normalized = extension.trim_start_matches('.').to_ascii_lowercase();

    match normalized.as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",

        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",

        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",

        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",

        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "rtf" => "application/rtf",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",

        "zip" => "application/zip",
        "rar" => "application/x-rar-compressed",
        "7z" => "application/x-7z-compressed",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "bz2" => "application/x-bzip2",

        "ts" => "text/typescript",
        "tsx" => "text/tsx",
        "jsx" => "text/jsx",
        "py" => "text/x-python",
        "java" => "text/x-java-source",
        "c" | "h" => "text/x-c",
        "cpp" => "text/x-c++src",
        "hpp" => "text/x-c++hdr",
        "php" => "text/x-php",
        "rb" => "text/x-ruby",
        "go" => "text/x-go",
        "rs" => "text/x-rustsrc",
        "swift" => "text/x-swift",
        "kt" => "text/x-kotlin",
        "scala" => "text/x-scala",

        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "eot" => "application/vnd.ms-fontobject",

        "exe" => "application/x-msdownload",
        "dmg" => "application/x-apple-diskimage",
        "iso" => "application/x-iso9660-image",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// MIME type for a file name, keyed on the text after its last dot.
pub fn mime_type_for_filename(filename: &str) -> &'static str {
    match filename.rsplit_once('.') {
        Some((_, extension)) => mime_type_for_extension(extension),
        None => DEFAULT_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dot_and_case() {
        assert_eq!(mime_type_for_extension(".PNG"), "image/png");
        assert_eq!(mime_type_for_extension("csv"), "text/csv");
    }

    #[test]
    fn unknown_extensions_fall_back() {
        assert_eq!(mime_type_for_extension("weird"), DEFAULT_MIME_TYPE);
        assert_eq!(mime_type_for_filename("README"), DEFAULT_MIME_TYPE);
        assert_eq!(mime_type_for_filename("export.final.xlsx"), mime_type_for_extension("xlsx"));
    }
}
