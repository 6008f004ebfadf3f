//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension. Unknown
//! extensions yield `None`; callers leave the header unset instead of guessing.

/// Get MIME Content-Type based on file extension
///
/// # Examples
/// ```
/// use search_gateway::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), Some("text/html; charset=utf-8"));
/// assert_eq!(get_content_type(Some("mp4")), Some("video/mp4"));
/// assert_eq!(get_content_type(None), None);
/// ```
pub fn get_content_type(extension: Option<&str>) -> Option<&'static str> {
    let ext = extension?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "text/xml; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",

        // JavaScript/WASM
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",

        _ => return None,
    };
    Some(content_type)
}

/// Extension of the last path segment, without the dot
///
/// Dotfiles (`.env`) and trailing dots have no extension.
pub fn extension_of(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rfind('.') {
        Some(0) | None => None,
        Some(idx) if idx + 1 == file_name.len() => None,
        Some(idx) => Some(&file_name[idx + 1..]),
    }
}

/// Content-Type for a relative asset path
pub fn content_type_for_path(path: &str) -> Option<&'static str> {
    get_content_type(extension_of(path))
}

/// Whether a response with this Content-Type benefits from compression
pub fn is_compressible(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/")
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
        || matches!(
            essence.as_str(),
            "application/json"
                | "application/javascript"
                | "application/xml"
                | "application/wasm"
                | "image/svg+xml"
        )
}
