//! Image resolution over post attachments.

use crate::Attachment;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Return the first attachment URL that looks like an image: either it ends in
/// a raster extension (case-insensitive) or contains one of `host_markers`.
pub fn resolve_image(attachments: &[Attachment], host_markers: &[String]) -> Option<String> {
    attachments
        .iter()
        .map(|attachment| attachment.url.as_str())
        .find(|url| has_image_extension(url) || host_markers.iter().any(|m| url.contains(m.as_str())))
        .map(str::to_string)
}

fn has_image_extension(url: &str) -> bool {
    let Some((_, extension)) = url.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| extension.eq_ignore_ascii_case(known))
}
