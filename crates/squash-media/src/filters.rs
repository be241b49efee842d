//! FFmpeg video filter expressions.

/// Build the scale-and-pad filter for a bounded transcode.
///
/// Scales the video down to fit within `max_width` x `max_height` while
/// preserving aspect ratio (never upscales), then pads both dimensions up
/// to the next even number. Most codecs require even dimensions for
/// macroblock alignment.
pub fn scale_pad_filter(max_width: u32, max_height: u32) -> String {
    format!(
        "scale='min({max_width},iw)':'min({max_height},ih)':force_original_aspect_ratio=decrease,\
         pad=ceil(iw/2)*2:ceil(ih/2)*2"
    )
}

/// Next even dimension, as the pad expression computes it.
pub fn pad_to_even(dim: u32) -> u32 {
    dim.div_ceil(2) * 2
}
