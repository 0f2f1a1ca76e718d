//! Time-axis padding to the model's fixed frame count

use sndcls_common::{Error, Result};

use super::FeatureMap;

/// Zero-pad the trailing side of the frame axis up to `max_frames`
///
/// The band axis is never touched. A map longer than `max_frames` is a
/// configuration/model mismatch and is rejected rather than truncated.
pub fn pad_frames(map: &FeatureMap, max_frames: usize) -> Result<FeatureMap> {
    if map.frames() > max_frames {
        return Err(Error::Shape(format!(
            "feature map has {} frames, exceeding max_padding {}",
            map.frames(),
            max_frames
        )));
    }

    let mut padded = FeatureMap::zeros(map.bands(), max_frames);
    for band in 0..map.bands() {
        padded.row_mut(band)[..map.frames()].copy_from_slice(map.row(band));
    }
    Ok(padded)
}
