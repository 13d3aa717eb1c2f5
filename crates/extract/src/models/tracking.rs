use serde::{Deserialize, Serialize};

/// Decides which images are tracking beacons rather than content.
///
/// An image is a tracker when either of its declared dimensions is at or
/// below [`max_pixel_size`](Self::max_pixel_size), or when its source
/// contains one of the denylisted [`patterns`](Self::patterns)
/// (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingFilter {
    pub patterns: Vec<String>,
    pub max_pixel_size: u32,
}
impl Default for TrackingFilter {
    fn default() -> Self {
        let patterns = [
            "analytics",
            "pixel",
            "tracking",
            "doubleclick",
            "googletagmanager.com",
            "facebook.com/tr",
            "scorecardresearch.com",
            "quantserve.com",
        ];
        Self { patterns: patterns.into_iter().map(String::from).collect(), max_pixel_size: 1 }
    }
}
impl TrackingFilter {
    pub fn is_tracking_image(&self, src: &str, width: Option<&str>, height: Option<&str>) -> bool {
        let tiny = [width, height]
            .into_iter()
            .flatten()
            .filter_map(parse_dimension)
            .any(|size| size <= f64::from(self.max_pixel_size));
        tiny || self.is_denylisted(src)
    }

    pub fn is_denylisted(&self, src: &str) -> bool {
        let src = src.to_ascii_lowercase();
        self.patterns
            .iter()
            .filter(|pattern| !pattern.is_empty())
            .any(|pattern| src.contains(&pattern.to_ascii_lowercase()))
    }
}

/// Reads `1`, `1px` or `0.5` style dimension attributes.
fn parse_dimension(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
