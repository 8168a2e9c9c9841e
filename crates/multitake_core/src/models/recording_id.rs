//! Recording identifier newtype.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one take (source recording) for the whole run.
///
/// Offsets, segments and frame sources are all keyed by this id, so results
/// computed in parallel never depend on completion order.
///
/// # Examples
///
/// ```
/// use multitake_core::models::RecordingId;
///
/// let id = RecordingId::from_path_stem("/takes/cam_a.mov");
/// assert_eq!(id.as_str(), "cam_a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordingId(String);

impl RecordingId {
    /// Create an id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from a file path (file stem, falling back to the full path).
    pub fn from_path_stem(path: impl AsRef<std::path::Path>) -> Self {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self(stem)
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordingId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_stem_strips_extension() {
        assert_eq!(RecordingId::from_path_stem("a/b/take_03.mp4").as_str(), "take_03");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&RecordingId::new("cam")).unwrap();
        assert_eq!(json, "\"cam\"");
    }

    #[test]
    fn orders_lexicographically() {
        let mut ids = vec![RecordingId::new("b"), RecordingId::new("a")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "a");
    }
}
