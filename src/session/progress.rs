//! Session progress snapshots and the stage state machine.

use serde::{Deserialize, Serialize};

/// Pipeline stage labels, in canonical order. Transitions are linear; a
/// session never re-enters an earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Uploading,
    Parsed,
    Segmenting,
    Segmented,
    Naming,
    Named,
    Playlists,
    Complete,
    Error,
}

impl Stage {
    /// Terminal stages accept no further progress updates.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Uploading => "uploading",
            Stage::Parsed => "parsed",
            Stage::Segmenting => "segmenting",
            Stage::Segmented => "segmented",
            Stage::Naming => "naming",
            Stage::Named => "named",
            Stage::Playlists => "playlists",
            Stage::Complete => "complete",
            Stage::Error => "error",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Consistent snapshot observed by progress readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub stage: Stage,
    pub percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Progress {
    pub fn new(stage: Stage, percent: u8) -> Self {
        Self {
            stage,
            percent,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Stage::Parsed).unwrap(), "\"parsed\"");
        assert_eq!(serde_json::to_string(&Stage::Error).unwrap(), "\"error\"");
    }

    #[test]
    fn stage_order_matches_the_state_machine() {
        assert!(Stage::Uploading < Stage::Parsed);
        assert!(Stage::Parsed < Stage::Segmenting);
        assert!(Stage::Segmenting < Stage::Segmented);
        assert!(Stage::Segmented < Stage::Naming);
        assert!(Stage::Naming < Stage::Named);
        assert!(Stage::Named < Stage::Playlists);
        assert!(Stage::Playlists < Stage::Complete);
    }

    #[test]
    fn progress_omits_empty_message() {
        let json = serde_json::to_string(&Progress::new(Stage::Parsed, 20)).unwrap();
        assert_eq!(json, "{\"stage\":\"parsed\",\"percent\":20}");
    }
}
