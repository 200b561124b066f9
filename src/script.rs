//! Visual script loading.
//!
//! A script is a JSON document of the shape
//! `{ "visual_script": [ { "prompt": "...", "timestamp_start": "00:01" }, ... ] }`.

use crate::error::{Result, SceneGenError};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Key holding the ordered scene list.
const SCENES_KEY: &str = "visual_script";
/// Key holding a scene's optional start timestamp.
const TIMESTAMP_KEY: &str = "timestamp_start";

/// One entry of a visual script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scene {
    /// Text describing the image to generate.
    pub prompt: String,
    /// Optional start timestamp, used as the scene identifier.
    #[serde(default)]
    pub timestamp_start: Option<String>,
}

impl Scene {
    /// Filesystem-safe identifier for the scene at `index`.
    ///
    /// Colons in the timestamp become hyphens; without a timestamp the
    /// zero-padded index is used.
    pub fn scene_id(&self, index: usize) -> String {
        match &self.timestamp_start {
            Some(ts) => ts.replace(':', "-"),
            None => format!("{index:03}"),
        }
    }

    /// File name the scene's image is saved under.
    pub fn file_name(&self, index: usize) -> String {
        format!("scene_{}.jpg", self.scene_id(index))
    }
}

/// A parsed visual script.
///
/// Entries stay as raw JSON until [`VisualScript::scene`] is called, so a
/// malformed entry only affects its own scene.
#[derive(Debug, Clone, Default)]
pub struct VisualScript {
    entries: Vec<Value>,
}

impl VisualScript {
    /// Parses a script document.
    pub fn parse(text: &str) -> Result<Self> {
        let mut document: Value = serde_json::from_str(text)?;
        match document.get_mut(SCENES_KEY).map(Value::take) {
            Some(Value::Array(entries)) => Ok(Self { entries }),
            _ => Err(SceneGenError::MissingScenes),
        }
    }

    /// Number of scene entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the script has no scenes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes the scene at `index`.
    ///
    /// A present but `null` timestamp is rejected rather than treated as
    /// absent, as is a timestamp that would leave the output directory.
    pub fn scene(&self, index: usize) -> Result<Scene> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| SceneGenError::InvalidScene(format!("no scene at index {index}")))?;

        if entry.get(TIMESTAMP_KEY).is_some_and(Value::is_null) {
            return Err(SceneGenError::InvalidScene(format!(
                "scene {index}: timestamp_start is null"
            )));
        }

        let scene = Scene::deserialize(entry)
            .map_err(|e| SceneGenError::InvalidScene(format!("scene {index}: {e}")))?;

        if scene.prompt.trim().is_empty() {
            return Err(SceneGenError::InvalidScene(format!(
                "scene {index}: prompt is empty"
            )));
        }
        if let Some(ts) = &scene.timestamp_start {
            if ts.contains(['/', '\\']) || ts.contains("..") {
                return Err(SceneGenError::InvalidScene(format!(
                    "scene {index}: timestamp_start {ts:?} is not a safe file name"
                )));
            }
        }
        Ok(scene)
    }
}

/// Reads and parses the script at `path`.
pub async fn load_script(path: impl AsRef<Path>) -> Result<VisualScript> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    VisualScript::parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(prompt: &str, timestamp_start: Option<&str>) -> Scene {
        Scene {
            prompt: prompt.into(),
            timestamp_start: timestamp_start.map(Into::into),
        }
    }

    #[test]
    fn test_scene_id_replaces_colons() {
        let scene = scene("a cat", Some("00:01:30"));
        assert_eq!(scene.scene_id(7), "00-01-30");
        assert_eq!(scene.file_name(7), "scene_00-01-30.jpg");
    }

    #[test]
    fn test_scene_id_defaults_to_padded_index() {
        let scene = scene("a dog", None);
        assert_eq!(scene.scene_id(0), "000");
        assert_eq!(scene.scene_id(1), "001");
        assert_eq!(scene.scene_id(42), "042");
        assert_eq!(scene.scene_id(1234), "1234");
    }

    #[test]
    fn test_parse_valid_script() {
        let script = VisualScript::parse(
            r#"{"visual_script":[{"prompt":"a cat","timestamp_start":"00:01"},{"prompt":"a dog"}]}"#,
        )
        .unwrap();
        assert_eq!(script.len(), 2);

        let first = script.scene(0).unwrap();
        assert_eq!(first.prompt, "a cat");
        assert_eq!(first.scene_id(0), "00-01");

        let second = script.scene(1).unwrap();
        assert_eq!(second.timestamp_start, None);
        assert_eq!(second.scene_id(1), "001");
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let script = VisualScript::parse(
            r#"{"title":"x","visual_script":[{"prompt":"a cat","timestamp_end":"00:05","narration":"hi"}]}"#,
        )
        .unwrap();
        assert_eq!(script.scene(0).unwrap().prompt, "a cat");
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = VisualScript::parse("{not json").unwrap_err();
        assert!(matches!(err, SceneGenError::Json(_)));
    }

    #[test]
    fn test_parse_missing_scene_list() {
        let err = VisualScript::parse(r#"{"scenes":[]}"#).unwrap_err();
        assert!(matches!(err, SceneGenError::MissingScenes));

        let err = VisualScript::parse(r#"{"visual_script":"nope"}"#).unwrap_err();
        assert!(matches!(err, SceneGenError::MissingScenes));

        let err = VisualScript::parse("[1, 2]").unwrap_err();
        assert!(matches!(err, SceneGenError::MissingScenes));
    }

    #[test]
    fn test_bad_entry_is_scene_level() {
        let script = VisualScript::parse(
            r#"{"visual_script":[{"timestamp_start":"00:01"},{"prompt":"  "},{"prompt":"ok","timestamp_start":5},{"prompt":"fine"}]}"#,
        )
        .unwrap();
        assert_eq!(script.len(), 4);
        assert!(matches!(script.scene(0), Err(SceneGenError::InvalidScene(_))));
        assert!(matches!(script.scene(1), Err(SceneGenError::InvalidScene(_))));
        assert!(matches!(script.scene(2), Err(SceneGenError::InvalidScene(_))));
        assert_eq!(script.scene(3).unwrap().prompt, "fine");
    }

    #[test]
    fn test_null_timestamp_is_scene_level_error() {
        let script = VisualScript::parse(
            r#"{"visual_script":[{"prompt":"a cat","timestamp_start":null},{"prompt":"a dog"}]}"#,
        )
        .unwrap();
        assert!(matches!(script.scene(0), Err(SceneGenError::InvalidScene(_))));
        assert_eq!(script.scene(1).unwrap().scene_id(1), "001");
    }

    #[test]
    fn test_timestamp_cannot_escape_output_dir() {
        let script = VisualScript::parse(
            r#"{"visual_script":[
                {"prompt":"a","timestamp_start":"../../x"},
                {"prompt":"b","timestamp_start":"00/01"},
                {"prompt":"c","timestamp_start":"00\\01"},
                {"prompt":"d","timestamp_start":"00..01"},
                {"prompt":"e","timestamp_start":"00:01.5"}
            ]}"#,
        )
        .unwrap();
        for index in 0..4 {
            assert!(
                matches!(script.scene(index), Err(SceneGenError::InvalidScene(_))),
                "scene {index} should be rejected"
            );
        }
        assert_eq!(script.scene(4).unwrap().file_name(4), "scene_00-01.5.jpg");
    }

    #[tokio::test]
    async fn test_load_script_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(&path, r#"{"visual_script":[{"prompt":"a cat"}]}"#).unwrap();

        let script = load_script(&path).await.unwrap();
        assert_eq!(script.len(), 1);
    }

    #[tokio::test]
    async fn test_load_script_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_script(dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, SceneGenError::Io(_)));
    }
}
