use crate::layer::{FeatureType, Layer, MapProps};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Parse(#[from] simd_json::Error),
    #[error("duplicate layer name {0:?}")]
    DuplicateLayer(String),
}

/// Map flags plus the ordered layer definitions
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub map: MapProps,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl MapConfig {
    /// Parse a JSON config. `simd-json` parses in place, so the buffer is consumed.
    pub fn from_json(mut bytes: Vec<u8>) -> Result<Self, ConfigError> {
        let config: MapConfig = simd_json::serde::from_slice(&mut bytes)?;
        config.check_names()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(fs::read(path)?)
    }

    fn check_names(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for layer in &self.layers {
            if !seen.insert(layer.name.as_str()) {
                return Err(ConfigError::DuplicateLayer(layer.name.clone()));
            }
        }
        Ok(())
    }

    /// Built-in layers used when no config file is given
    pub fn demo() -> Self {
        Self {
            map: MapProps::default(),
            layers: vec![
                Layer::new("Zones", &[FeatureType::Polygon, FeatureType::Rectangle], "red"),
                Layer::new("Routes", &[FeatureType::Polyline], "yellow"),
                Layer::new("DeliveryPoints", &[FeatureType::Marker, FeatureType::Circle], "green")
                    .editable(true),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_with_defaults() {
        let json = br#"{
            "layers": [
                {"name": "Zones", "features": ["polygon", "rectangle"], "color": "red"},
                {"name": "Points", "editable": true, "visible": false, "features": ["marker"]}
            ]
        }"#;
        let config = MapConfig::from_json(json.to_vec()).unwrap();
        assert_eq!(config.map, MapProps::default());
        assert_eq!(config.layers.len(), 2);
        assert_eq!(
            config.layers[0].permitted_features,
            vec![FeatureType::Polygon, FeatureType::Rectangle]
        );
        assert!(config.layers[0].visible);
        assert!(!config.layers[1].visible);
        assert!(config.layers[1].editable);
        assert_eq!(config.layers[1].color, "blue");
    }

    #[test]
    fn test_map_flags() {
        let json = br#"{"map": {"drawable": true, "editable": false}, "layers": []}"#;
        let config = MapConfig::from_json(json.to_vec()).unwrap();
        assert!(config.map.drawable);
        assert!(!config.map.editable);
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let json = br#"{"layers": [{"name": "A", "features": ["hexagon"]}]}"#;
        assert!(matches!(
            MapConfig::from_json(json.to_vec()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_duplicate_layer_names_rejected() {
        let json = br#"{"layers": [{"name": "A"}, {"name": "A"}]}"#;
        assert!(matches!(
            MapConfig::from_json(json.to_vec()),
            Err(ConfigError::DuplicateLayer(name)) if name == "A"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"map": {"drawable": false}, "layers": [{"name": "Walls", "features": ["polyline"]}]}"#)
            .unwrap();
        let config = MapConfig::load(file.path()).unwrap();
        assert!(!config.map.drawable);
        assert!(config.map.editable);
        assert_eq!(config.layers[0].name, "Walls");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MapConfig::load(&dir.path().join("layers.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
