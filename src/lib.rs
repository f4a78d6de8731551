mod core;
mod helpers;
mod terrain;

use crate::core::camera::CameraPlugin;
use crate::terrain::TerrainPlugin;
use crate::terrain::resources::TerrainSettings;
use bevy::app::App;
#[cfg(debug_assertions)]
use bevy::diagnostic::LogDiagnosticsPlugin;
use bevy::prelude::*;
use std::path::{Path, PathBuf};
use terrainmesh::config::TerrainGenConfig;

/// Viewer for generated terrain: runs generation jobs off the main thread and
/// spawns the resulting LODs.
pub struct TerrainViewerPlugin {
    pub config_path: PathBuf,
}

impl Plugin for TerrainViewerPlugin {
    fn build(&self, app: &mut App) {
        let config = load_config(&self.config_path);

        app.insert_resource(TerrainSettings(config))
            .add_plugins((CameraPlugin, TerrainPlugin));

        #[cfg(debug_assertions)]
        {
            app.add_plugins(LogDiagnosticsPlugin::default());
        }
    }
}

/// Falls back to defaults when the file is missing or invalid.
pub fn load_config(path: &Path) -> TerrainGenConfig {
    match TerrainGenConfig::load_from_file(path) {
        Ok(config) => {
            info!("Loaded terrain config from {}", path.display());
            config
        }
        Err(err) => {
            warn!(
                "Could not load terrain config {} ({err}), using defaults",
                path.display()
            );
            TerrainGenConfig::default()
        }
    }
}
