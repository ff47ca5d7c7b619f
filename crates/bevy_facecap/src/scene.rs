use bevy::app::{App, Plugin};
use bevy::prelude::*;

use crate::morph::{find_head, update_head_influences};
use crate::name_map::NameMap;
use crate::tracking::{capture_video_frames, BlendshapeState, VideoFrame};
use crate::webcam::{spawn_webcam_preview, WebcamTexture};

/// Scene setup shared by the startup and per-frame systems.
#[derive(Debug, Clone, Resource)]
pub struct AvatarConfig {
    /// glTF binary, relative to the asset directory.
    pub model: String,
    /// Name of the node carrying the face morph targets.
    pub head_node: String,
    pub camera_preview: bool,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            model: "facecap.glb".to_string(),
            head_node: "mesh_2".to_string(),
            camera_preview: false,
        }
    }
}

/// Loads the head, drives its morph targets from detected blendshapes and
/// sets up the camera and lights around it.
///
/// A [`crate::landmarker::Landmarker`] resource must be inserted separately.
pub struct AvatarPlugin {
    pub config: AvatarConfig,
}

impl Plugin for AvatarPlugin {
    fn name(&self) -> &str {
        "Avatar"
    }

    fn build(&self, app: &mut App) {
        app
            .insert_resource(self.config.clone())
            .init_resource::<NameMap>()
            .init_resource::<BlendshapeState>()
            .init_resource::<WebcamTexture>()
            .add_event::<VideoFrame>()
            .add_systems(Startup, setup_scene)
            .add_systems(Update, (
                capture_video_frames,
                find_head,
                update_head_influences,
            ).chain());

        if self.config.camera_preview {
            app.add_systems(Startup, spawn_webcam_preview);
        }
    }
}

fn setup_scene(
    mut commands: Commands,
    config: Res<AvatarConfig>,
    asset_server: Res<AssetServer>,
) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 300.,
    });

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(2., 4., 6.)
            .looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });

    commands.spawn(Camera3dBundle {
        transform: Transform::from_xyz(0., 0., 5.)
            .looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });

    tracing::info!("loading model {}", config.model);
    commands.spawn(SceneBundle {
        scene: asset_server.load(format!("{}#Scene0", config.model)),
        ..default()
    });
}
