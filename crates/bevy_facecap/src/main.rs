use std::net::SocketAddr;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_inspector_egui::quick::WorldInspectorPlugin;
use clap::Parser;

use crate::landmarker::{Landmarker, RemoteLandmarker};
use crate::scene::{AvatarConfig, AvatarPlugin};
use crate::tracking::capture_video_frames;

mod api;
mod landmarker;
mod morph;
mod name_map;
mod scene;
mod tracking;
mod webcam;

#[derive(Parser)]
struct Options {
    #[arg(long, default_value = "127.0.0.1:8888")]
    pub api_bind: String,
    /// glTF binary to load, relative to the asset directory.
    #[arg(long, short = 'm', default_value = "facecap.glb")]
    pub model: String,
    /// Node whose morph targets follow the face.
    #[arg(long, default_value = "mesh_2")]
    pub head_node: String,
    /// Show the incoming camera frames next to the head.
    #[arg(long)]
    pub camera_preview: bool,
    #[arg(long)]
    pub inspector: bool,
}

impl Options {
    fn avatar_config(&self) -> AvatarConfig {
        AvatarConfig {
            model: self.model.clone(),
            head_node: self.head_node.clone(),
            camera_preview: self.camera_preview,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let options = Options::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let api_addr: SocketAddr = options.api_bind.parse()?;
    let landmarker = RemoteLandmarker::default();
    let (api_state, api_resource) = api::ApiState::new(landmarker.clone());
    runtime.spawn(async move {
        tracing::info!("serving API on {}", api_addr);
        let service = api::new_api().with_state(api_state).into_make_service();
        if let Err(err) = axum_server::bind(api_addr).serve(service).await {
            tracing::error!("failed to serve API: {}", err);
        }
    });

    let mut app = App::new();
    app
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "facecap".to_string(),
                ..default()
            }),
            ..default()
        }).disable::<LogPlugin>())
        .add_plugins(AvatarPlugin {
            config: options.avatar_config(),
        })
        .insert_resource(Landmarker::new(landmarker))
        .insert_resource(api_resource)
        .add_systems(Update, api::update_api.before(capture_video_frames));

    if options.inspector {
        app
            .add_plugins(EguiPlugin)
            .add_plugins(WorldInspectorPlugin::new());
    }

    app.run();
    Ok(())
}
