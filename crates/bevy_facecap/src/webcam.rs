use bevy::prelude::*;

/// The image holding the most recently delivered camera frame.
#[derive(Resource)]
pub struct WebcamTexture {
    pub image: Handle<Image>,
}

impl FromWorld for WebcamTexture {
    fn from_world(world: &mut World) -> Self {
        let mut images = world.resource_mut::<Assets<Image>>();
        Self {
            image: images.add(Image::default()),
        }
    }
}

/// A quad showing the camera feed.
#[derive(Component)]
pub struct WebcamPreview {
    pub material: Handle<StandardMaterial>,
}

pub fn spawn_webcam_preview(
    mut commands: Commands,
    webcam: Res<WebcamTexture>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let material = materials.add(StandardMaterial {
        base_color_texture: Some(webcam.image.clone()),
        unlit: true,
        ..default()
    });

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Rectangle::new(1.6, 0.9)),
            material: material.clone(),
            transform: Transform::from_xyz(1.6, -1.0, 0.),
            ..default()
        },
        WebcamPreview { material },
    ));
}
