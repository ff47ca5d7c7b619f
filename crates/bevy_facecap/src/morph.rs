use bevy::hierarchy::HierarchyQueryExt;
use bevy::pbr::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::{Added, Assets, Children, Commands, Component, DetectChanges, Entity, Handle, Mesh, Name, Query, Res, With, Without};
use bevy::render::mesh::morph::MorphWeights;
use bevy::utils::HashMap;

use crate::name_map::NameMap;
use crate::scene::AvatarConfig;
use crate::tracking::{Blendshape, BlendshapeState};

/// Morph target name to influence index for one mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTargetDictionary {
    indices: HashMap<String, usize>,
}

impl MorphTargetDictionary {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            indices: names.iter()
                .enumerate()
                .map(|(index, name)| (name.as_ref().to_string(), index))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item=(&str, usize)> {
        self.indices.iter().map(|(name, index)| (name.as_str(), *index))
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Writes each blendshape's value into the influence of the morph target it
/// is paired with in `map`, whichever vocabulary the mesh uses. Influences
/// without a matching blendshape are left alone.
///
/// Returns the number of influences written.
pub fn apply_blendshapes(
    map: &NameMap,
    blendshapes: &[Blendshape],
    dictionary: &MorphTargetDictionary,
    influences: &mut [f32],
) -> usize {
    // First occurrence of a name wins.
    let mut values = HashMap::default();
    for blendshape in blendshapes {
        values.entry(blendshape.name.as_str()).or_insert(blendshape.value);
    }

    let mut written = 0;
    for (target, index) in dictionary.iter() {
        let Some(value) = map.counterpart(target).and_then(|name| values.get(name)) else {
            continue;
        };

        let Some(influence) = influences.get_mut(index) else {
            tracing::debug!("morph target {} index {} out of range", target, index);
            continue;
        };

        *influence = *value;
        written += 1;
    }
    written
}

/// Marks the node driven by face tracking.
#[derive(Component)]
pub struct HeadMesh;

pub fn find_head(
    mut commands: Commands,
    config: Res<AvatarConfig>,
    meshes: Res<Assets<Mesh>>,
    // Primitives are named after their mesh, which may share the node's name.
    named: Query<(Entity, &Name, Option<&MorphWeights>), (Added<Name>, Without<Handle<Mesh>>)>,
    children: Query<&Children>,
    mesh_handles: Query<&Handle<Mesh>>,
) {
    for (entity, name, weights) in &named {
        if name.as_str() != config.head_node {
            continue;
        }

        if weights.is_none() {
            // glTF only puts weights on the node when the mesh declares
            // defaults, so build them from the first morphed primitive.
            let first_mesh = children.iter_descendants(entity)
                .filter_map(|child| mesh_handles.get(child).ok())
                .find_map(|handle| {
                    let count = meshes.get(handle)?.morph_target_names()?.len();
                    Some((handle.clone(), count))
                });

            let Some((handle, count)) = first_mesh else {
                tracing::warn!("head node {} has no morph targets", name);
                continue;
            };

            match MorphWeights::new(vec![0.0; count], Some(handle)) {
                Ok(weights) => {
                    commands.entity(entity).insert(weights);
                }
                Err(err) => {
                    tracing::warn!("failed to create morph weights for {}: {}", name, err);
                    continue;
                }
            }
        }

        tracing::info!("found head node {}", name);
        commands.entity(entity).insert(HeadMesh);
    }
}

pub fn update_head_influences(
    mut commands: Commands,
    map: Res<NameMap>,
    state: Res<BlendshapeState>,
    meshes: Res<Assets<Mesh>>,
    mut heads: Query<(Entity, &mut MorphWeights), With<HeadMesh>>,
    children: Query<&Children>,
) {
    for (entity, mut weights) in &mut heads {
        if !state.is_changed() && !weights.is_added() {
            continue;
        }

        let Some(names) = weights.first_mesh()
            .and_then(|handle| meshes.get(handle))
            .and_then(|mesh| mesh.morph_target_names()) else {
            continue;
        };

        let dictionary = MorphTargetDictionary::from_names(names);
        if dictionary.is_empty() {
            continue;
        }

        let written = apply_blendshapes(&map, state.blendshapes(), &dictionary, weights.weights_mut());
        tracing::trace!("wrote {} of {} morph target influences", written, dictionary.len());

        for node in std::iter::once(entity).chain(children.iter_descendants(entity)) {
            commands.entity(node).remove::<(NotShadowCaster, NotShadowReceiver)>();
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use bevy::render::mesh::PrimitiveTopology;
    use bevy::render::render_asset::RenderAssetUsages;

    use super::*;

    fn blendshape(name: &str, value: f32) -> Blendshape {
        Blendshape {
            name: name.to_string(),
            value,
        }
    }

    fn dictionary() -> MorphTargetDictionary {
        MorphTargetDictionary::from_names(&[
            "browInnerUp",
            "jawOpen",
            "eyeBlinkLeft",
            "eyeBlinkRight",
            "mouthClose",
            "cheekPuff",
            "noseSneerLeft",
            "browDownLeft",
        ])
    }

    #[test]
    fn writes_mapped_target() {
        let map = NameMap::default();
        let dictionary = dictionary();
        assert_eq!(dictionary.get("browDownLeft"), Some(7));

        let mut influences = [0.0; 8];
        let written = apply_blendshapes(&map, &[blendshape("browDown_L", 0.42)], &dictionary, &mut influences);

        assert_eq!(written, 1);
        assert_eq!(influences[7], 0.42);
        assert_eq!(&influences[..7], &[0.0; 7]);
    }

    #[test]
    fn every_pair_drives_its_counterpart() {
        let map = NameMap::default();
        let pairs = map.entries()
            .filter(|(_, value)| !value.is_empty())
            .collect::<Vec<_>>();
        let suffixed = MorphTargetDictionary::from_names(&pairs.iter().map(|(key, _)| *key).collect::<Vec<_>>());
        let sided = MorphTargetDictionary::from_names(&pairs.iter().map(|(_, value)| *value).collect::<Vec<_>>());

        for (i, &(key, value)) in pairs.iter().enumerate() {
            let score = i as f32 / 100.0;

            // Suffixed detector names driving a sided mesh.
            let mut influences = vec![-1.0; pairs.len()];
            apply_blendshapes(&map, &[blendshape(key, score)], &sided, &mut influences);
            assert_eq!(influences[sided.get(value).unwrap()], score, "{}", key);

            // Sided detector names driving a suffixed mesh.
            let mut influences = vec![-1.0; pairs.len()];
            apply_blendshapes(&map, &[blendshape(value, score)], &suffixed, &mut influences);
            assert_eq!(influences[suffixed.get(key).unwrap()], score, "{}", value);
        }
    }

    #[test]
    fn sided_detector_names_drive_suffixed_targets() {
        let map = NameMap::default();
        let dictionary = MorphTargetDictionary::from_names(&["browDown_L", "eyeBlink_R", "jawOpen"]);
        let mut influences = [0.0; 3];

        let blendshapes = [
            blendshape("browDownLeft", 0.42),
            blendshape("eyeBlinkRight", 0.3),
            blendshape("jawOpen", 0.7),
        ];
        let written = apply_blendshapes(&map, &blendshapes, &dictionary, &mut influences);

        assert_eq!(written, 3);
        assert_eq!(influences, [0.42, 0.3, 0.7]);
    }

    #[test]
    fn unmatched_targets_keep_their_value() {
        let map = NameMap::default();
        let dictionary = dictionary();
        let mut influences = [0.5; 8];

        assert_eq!(apply_blendshapes(&map, &[], &dictionary, &mut influences), 0);
        assert_eq!(influences, [0.5; 8]);

        // Unmapped names, and names only matching the target's own spelling, are skipped.
        let unmapped = [blendshape("_neutral", 1.0), blendshape("browDownLeft", 1.0)];
        assert_eq!(apply_blendshapes(&map, &unmapped, &dictionary, &mut influences), 0);
        assert_eq!(influences, [0.5; 8]);
    }

    #[test]
    fn tongue_out_is_ignored() {
        let map = NameMap::default();
        let dictionary = MorphTargetDictionary::from_names(&["", "tongueOut", "jawOpen"]);
        let mut influences = [0.0; 3];

        let written = apply_blendshapes(&map, &[blendshape("tongueOut", 0.9)], &dictionary, &mut influences);
        assert_eq!(written, 0);
        assert_eq!(influences, [0.0; 3]);
    }

    #[test]
    fn unmapped_dictionary_entries_are_skipped() {
        let map = NameMap::default();
        let dictionary = MorphTargetDictionary::from_names(&["hairSwoosh", "jawOpen"]);
        let mut influences = [0.25; 2];

        apply_blendshapes(&map, &[blendshape("jawOpen", 0.6)], &dictionary, &mut influences);
        assert_eq!(influences, [0.25, 0.6]);
    }

    #[test]
    fn first_duplicate_wins() {
        let map = NameMap::default();
        let dictionary = MorphTargetDictionary::from_names(&["jawOpen"]);
        let mut influences = [0.0];

        let blendshapes = [blendshape("jawOpen", 0.3), blendshape("jawOpen", 0.9)];
        apply_blendshapes(&map, &blendshapes, &dictionary, &mut influences);
        assert_eq!(influences, [0.3]);
    }

    #[test]
    fn out_of_range_index_is_skipped() {
        let map = NameMap::default();
        let dictionary = MorphTargetDictionary::from_names(&["browInnerUp", "jawOpen"]);
        let mut influences = [0.0];

        let written = apply_blendshapes(&map, &[blendshape("jawOpen", 0.7)], &dictionary, &mut influences);
        assert_eq!(written, 0);
        assert_eq!(influences, [0.0]);
    }

    fn app() -> App {
        let mut app = App::new();
        app
            .add_plugins(MinimalPlugins)
            .init_resource::<Assets<Mesh>>()
            .init_resource::<NameMap>()
            .init_resource::<BlendshapeState>()
            .insert_resource(AvatarConfig::default())
            .add_systems(Update, (find_head, update_head_influences).chain());
        app
    }

    fn head_app(names: &[&str]) -> (App, Entity) {
        let mut app = app();
        let head = spawn_head(&mut app, names);
        (app, head)
    }

    fn spawn_head(app: &mut App, names: &[&str]) -> Entity {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.set_morph_target_names(names.iter().map(|n| n.to_string()).collect());
        let mesh = app.world_mut().resource_mut::<Assets<Mesh>>().add(mesh);

        let weights = MorphWeights::new(vec![0.0; names.len()], Some(mesh)).unwrap();
        app.world_mut()
            .spawn((Name::new("mesh_2"), weights, NotShadowCaster, NotShadowReceiver))
            .id()
    }

    fn publish(app: &mut App, blendshapes: Vec<Blendshape>) {
        app.world_mut().resource_mut::<BlendshapeState>().publish(blendshapes);
        app.update();
    }

    #[test]
    fn later_frames_keep_earlier_influences() {
        let (mut app, head) = head_app(&["jawOpen", "eyeBlink_L"]);
        app.update();

        publish(&mut app, vec![blendshape("jawOpen", 0.8)]);
        publish(&mut app, vec![blendshape("eyeBlinkLeft", 0.5)]);

        let weights = app.world().get::<MorphWeights>(head).unwrap();
        assert_eq!(weights.weights(), &[0.8, 0.5]);
    }

    #[test]
    fn head_loaded_after_publish_gets_current_expression() {
        let mut app = app();
        app.world_mut().resource_mut::<BlendshapeState>()
            .publish(vec![blendshape("jawOpen", 0.6)]);
        app.update();
        // No publish after this point.
        app.update();

        let head = spawn_head(&mut app, &["eyeBlinkLeft", "jawOpen"]);
        app.update();

        let weights = app.world().get::<MorphWeights>(head).unwrap();
        assert_eq!(weights.weights(), &[0.0, 0.6]);
    }

    #[test]
    fn primitive_sharing_head_name_is_ignored() {
        let (mut app, head) = head_app(&["jawOpen"]);
        let mesh = app.world_mut().resource_mut::<Assets<Mesh>>()
            .add(Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default()));
        let primitive = app.world_mut().spawn((Name::new("mesh_2"), mesh)).id();
        app.update();

        assert!(app.world().entity(head).contains::<HeadMesh>());
        assert!(!app.world().entity(primitive).contains::<HeadMesh>());
    }

    #[test]
    fn replaced_list_does_not_reset_influences() {
        let (mut app, head) = head_app(&["jawOpen", "eyeBlinkLeft"]);
        app.update();

        publish(&mut app, vec![blendshape("jawOpen", 0.8)]);
        publish(&mut app, vec![blendshape("eyeBlink_L", 0.5)]);

        let weights = app.world().get::<MorphWeights>(head).unwrap();
        assert_eq!(weights.weights(), &[0.8, 0.5]);
    }

    #[test]
    fn head_casts_and_receives_shadows() {
        let (mut app, head) = head_app(&["jawOpen"]);
        publish(&mut app, vec![blendshape("jawOpen", 0.1)]);

        let head = app.world().entity(head);
        assert!(head.contains::<HeadMesh>());
        assert!(!head.contains::<NotShadowCaster>());
        assert!(!head.contains::<NotShadowReceiver>());
    }
}
