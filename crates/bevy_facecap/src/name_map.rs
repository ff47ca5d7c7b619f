use bevy::prelude::Resource;
use bevy::utils::HashMap;

/// Blendshape names with `_L`/`_R` suffixes paired with their
/// `Left`/`Right` spelling.
///
/// Detectors and meshes each use one of the two vocabularies. An empty
/// counterpart means the shape has no equivalent on the other side.
pub static BLEND_SHAPE_NAMES: &[(&str, &str)] = &[
    ("browInnerUp", "browInnerUp"),
    ("browDown_L", "browDownLeft"),
    ("browDown_R", "browDownRight"),
    ("browOuterUp_L", "browOuterUpLeft"),
    ("browOuterUp_R", "browOuterUpRight"),
    ("eyeLookUp_L", "eyeLookUpLeft"),
    ("eyeLookUp_R", "eyeLookUpRight"),
    ("eyeLookDown_L", "eyeLookDownLeft"),
    ("eyeLookDown_R", "eyeLookDownRight"),
    ("eyeLookIn_L", "eyeLookInLeft"),
    ("eyeLookIn_R", "eyeLookInRight"),
    ("eyeLookOut_L", "eyeLookOutLeft"),
    ("eyeLookOut_R", "eyeLookOutRight"),
    ("eyeBlink_L", "eyeBlinkLeft"),
    ("eyeBlink_R", "eyeBlinkRight"),
    ("eyeSquint_L", "eyeSquintLeft"),
    ("eyeSquint_R", "eyeSquintRight"),
    ("eyeWide_L", "eyeWideLeft"),
    ("eyeWide_R", "eyeWideRight"),
    ("cheekPuff", "cheekPuff"),
    ("cheekSquint_L", "cheekSquintLeft"),
    ("cheekSquint_R", "cheekSquintRight"),
    ("noseSneer_L", "noseSneerLeft"),
    ("noseSneer_R", "noseSneerRight"),
    ("jawOpen", "jawOpen"),
    ("jawForward", "jawForward"),
    ("jawLeft", "jawLeft"),
    ("jawRight", "jawRight"),
    ("mouthFunnel", "mouthFunnel"),
    ("mouthPucker", "mouthPucker"),
    ("mouthLeft", "mouthLeft"),
    ("mouthRight", "mouthRight"),
    ("mouthRollUpper", "mouthRollUpper"),
    ("mouthRollLower", "mouthRollLower"),
    ("mouthShrugUpper", "mouthShrugUpper"),
    ("mouthShrugLower", "mouthShrugLower"),
    ("mouthClose", "mouthClose"),
    ("mouthSmile_L", "mouthSmileLeft"),
    ("mouthSmile_R", "mouthSmileRight"),
    ("mouthFrown_L", "mouthFrownLeft"),
    ("mouthFrown_R", "mouthFrownRight"),
    ("mouthDimple_L", "mouthDimpleLeft"),
    ("mouthDimple_R", "mouthDimpleRight"),
    ("mouthUpperUp_L", "mouthUpperUpLeft"),
    ("mouthUpperUp_R", "mouthUpperUpRight"),
    ("mouthLowerDown_L", "mouthLowerDownLeft"),
    ("mouthLowerDown_R", "mouthLowerDownRight"),
    ("mouthPress_L", "mouthPressLeft"),
    ("mouthPress_R", "mouthPressRight"),
    ("mouthStretch_L", "mouthStretchLeft"),
    ("mouthStretch_R", "mouthStretchRight"),
    ("tongueOut", ""),
];

/// Lookup between the two blendshape vocabularies, in both directions.
#[derive(Debug, Clone, Resource)]
pub struct NameMap {
    entries: &'static [(&'static str, &'static str)],
    forward: HashMap<&'static str, &'static str>,
    reverse: HashMap<&'static str, &'static str>,
}

impl NameMap {
    pub fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        let forward = entries.iter().copied().collect();
        let reverse = entries.iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|&(key, value)| (value, key))
            .collect();
        Self {
            entries,
            forward,
            reverse,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item=(&'static str, &'static str)> {
        self.entries.iter().copied()
    }

    /// The raw entry for a suffixed name, which may be empty.
    pub fn get(&self, key: &str) -> Option<&'static str> {
        self.forward.get(key).copied()
    }

    /// The suffixed name paired with `value`. Never matches the empty entry.
    pub fn key_for(&self, value: &str) -> Option<&'static str> {
        self.reverse.get(value).copied()
    }

    /// The name `name` is paired with, looked up from either side.
    ///
    /// Shapes spelled the same way in both vocabularies are their own
    /// counterpart. Empty entries have none.
    pub fn counterpart(&self, name: &str) -> Option<&'static str> {
        self.key_for(name)
            .or_else(|| self.get(name).filter(|value| !value.is_empty()))
    }
}

impl Default for NameMap {
    fn default() -> Self {
        Self::new(BLEND_SHAPE_NAMES)
    }
}
