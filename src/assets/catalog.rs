//! Compiled-in asset catalog

use serde::Serialize;

use crate::pipeline::control::ControlType;

const THREEJS_MODELS: &str = "https://threejs.org/examples/models/gltf/";
const KHRONOS_SAMPLES: &str = "https://raw.githubusercontent.com/KhronosGroup/glTF-Sample-Models/main/2.0/";

/// A catalog entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub url: String,
    pub default_scale: f32,
    pub default_control: ControlType,
    pub clips: &'static [&'static str],
}

fn entry(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    url: String,
    default_scale: f32,
    default_control: ControlType,
    clips: &'static [&'static str],
) -> AssetDescriptor {
    AssetDescriptor {
        id,
        name,
        description,
        url,
        default_scale,
        default_control,
        clips,
    }
}

fn threejs(file: &str) -> String {
    format!("{}{}", THREEJS_MODELS, file)
}

fn khronos(model: &str) -> String {
    format!("{}{}/glTF-Binary/{}.glb", KHRONOS_SAMPLES, model, model)
}

/// The set of assets a user can add
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<AssetDescriptor>,
}

impl Default for Catalog {
    fn default() -> Self {
        use ControlType::*;

        Self {
            entries: vec![
                entry(
                    "xbot",
                    "X Bot",
                    "Humanoid robot character",
                    threejs("Xbot.glb"),
                    1.0,
                    BothHands,
                    &["idle", "walk", "run"],
                ),
                entry(
                    "soldier",
                    "Soldier",
                    "Animated soldier with skeletal animation",
                    threejs("Soldier.glb"),
                    1.0,
                    RightHand,
                    &["Idle", "Walk", "Run"],
                ),
                entry(
                    "robot",
                    "Robot",
                    "Expressive robotic character",
                    threejs("RobotExpressive/RobotExpressive.glb"),
                    0.5,
                    LeftHand,
                    &["Idle", "Walking", "Running", "Dance", "Wave"],
                ),
                entry(
                    "flying-saucer",
                    "Flying Saucer",
                    "UFO that hovers above your head",
                    "https://raw.githubusercontent.com/BabylonJS/MeshesLibrary/master/ufo.glb"
                        .to_string(),
                    1.0,
                    TopOfHead,
                    &[],
                ),
                entry(
                    "parrot",
                    "Parrot",
                    "Animated flying parrot",
                    threejs("Parrot.glb"),
                    0.03,
                    RightHand,
                    &["fly"],
                ),
                entry(
                    "flamingo",
                    "Flamingo",
                    "Animated flying flamingo",
                    threejs("Flamingo.glb"),
                    0.03,
                    LeftHand,
                    &["fly"],
                ),
                entry(
                    "stork",
                    "Stork",
                    "Animated flying stork",
                    threejs("Stork.glb"),
                    0.03,
                    TopOfHead,
                    &["fly"],
                ),
                entry(
                    "duck",
                    "Duck",
                    "Classic rubber duck",
                    khronos("Duck"),
                    1.0,
                    Mouth,
                    &[],
                ),
                entry(
                    "damaged-helmet",
                    "Damaged Helmet",
                    "Battle-worn sci-fi helmet",
                    khronos("DamagedHelmet"),
                    1.0,
                    Head,
                    &[],
                ),
                entry(
                    "avocado",
                    "Avocado",
                    "Delicious avocado",
                    khronos("Avocado"),
                    30.0,
                    Mouth,
                    &[],
                ),
            ],
        }
    }
}

impl Catalog {
    pub fn find(&self, id: &str) -> Option<&AssetDescriptor> {
        self.entries.iter().find(|a| a.id == id)
    }

    pub fn all(&self) -> &[AssetDescriptor] {
        &self.entries
    }
}
