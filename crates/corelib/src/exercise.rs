//! Course exercise variants and the per-variant host configuration.

use std::fmt;
use std::str::FromStr;

use crate::Vec3;
use crate::camera::FlyCamera;
use crate::error::CoreError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Exercise {
    /// Hardcoded vertex-colored cube, keyboard-driven model.
    Cube,
    /// OBJ mesh with a texture, keyboard-driven model.
    Textured,
    /// OBJ mesh with texture, Phong lighting and the fly camera.
    #[default]
    Lit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometrySource {
    BuiltinCube,
    ObjFile,
}

/// Everything that differs between exercises.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExerciseConfig {
    pub exercise: Exercise,
    pub geometry: GeometrySource,
    pub textured: bool,
    pub lit: bool,
    pub fly_camera: bool,
    pub instances: usize,
    pub camera: FlyCamera,
}

const FIXED_EYE: Vec3 = Vec3::splat(1.5);
const FLY_START: Vec3 = Vec3::new(0.0, 0.0, 3.0);

impl Exercise {
    pub const ALL: [Exercise; 3] = [Exercise::Cube, Exercise::Textured, Exercise::Lit];

    pub fn name(self) -> &'static str {
        match self {
            Exercise::Cube => "cube",
            Exercise::Textured => "textured",
            Exercise::Lit => "lit",
        }
    }

    pub fn config(self) -> ExerciseConfig {
        let fixed = FlyCamera::looking_at(FIXED_EYE, Vec3::ZERO);
        match self {
            Exercise::Cube => ExerciseConfig {
                exercise: self,
                geometry: GeometrySource::BuiltinCube,
                textured: false,
                lit: false,
                fly_camera: false,
                instances: 2,
                camera: fixed,
            },
            Exercise::Textured => ExerciseConfig {
                exercise: self,
                geometry: GeometrySource::ObjFile,
                textured: true,
                lit: false,
                fly_camera: false,
                instances: 2,
                camera: fixed,
            },
            Exercise::Lit => ExerciseConfig {
                exercise: self,
                geometry: GeometrySource::ObjFile,
                textured: true,
                lit: true,
                fly_camera: true,
                instances: 2,
                camera: FlyCamera::new(FLY_START),
            },
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Exercise {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Exercise::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownExercise(s.to_owned()))
    }
}
