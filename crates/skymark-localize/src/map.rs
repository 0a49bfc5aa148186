//! Landmark map: where each identity hangs and where its dots are.
//!
//! A landmark's points are stored in observation order: the three corner
//! dots `[H1, S, H2]` first, then one point per lit code cell in ascending
//! bit order. Point `k < 3` is what corner `k` of an observation measures.

use crate::MapError;
use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use skymark_detect::code::{self, identity_cells, CORNER_CELLS};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A landmark with its points in the landmark's own frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MapLandmark {
    pub id: u16,
    /// Landmark frame to world.
    pub pose: Isometry3<f64>,
    pub points: Vec<Point3<f64>>,
}

impl MapLandmark {
    /// Landmark with explicit local points.
    pub fn new(
        id: u16,
        pose: Isometry3<f64>,
        points: Vec<Point3<f64>>,
    ) -> Result<Self, MapError> {
        if !code::is_valid_identity(id) {
            return Err(MapError::InvalidIdentity { id });
        }
        let expected = expected_point_count(id);
        if points.len() != expected {
            return Err(MapError::PointCount {
                id,
                expected,
                got: points.len(),
            });
        }
        Ok(Self { id, pose, points })
    }

    /// Landmark whose points sit on the code grid with cell pitch `spacing`
    /// (metres) in the landmark's x/y plane.
    pub fn from_identity(id: u16, pose: Isometry3<f64>, spacing: f64) -> Result<Self, MapError> {
        let at = |(i, j): (usize, usize)| Point3::new(spacing * i as f64, spacing * j as f64, 0.0);
        let points = CORNER_CELLS
            .into_iter()
            .chain(identity_cells(id))
            .map(at)
            .collect();
        Self::new(id, pose, points)
    }

    /// Points transformed into the world frame.
    pub fn world_points(&self) -> Vec<Point3<f64>> {
        self.points.iter().map(|p| self.pose * p).collect()
    }
}

/// Three corners plus one dot per lit code cell.
pub fn expected_point_count(id: u16) -> usize {
    3 + id.count_ones() as usize
}

/// Landmarks keyed by identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LandmarkMap {
    landmarks: BTreeMap<u16, MapLandmark>,
}

impl LandmarkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_landmarks(
        landmarks: impl IntoIterator<Item = MapLandmark>,
    ) -> Result<Self, MapError> {
        let mut map = Self::new();
        for lm in landmarks {
            map.insert(lm)?;
        }
        Ok(map)
    }

    pub fn insert(&mut self, landmark: MapLandmark) -> Result<(), MapError> {
        let id = landmark.id;
        if self.landmarks.contains_key(&id) {
            return Err(MapError::DuplicateLandmark { id });
        }
        self.landmarks.insert(id, landmark);
        Ok(())
    }

    pub fn get(&self, id: u16) -> Option<&MapLandmark> {
        self.landmarks.get(&id)
    }

    /// Identities in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.landmarks.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MapLandmark> {
        self.landmarks.values()
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Transform every landmark into the world frame.
    pub fn to_world(&self) -> WorldMap {
        let landmarks = self
            .landmarks
            .values()
            .map(|lm| {
                let world = WorldLandmark {
                    id: lm.id,
                    position: Point3::from(lm.pose.translation.vector),
                    points: lm.world_points(),
                };
                (lm.id, world)
            })
            .collect();
        WorldMap { landmarks }
    }

    /// Load a JSON map.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let raw = fs::read_to_string(path)?;
        let file: MapFile = serde_json::from_str(&raw)?;
        file.build()
    }

    /// Write this map as pretty JSON with explicit points.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), MapError> {
        let json = serde_json::to_string_pretty(&MapFile::from(self))?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// A landmark with world-frame points.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldLandmark {
    pub id: u16,
    /// Origin of the landmark frame.
    pub position: Point3<f64>,
    pub points: Vec<Point3<f64>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldMap {
    landmarks: BTreeMap<u16, WorldLandmark>,
}

impl WorldMap {
    pub fn get(&self, id: u16) -> Option<&WorldLandmark> {
        self.landmarks.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldLandmark> {
        self.landmarks.values()
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Lowest z over all landmark points, `None` for an empty map.
    pub fn min_z(&self) -> Option<f64> {
        self.landmarks
            .values()
            .flat_map(|lm| lm.points.iter().map(|p| p.z))
            .reduce(f64::min)
    }

    /// Highest admissible camera z: one metre below the lowest landmark
    /// point. Unbounded for an empty map.
    pub fn z_upper_bound(&self) -> f64 {
        self.min_z().map_or(f64::INFINITY, |z| z - 1.0)
    }
}

/// On-disk map layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MapFile {
    pub landmarks: Vec<MapFileEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapFileEntry {
    pub id: u16,
    /// Landmark origin in the world, metres.
    pub position: [f64; 3],
    /// Landmark orientation as `[w, x, y, z]`.
    #[serde(default = "identity_wxyz")]
    pub orientation: [f64; 4],
    /// Local points in observation order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f64; 3]>>,
    /// Code grid pitch used when `points` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<f64>,
}

fn identity_wxyz() -> [f64; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

impl MapFileEntry {
    fn build(&self) -> Result<MapLandmark, MapError> {
        let [w, x, y, z] = self.orientation;
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));
        let translation = Translation3::from(Vector3::from(self.position));
        let pose = Isometry3::from_parts(translation, rotation);

        match (&self.points, self.spacing) {
            (Some(points), _) => MapLandmark::new(
                self.id,
                pose,
                points.iter().map(|&p| Point3::from(p)).collect(),
            ),
            (None, Some(spacing)) => MapLandmark::from_identity(self.id, pose, spacing),
            (None, None) => Err(MapError::MissingPoints { id: self.id }),
        }
    }
}

impl MapFile {
    pub fn build(&self) -> Result<LandmarkMap, MapError> {
        let landmarks = self
            .landmarks
            .iter()
            .map(MapFileEntry::build)
            .collect::<Result<Vec<_>, _>>()?;
        LandmarkMap::from_landmarks(landmarks)
    }
}

impl From<&LandmarkMap> for MapFile {
    fn from(map: &LandmarkMap) -> Self {
        let landmarks = map
            .iter()
            .map(|lm| {
                let q = lm.pose.rotation;
                MapFileEntry {
                    id: lm.id,
                    position: lm.pose.translation.vector.into(),
                    orientation: [q.w, q.i, q.j, q.k],
                    points: Some(lm.points.iter().map(|p| p.coords.into()).collect()),
                    spacing: None,
                }
            })
            .collect();
        Self { landmarks }
    }
}
