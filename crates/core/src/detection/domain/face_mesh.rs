//! Dense face-mesh landmarks in frame pixel coordinates.
//!
//! Indexing follows the 468-point MediaPipe face mesh topology; a mesh
//! may carry fewer points when produced by a truncated model, so every
//! lookup is fallible.

use crate::shared::frame::Frame;

/// Number of landmarks in a full face mesh.
pub const FACE_MESH_POINTS: usize = 468;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceMesh {
    points: Vec<(f64, f64)>,
}

impl FaceMesh {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<(f64, f64)> {
        self.points.get(index).copied()
    }
}

/// Produces a face mesh for the most prominent face in an RGB frame.
///
/// `Ok(None)` means no face was found, which is not an error.
pub trait FaceMeshEstimator: Send {
    fn estimate(&mut self, frame: &Frame) -> Result<Option<FaceMesh>, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_lookup() {
        let mesh = FaceMesh::new(vec![(1.0, 2.0), (3.0, 4.0)]);
        assert_eq!(mesh.len(), 2);
        assert_eq!(mesh.point(1), Some((3.0, 4.0)));
        assert_eq!(mesh.point(2), None);
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = FaceMesh::new(Vec::new());
        assert!(mesh.is_empty());
        assert_eq!(mesh.point(0), None);
    }
}
