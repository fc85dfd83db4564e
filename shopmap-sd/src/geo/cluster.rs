//! Map pin clustering
//!
//! Groups projected points into visual clusters with a single greedy forward
//! pass: each point merges into the first existing cluster (in creation
//! order) whose centroid lies within the distance threshold, so the result
//! depends on input order. That is a documented trade-off, not a bug:
//! O(n*k) with no spatial index is fine for the tens-to-hundreds of pins a
//! listing renders, and the drifting running-mean centroid is accepted.

use uuid::Uuid;

/// Default merge distance, in canvas percent
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 4.0;

/// A projected point tied to its owning store record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinPoint {
    pub store_id: Uuid,
    pub x: f64,
    pub y: f64,
}

/// A group of nearby pins rendered as one marker.
///
/// (x, y) is the running mean of the members, updated incrementally as each
/// member joins; it is never recomputed from the full member list, so
/// floating-point drift across many merges is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub x: f64,
    pub y: f64,
    pub members: Vec<PinPoint>,
}

impl Cluster {
    fn singleton(point: PinPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
            members: vec![point],
        }
    }

    fn absorb(&mut self, point: PinPoint) {
        let count = self.members.len() as f64;
        self.x = (self.x * count + point.x) / (count + 1.0);
        self.y = (self.y * count + point.y) / (count + 1.0);
        self.members.push(point);
    }

    fn centroid_distance(&self, point: &PinPoint) -> f64 {
        let dx = self.x - point.x;
        let dy = self.y - point.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Number of member pins
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// Cluster points in input order.
///
/// Output order is cluster creation order (first-seen point per cluster).
/// Empty input yields empty output; a single point yields one singleton
/// cluster. Pure over its input.
pub fn cluster(points: Vec<PinPoint>, threshold: f64) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for point in points {
        match clusters
            .iter_mut()
            .find(|c| c.centroid_distance(&point) <= threshold)
        {
            Some(existing) => existing.absorb(point),
            None => clusters.push(Cluster::singleton(point)),
        }
    }

    clusters
}
