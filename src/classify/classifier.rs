use crate::calibrate::cluster::{Cluster, ClusterSet};
use crate::core::geometry::{Alignment, TextLine};
use crate::core::model::Role;

/// Added to the distance of center-aligned clusters when a line qualifies for several.
pub const CENTER_PENALTY: f64 = 2.0;

fn penalty(cluster: &Cluster) -> f64 {
    match cluster.alignment {
        Alignment::Left => 0.0,
        Alignment::Center => CENTER_PENALTY,
    }
}

#[derive(Debug, Clone)]
pub struct RoleClassifier {
    clusters: ClusterSet,
}

impl RoleClassifier {
    pub fn new(clusters: ClusterSet) -> Self {
        Self { clusters }
    }

    pub fn cluster_set(&self) -> &ClusterSet {
        &self.clusters
    }

    /// Index of the best cluster for `line`, if any is within the radius.
    pub fn assign_index(&self, line: &TextLine) -> Option<usize> {
        let radius = self.clusters.radius();
        let mut best: Option<(usize, f64)> = None;
        let mut qualifying = 0;

        for (idx, cluster) in self.clusters.clusters().iter().enumerate() {
            if !cluster.accepts(line, radius) {
                continue;
            }
            qualifying += 1;
            let score = cluster.distance(line) + penalty(cluster);
            match best {
                Some((_, best_score)) if best_score <= score => {}
                _ => best = Some((idx, score)),
            }
        }

        if qualifying == 0 {
            return None;
        }
        best.map(|(idx, _)| idx)
    }

    pub fn assign(&self, line: &TextLine) -> Option<&Cluster> {
        self.assign_index(line)
            .and_then(|idx| self.clusters.clusters().get(idx))
    }

    pub fn role(&self, line: &TextLine) -> Role {
        match self.assign_index(line) {
            Some(idx) => self.clusters.role_of(idx),
            None => Role::Unassigned,
        }
    }
}
