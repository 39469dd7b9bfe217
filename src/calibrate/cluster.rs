use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibrate::histogram::{Peak, PositionHistogram};
use crate::core::geometry::{Alignment, TextLine};
use crate::core::model::Role;

pub const DEFAULT_RADIUS: u32 = 4;
pub const MAX_CLUSTERS: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalibrationParams {
    /// Merge radius for histogram keys and acceptance distance for lines.
    pub radius: u32,
    pub max_clusters: usize,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            max_clusters: MAX_CLUSTERS,
        }
    }
}

/// A learned horizontal position. Identity is `(anchor, alignment)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cluster {
    pub anchor: i64,
    pub alignment: Alignment,
    pub weight: usize,
}

impl Cluster {
    pub fn new(anchor: i64, alignment: Alignment, weight: usize) -> Self {
        Self {
            anchor,
            alignment,
            weight,
        }
    }

    pub fn distance(&self, line: &TextLine) -> f64 {
        (line.position(self.alignment) - self.anchor as f64).abs()
    }

    pub fn accepts(&self, line: &TextLine, radius: f64) -> bool {
        self.distance(line) < radius
    }

    pub fn same_position(&self, other: &Cluster) -> bool {
        self.anchor == other.anchor && self.alignment == other.alignment
    }
}

impl From<Peak> for Cluster {
    fn from(peak: Peak) -> Self {
        Self::new(peak.anchor, peak.alignment, peak.weight)
    }
}

fn sort_by_weight(clusters: &mut [Cluster]) {
    clusters.sort_by(|a, b| b.weight.cmp(&a.weight));
}

fn reset_weights(clusters: &mut [Cluster]) {
    for cluster in clusters.iter_mut() {
        cluster.weight = 0;
    }
}

/// First refinement pass: a line counts only for a cluster it alone qualifies for.
pub fn credit_unique_matches(clusters: &mut [Cluster], lines: &[TextLine], radius: f64) {
    reset_weights(clusters);
    for line in lines {
        let mut qualifying = clusters.iter_mut().filter(|c| c.accepts(line, radius));
        if let (Some(only), None) = (qualifying.next(), qualifying.next()) {
            only.weight += 1;
        }
    }
    sort_by_weight(clusters);
}

/// Second refinement pass: every line counts once, for the first qualifying
/// cluster in the current order.
pub fn credit_first_qualifying_match(clusters: &mut [Cluster], lines: &[TextLine], radius: f64) {
    reset_weights(clusters);
    for line in lines {
        if let Some(cluster) = clusters.iter_mut().find(|c| c.accepts(line, radius)) {
            cluster.weight += 1;
        }
    }
    sort_by_weight(clusters);
}

/// Indices into the weight-ordered cluster list for each positional role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleMap {
    pub scene: Option<usize>,
    pub dialogue: Option<usize>,
    pub speaker: Option<usize>,
}

impl RoleMap {
    /// Leftmost cluster narrates, the next one speaks lines, the third names the speaker.
    pub fn by_position(clusters: &[Cluster]) -> Self {
        if clusters.len() < 3 {
            return Self::default();
        }
        let mut by_anchor: Vec<usize> = (0..clusters.len()).collect();
        by_anchor.sort_by_key(|&idx| clusters[idx].anchor);
        Self {
            scene: Some(by_anchor[0]),
            dialogue: Some(by_anchor[1]),
            speaker: Some(by_anchor[2]),
        }
    }

    pub fn role_of(&self, idx: usize) -> Role {
        if self.scene == Some(idx) {
            Role::Scene
        } else if self.dialogue == Some(idx) {
            Role::Dialogue
        } else if self.speaker == Some(idx) {
            Role::Speaker
        } else {
            Role::Unassigned
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.scene.is_some() && self.dialogue.is_some() && self.speaker.is_some()
    }
}

/// Flat view of a cluster and the role it carries, for reports.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RoledCluster {
    pub anchor: i64,
    pub alignment: Alignment,
    pub weight: usize,
    pub role: Option<Role>,
}

/// The calibrated clusters of one document. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSet {
    clusters: Vec<Cluster>,
    roles: RoleMap,
    radius: f64,
}

impl ClusterSet {
    pub fn calibrate(lines: &[TextLine], params: &CalibrationParams) -> Self {
        let radius = f64::from(params.radius);
        let mut clusters: Vec<Cluster> = PositionHistogram::from_lines(lines)
            .peaks(params.radius)
            .into_iter()
            .map(Cluster::from)
            .collect();
        sort_by_weight(&mut clusters);
        clusters.truncate(params.max_clusters);

        credit_unique_matches(&mut clusters, lines, radius);
        credit_first_qualifying_match(&mut clusters, lines, radius);
        clusters.retain(|cluster| cluster.weight > 0);

        debug!(
            lines = lines.len(),
            clusters = clusters.len(),
            "calibrated cluster set"
        );
        Self::from_clusters(clusters, radius)
    }

    /// Wraps an already refined, weight-ordered cluster list.
    pub fn from_clusters(clusters: Vec<Cluster>, radius: f64) -> Self {
        let roles = RoleMap::by_position(&clusters);
        Self {
            clusters,
            roles,
            radius,
        }
    }

    pub fn empty(params: &CalibrationParams) -> Self {
        Self::from_clusters(Vec::new(), f64::from(params.radius))
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn roles(&self) -> RoleMap {
        self.roles
    }

    pub fn has_roles(&self) -> bool {
        self.roles.is_resolved()
    }

    pub fn role_of(&self, idx: usize) -> Role {
        self.roles.role_of(idx)
    }

    pub fn cluster_for(&self, role: Role) -> Option<&Cluster> {
        let idx = match role {
            Role::Scene => self.roles.scene,
            Role::Dialogue => self.roles.dialogue,
            Role::Speaker => self.roles.speaker,
            Role::Unassigned => None,
        }?;
        self.clusters.get(idx)
    }

    pub fn describe(&self) -> Vec<RoledCluster> {
        self.clusters
            .iter()
            .enumerate()
            .map(|(idx, cluster)| RoledCluster {
                anchor: cluster.anchor,
                alignment: cluster.alignment,
                weight: cluster.weight,
                role: match self.role_of(idx) {
                    Role::Unassigned => None,
                    role => Some(role),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CHAR_WIDTH: f64 = 7.2;

    fn line(left: f64, text: &str) -> TextLine {
        let right = left + text.chars().count() as f64 * CHAR_WIDTH;
        TextLine::new(left, right, 0.0, text)
    }

    fn sample() -> Vec<TextLine> {
        let mut lines = Vec::new();
        for text in [
            "The kitchen is dark.",
            "Rain hammers the window over the sink.",
            "JOHN enters, soaked.",
            "He drops his keys on the counter and listens.",
            "Nothing.",
            "A kettle starts to whistle somewhere upstairs.",
        ] {
            lines.push(line(108.0, text));
        }
        for text in ["Hello?", "Anyone home?", "I brought the groceries you asked for."] {
            lines.push(line(180.0, text));
        }
        for text in ["JOHN", "MARGARET", "DETECTIVE HALE"] {
            lines.push(line(252.0, text));
        }
        lines
    }

    #[test]
    fn finds_three_positional_roles() {
        let set = ClusterSet::calibrate(&sample(), &CalibrationParams::default());

        let scene = set.cluster_for(Role::Scene).expect("scene cluster");
        let dialogue = set.cluster_for(Role::Dialogue).expect("dialogue cluster");
        let speaker = set.cluster_for(Role::Speaker).expect("speaker cluster");

        assert_eq!((scene.anchor, scene.alignment, scene.weight), (108, Alignment::Left, 6));
        assert_eq!(
            (dialogue.anchor, dialogue.alignment, dialogue.weight),
            (180, Alignment::Left, 3)
        );
        assert_eq!(
            (speaker.anchor, speaker.alignment, speaker.weight),
            (252, Alignment::Left, 3)
        );
        assert!(set.clusters().iter().all(|c| c.weight > 0));
    }

    #[test]
    fn calibration_is_idempotent() {
        let lines = sample();
        let params = CalibrationParams::default();
        let first = ClusterSet::calibrate(&lines, &params);
        let second = ClusterSet::calibrate(&lines, &params);
        assert_eq!(first, second);
        assert_eq!(first.describe(), second.describe());
    }

    #[test]
    fn no_duplicate_positions() {
        let set = ClusterSet::calibrate(&sample(), &CalibrationParams::default());
        let clusters = set.clusters();
        for (i, a) in clusters.iter().enumerate() {
            for b in &clusters[i + 1..] {
                assert!(!a.same_position(b));
            }
        }
    }

    #[test]
    fn adding_lines_at_anchor_never_lowers_weight() {
        let params = CalibrationParams::default();
        let mut lines = sample();
        let before = ClusterSet::calibrate(&lines, &params);
        let scene_before = before.cluster_for(Role::Scene).map(|c| c.weight);

        lines.push(line(108.0, "Thunder."));
        lines.push(line(108.0, "The lights flicker and die."));
        let after = ClusterSet::calibrate(&lines, &params);
        let scene_after = after.cluster_for(Role::Scene).map(|c| c.weight);

        assert!(scene_after >= scene_before);
        assert_eq!(scene_after, Some(8));
    }

    #[test]
    fn empty_sample_has_no_roles() {
        let set = ClusterSet::calibrate(&[], &CalibrationParams::default());
        assert!(set.is_empty());
        assert!(!set.has_roles());
        assert_eq!(set.cluster_for(Role::Scene), None);
    }

    #[test]
    fn keeps_only_the_heaviest_peaks() {
        // ten left positions far apart, heaviest first; every line has its own
        // width so center keys stay single and never outweigh a left peak
        let mut lines = Vec::new();
        for k in 1..=10_i64 {
            let left = (k * 1000) as f64;
            for j in 0..(12 - k) {
                let width = 20.0 * (j + 1) as f64;
                lines.push(TextLine::new(left, left + width, 0.0, "x"));
            }
        }

        let set = ClusterSet::calibrate(&lines, &CalibrationParams::default());
        assert_eq!(set.len(), MAX_CLUSTERS);
        let kept: Vec<(i64, Alignment, usize)> = set
            .clusters()
            .iter()
            .map(|c| (c.anchor, c.alignment, c.weight))
            .collect();
        let expected: Vec<(i64, Alignment, usize)> = (1..=8_i64)
            .map(|k| (k * 1000, Alignment::Left, (12 - k) as usize))
            .collect();
        assert_eq!(kept, expected);
        assert!(set.clusters().iter().all(|c| c.anchor < 9000));
        assert_eq!(
            set.roles(),
            RoleMap {
                scene: Some(0),
                dialogue: Some(1),
                speaker: Some(2),
            }
        );
    }

    #[test]
    fn extreme_coordinates_do_not_panic() {
        let lines = vec![
            TextLine::new(1e300, 1e300, 0.0, "x"),
            TextLine::new(-1e300, -1e300, 0.0, "y"),
        ];
        let set = ClusterSet::calibrate(&lines, &CalibrationParams::default());
        // no line lies within the radius of a saturated anchor
        assert!(set.is_empty());
        assert!(!set.has_roles());
    }

    #[test]
    fn fewer_than_three_clusters_leave_roles_unmapped() {
        let lines = vec![line(108.0, "Only narration here."), line(108.0, "More narration.")];
        let set = ClusterSet::calibrate(&lines, &CalibrationParams::default());
        assert!(!set.has_roles());
        assert_eq!(set.role_of(0), Role::Unassigned);
    }

    #[test]
    fn unique_matches_only_credit_unambiguous_lines() {
        let mut clusters = vec![
            Cluster::new(100, Alignment::Left, 0),
            Cluster::new(103, Alignment::Left, 0),
            Cluster::new(200, Alignment::Left, 0),
        ];
        let lines = vec![
            TextLine::new(101.0, 101.0, 0.0, "both"),
            TextLine::new(97.0, 97.0, 0.0, "first only"),
            TextLine::new(200.0, 200.0, 0.0, "third"),
            TextLine::new(201.0, 201.0, 0.0, "third again"),
        ];
        credit_unique_matches(&mut clusters, &lines, 4.0);
        let weights: Vec<(i64, usize)> = clusters.iter().map(|c| (c.anchor, c.weight)).collect();
        assert_eq!(weights, vec![(200, 2), (100, 1), (103, 0)]);
    }

    #[test]
    fn first_qualifying_match_follows_current_order() {
        let mut clusters = vec![
            Cluster::new(103, Alignment::Left, 0),
            Cluster::new(100, Alignment::Left, 0),
        ];
        let lines = vec![
            TextLine::new(101.0, 101.0, 0.0, "both"),
            TextLine::new(102.0, 102.0, 0.0, "both"),
            TextLine::new(97.0, 97.0, 0.0, "second only"),
        ];
        credit_first_qualifying_match(&mut clusters, &lines, 4.0);
        let weights: Vec<(i64, usize)> = clusters.iter().map(|c| (c.anchor, c.weight)).collect();
        assert_eq!(weights, vec![(103, 2), (100, 1)]);
    }

    #[test]
    fn roles_follow_anchor_order_not_weight() {
        let set = ClusterSet::from_clusters(
            vec![
                Cluster::new(180, Alignment::Left, 40),
                Cluster::new(108, Alignment::Left, 30),
                Cluster::new(266, Alignment::Center, 20),
                Cluster::new(400, Alignment::Left, 2),
            ],
            4.0,
        );
        assert_eq!(set.role_of(0), Role::Dialogue);
        assert_eq!(set.role_of(1), Role::Scene);
        assert_eq!(set.role_of(2), Role::Speaker);
        assert_eq!(set.role_of(3), Role::Unassigned);
        assert_eq!(set.describe()[3].role, None);
    }
}
