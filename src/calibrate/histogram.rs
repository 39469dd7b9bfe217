use std::collections::{HashMap, HashSet};

use crate::core::geometry::{Alignment, TextLine};

/// Frequency map over position keys.
///
/// Missing keys read as zero. Iteration follows first insertion, which makes
/// frequency ties resolve the same way on every run.
#[derive(Debug, Clone, Default)]
pub struct CountMap {
    order: Vec<i64>,
    counts: HashMap<i64, usize>,
}

impl CountMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: i64) {
        match self.counts.get_mut(&key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key, 1);
                self.order.push(key);
            }
        }
    }

    pub fn get(&self, key: i64) -> usize {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys by descending count, first-seen order on ties.
    pub fn ranked(&self) -> Vec<(i64, usize)> {
        let mut ranked: Vec<(i64, usize)> = self
            .order
            .iter()
            .map(|&key| (key, self.get(key)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// A merged histogram maximum, the raw material for a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    pub anchor: i64,
    pub alignment: Alignment,
    pub weight: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PositionHistogram {
    left: CountMap,
    center: CountMap,
}

impl PositionHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a TextLine>) -> Self {
        let mut histogram = Self::new();
        for line in lines {
            histogram.add(line);
        }
        histogram
    }

    pub fn add(&mut self, line: &TextLine) {
        self.left.add(line.left_key());
        self.center.add(line.center_key());
    }

    pub fn counts(&self, alignment: Alignment) -> &CountMap {
        match alignment {
            Alignment::Left => &self.left,
            Alignment::Center => &self.center,
        }
    }

    /// Left peaks followed by center peaks, each list in merge order.
    pub fn peaks(&self, radius: u32) -> Vec<Peak> {
        let mut peaks = merge_peaks(&self.left, Alignment::Left, radius);
        peaks.extend(merge_peaks(&self.center, Alignment::Center, radius));
        peaks
    }
}

/// Greedy neighbourhood merge: the most frequent unconsumed key absorbs every
/// unconsumed key within `radius` of it.
pub fn merge_peaks(counts: &CountMap, alignment: Alignment, radius: u32) -> Vec<Peak> {
    let radius = i64::from(radius);
    let mut remaining: HashSet<i64> = counts.order.iter().copied().collect();
    let mut peaks = Vec::new();

    for (anchor, count) in counts.ranked() {
        if !remaining.remove(&anchor) {
            continue;
        }
        let mut weight = count;
        for nearby in anchor.saturating_sub(radius)..=anchor.saturating_add(radius) {
            if remaining.remove(&nearby) {
                weight += counts.get(nearby);
            }
        }
        peaks.push(Peak {
            anchor,
            alignment,
            weight,
        });
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(keys: &[i64]) -> CountMap {
        let mut counts = CountMap::new();
        for &key in keys {
            counts.add(key);
        }
        counts
    }

    #[test]
    fn missing_keys_count_zero() {
        let counts = map(&[3, 3, 9]);
        assert_eq!(counts.get(3), 2);
        assert_eq!(counts.get(9), 1);
        assert_eq!(counts.get(42), 0);
        assert_eq!(counts.len(), 2);
        assert!(!counts.is_empty());
        assert!(CountMap::new().is_empty());
    }

    #[test]
    fn ranking_ties_follow_first_occurrence() {
        let counts = map(&[50, 10, 30, 10, 50, 30]);
        assert_eq!(counts.ranked(), vec![(50, 2), (10, 2), (30, 2)]);
    }

    #[test]
    fn merges_neighbours_into_dominant_key() {
        let counts = map(&[100, 100, 100, 102, 104, 105, 200]);
        let peaks = merge_peaks(&counts, Alignment::Left, 4);
        assert_eq!(
            peaks,
            vec![
                Peak {
                    anchor: 100,
                    alignment: Alignment::Left,
                    weight: 5,
                },
                Peak {
                    anchor: 105,
                    alignment: Alignment::Left,
                    weight: 1,
                },
                Peak {
                    anchor: 200,
                    alignment: Alignment::Left,
                    weight: 1,
                },
            ]
        );
    }

    #[test]
    fn consumed_keys_never_become_peaks() {
        // 108 is absorbed by 104 before it gets its own turn, so it cannot pull in 112.
        let counts = map(&[104, 104, 104, 108, 108, 112]);
        let peaks = merge_peaks(&counts, Alignment::Center, 4);
        let anchors: Vec<(i64, usize)> = peaks.iter().map(|p| (p.anchor, p.weight)).collect();
        assert_eq!(anchors, vec![(104, 5), (112, 1)]);
    }

    #[test]
    fn merging_at_the_key_limits_does_not_overflow() {
        let counts = map(&[i64::MAX, i64::MAX, i64::MAX - 3, i64::MIN, i64::MIN + 9]);
        let peaks = merge_peaks(&counts, Alignment::Left, 4);
        let anchors: Vec<(i64, usize)> = peaks.iter().map(|p| (p.anchor, p.weight)).collect();
        assert_eq!(anchors, vec![(i64::MAX, 3), (i64::MIN, 1), (i64::MIN + 9, 1)]);
    }

    #[test]
    fn histogram_tags_alignment() {
        let lines = vec![
            TextLine::new(72.0, 400.0, 700.0, "INT. HOUSE - DAY"),
            TextLine::new(72.0, 300.0, 680.0, "A quiet room."),
        ];
        let histogram = PositionHistogram::from_lines(&lines);
        assert_eq!(histogram.counts(Alignment::Left).get(72), 2);
        let peaks = histogram.peaks(4);
        assert_eq!(peaks[0].alignment, Alignment::Left);
        assert!(peaks[1..].iter().all(|p| p.alignment == Alignment::Center));
    }
}
