use std::collections::BTreeMap;

use crate::entities::{SeedEntry, StandingEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementAnalysis {
    /// Placement values that should exist but do not.
    pub gaps: Vec<u32>,
    /// Placement values held by more than one entry (or out of rank order when ties are allowed).
    pub duplicates: Vec<u32>,
}

impl PlacementAnalysis {
    pub fn is_clean(&self) -> bool {
        self.gaps.is_empty() && self.duplicates.is_empty()
    }
}

/// Strict mode expects exactly {1..N}. With `allow_ties`, standard competition
/// ranking (1, 2, 3, 3, 5) is accepted.
pub fn analyze_placements(entries: &[StandingEntry], allow_ties: bool) -> PlacementAnalysis {
    let mut placements: Vec<u32> = entries.iter().map(|entry| entry.placement).collect();
    placements.sort_unstable();
    let mut analysis = PlacementAnalysis::default();

    if !allow_ties {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for placement in &placements {
            *counts.entry(*placement).or_insert(0) += 1;
        }
        analysis.duplicates = counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(placement, _)| *placement)
            .collect();
        let upper = placements.last().copied().unwrap_or(0).max(placements.len() as u32);
        analysis.gaps = (1..=upper).filter(|value| !counts.contains_key(value)).collect();
        return analysis;
    }

    let mut previous: Option<u32> = None;
    for (index, placement) in placements.iter().enumerate() {
        let expected = index as u32 + 1;
        if previous == Some(*placement) {
            continue;
        }
        if *placement > expected {
            analysis.gaps.extend(expected..*placement);
        } else if *placement < expected {
            analysis.duplicates.push(*placement);
        }
        previous = Some(*placement);
    }
    analysis
}

pub fn duplicate_seeds(entries: &[SeedEntry]) -> Vec<u32> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.seed_num).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(seed, _)| seed)
        .collect()
}
