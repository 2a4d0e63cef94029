use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::devices::{DeviceShapes, is_boilerplate, trim_token};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsageEntry {
    pub label: String,
    pub used_percent: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
enum LabelTier {
    Convention,
    Plausible,
    Hostname,
}

/// Ranks per-device disk utilization out of a device storage section.
#[derive(Debug)]
pub struct DiskRanker<'a> {
    shapes: &'a DeviceShapes,
    size_token: Regex,
    drive_letter: Regex,
    plausible_label: Regex,
    percent_literal: Regex,
}

impl<'a> DiskRanker<'a> {
    pub fn new(shapes: &'a DeviceShapes) -> Result<Self> {
        Ok(Self {
            shapes,
            size_token: RegexBuilder::new(r"^\d+(?:[.,]\d+)?(?:B|KB|MB|GB|TB|KIB|MIB|GIB|TIB)$")
                .case_insensitive(true)
                .build()
                .context("failed to compile size token regex")?,
            drive_letter: Regex::new(r"^[A-Za-z]:\\?$")
                .context("failed to compile drive letter regex")?,
            plausible_label: Regex::new(r"^[A-Za-z][A-Za-z0-9_.\-]{2,}$")
                .context("failed to compile label regex")?,
            percent_literal: Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%")
                .context("failed to compile percent regex")?,
        })
    }

    /// Deduplicated entries sorted by used percentage, highest first.
    pub fn rank(&self, section: &str) -> Vec<DiskUsageEntry> {
        let labels = self.labels(section);
        let percents = self.percents(section);

        let mut entries: Vec<DiskUsageEntry> = Vec::new();
        let mut index_by_label = HashMap::<String, usize>::new();
        for (label, percent) in labels.into_iter().zip(percents) {
            let key = label.to_ascii_lowercase();
            match index_by_label.get(&key) {
                Some(&index) => {
                    if percent > entries[index].used_percent {
                        entries[index].used_percent = percent;
                    }
                }
                None => {
                    index_by_label.insert(key, entries.len());
                    entries.push(DiskUsageEntry {
                        label,
                        used_percent: percent,
                    });
                }
            }
        }

        entries.sort_by(|left, right| {
            right
                .used_percent
                .partial_cmp(&left.used_percent)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.label.cmp(&right.label))
        });
        entries
    }

    fn labels(&self, section: &str) -> Vec<String> {
        let mut tiers: [Vec<String>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for line in section.lines() {
            for raw in line.split_whitespace() {
                let token = trim_token(raw);
                if self.is_noise(token) {
                    continue;
                }
                if let Some(tier) = self.classify(token) {
                    let slot = match tier {
                        LabelTier::Convention => 0,
                        LabelTier::Plausible => 1,
                        LabelTier::Hostname => 2,
                    };
                    tiers[slot].push(token.to_string());
                }
            }
        }

        tiers
            .into_iter()
            .find(|tier| !tier.is_empty())
            .unwrap_or_default()
    }

    fn percents(&self, section: &str) -> Vec<f64> {
        self.percent_literal
            .captures_iter(section)
            .filter_map(|captures| captures.get(1)?.as_str().parse::<f64>().ok())
            .filter(|value| (0.0..=100.0).contains(value))
            .map(|value| (value * 10.0).round() / 10.0)
            .collect()
    }

    fn is_noise(&self, token: &str) -> bool {
        token.is_empty()
            || is_boilerplate(token)
            || self.size_token.is_match(token)
            || self.drive_letter.is_match(token)
            || token.contains('%')
            || !token.chars().any(|character| character.is_ascii_alphabetic())
    }

    fn classify(&self, token: &str) -> Option<LabelTier> {
        if self.shapes.is_hostname(token) {
            Some(LabelTier::Hostname)
        } else if self.shapes.is_known_prefix(token) || self.shapes.is_alias(token) {
            Some(LabelTier::Convention)
        } else if self.plausible_label.is_match(token) && has_label_marker(token) {
            Some(LabelTier::Plausible)
        } else {
            None
        }
    }
}

/// Asset labels carry a digit or a separator; bare words are table prose.
fn has_label_marker(token: &str) -> bool {
    token
        .chars()
        .any(|character| character.is_ascii_digit() || matches!(character, '-' | '_'))
}

/// Entries at or above the used-percentage threshold, reconciled with any
/// explicit failed count: never less than either source.
pub fn low_space_count(entries: &[DiskUsageEntry], threshold: f64, explicit_failed: u64) -> u64 {
    let over_threshold = entries
        .iter()
        .filter(|entry| entry.used_percent >= threshold)
        .count() as u64;
    over_threshold.max(explicit_failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::devices::default_prefixes;

    fn shapes() -> DeviceShapes {
        DeviceShapes::new(&default_prefixes()).expect("shapes compile")
    }

    #[test]
    fn duplicate_label_keeps_maximum_and_counts_as_low_space() {
        let shapes = shapes();
        let ranker = DiskRanker::new(&shapes).expect("ranker compiles");
        let section = "Device Drive Size Used\nPC01 C: 100GB 70%\nPC02 C: 250.5GB 40.25%\npc01 D: 50GB 92%";

        let entries = ranker.rank(section);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "PC01");
        assert_eq!(entries[0].used_percent, 92.0);
        assert_eq!(entries[1].label, "PC02");
        assert_eq!(entries[1].used_percent, 40.3);
        assert_eq!(low_space_count(&entries, 85.0, 0), 1);
    }

    #[test]
    fn ranking_is_idempotent() {
        let shapes = shapes();
        let ranker = DiskRanker::new(&shapes).expect("ranker compiles");
        let section = "ACME-FIN01\n88.123%\nACME-HR02\n88.123%\nACME-OPS03 12.5%";
        let first = ranker.rank(section);
        let second = ranker.rank(section);
        assert_eq!(first, second);
        assert_eq!(first[0].label, "ACME-FIN01");
        assert_eq!(first[1].label, "ACME-HR02");
        assert_eq!(first[2].used_percent, 12.5);
    }

    #[test]
    fn convention_labels_outrank_hostnames() {
        let shapes = shapes();
        let ranker = DiskRanker::new(&shapes).expect("ranker compiles");
        let section = "DESKTOP-4F2K9QZ ACME-FIN01 C: 91%\nLAPTOP-77AB ACME-HR02 C: 20%";
        let entries = ranker.rank(section);
        let labels = entries
            .iter()
            .map(|entry| entry.label.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(labels, vec!["ACME-FIN01", "ACME-HR02"]);
    }

    #[test]
    fn hostnames_used_when_nothing_better_exists() {
        let shapes = shapes();
        let ranker = DiskRanker::new(&shapes).expect("ranker compiles");
        let entries = ranker.rank("DESKTOP-4F2K9QZ 12GB 55%");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "DESKTOP-4F2K9QZ");
    }

    #[test]
    fn summary_words_do_not_displace_hostnames() {
        let shapes = shapes();
        let ranker = DiskRanker::new(&shapes).expect("ranker compiles");
        let section = "Drive Letter Percentage\nPassed: 1\nFailed: 1\nDESKTOP-AAA111 C: 92%\nDESKTOP-BBB222 C: 40%";
        let entries = ranker.rank(section);
        let labels = entries
            .iter()
            .map(|entry| entry.label.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(labels, vec!["DESKTOP-AAA111", "DESKTOP-BBB222"]);
        assert_eq!(entries[0].used_percent, 92.0);
    }

    #[test]
    fn out_of_range_percentages_are_ignored() {
        let shapes = shapes();
        let ranker = DiskRanker::new(&shapes).expect("ranker compiles");
        let entries = ranker.rank("PC01 450% PC02 30%");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "PC01");
        assert_eq!(entries[0].used_percent, 30.0);
        assert!(ranker.rank("").is_empty());
    }

    #[test]
    fn explicit_failures_raise_low_space_floor() {
        let entries = vec![DiskUsageEntry {
            label: "PC01".to_string(),
            used_percent: 90.0,
        }];
        assert_eq!(low_space_count(&entries, 85.0, 3), 3);
        assert_eq!(low_space_count(&entries, 85.0, 0), 1);
        assert_eq!(low_space_count(&[], 85.0, 0), 0);
    }
}
