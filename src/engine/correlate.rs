use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use super::devices::{DeviceShapes, is_boilerplate, normalize_device_id, trim_token};
use super::normalize::find_ci;

/// Lines above an OS-flagged row searched for its device identifier.
const HEALTH_LOOKBACK_LINES: usize = 6;
/// Lines below a patch-table device row searched for its owner.
const PATCH_LOOKAHEAD_LINES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub owner_name: Option<String>,
    pub os_label: Option<String>,
}

pub struct Correlator<'a> {
    shapes: &'a DeviceShapes,
    person_name: Regex,
}

impl<'a> Correlator<'a> {
    pub fn new(shapes: &'a DeviceShapes) -> Result<Self> {
        Ok(Self {
            shapes,
            person_name: Regex::new(r"^[A-Za-z][A-Za-z'. ]*[A-Za-z.]$")
                .context("failed to compile person name regex")?,
        })
    }

    /// Devices carrying `os_label` in the health section, in order of
    /// appearance.
    pub fn flagged_devices(&self, health: &str, os_label: &str) -> Vec<DeviceRecord> {
        let lines = health.lines().collect::<Vec<&str>>();
        let mut seen = HashSet::new();
        let mut flagged = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            let Some(label_at) = find_ci(line, os_label) else {
                continue;
            };

            let same_line = self.first_device_token(&line[..label_at]);
            let found = same_line.or_else(|| {
                lines[index.saturating_sub(HEALTH_LOOKBACK_LINES)..index]
                    .iter()
                    .rev()
                    .find_map(|previous| self.first_device_token(previous))
            });

            if let Some(raw) = found {
                let device_id = normalize_device_id(raw);
                if seen.insert(device_id.clone()) {
                    flagged.push(DeviceRecord {
                        device_id,
                        owner_name: None,
                        os_label: Some(os_label.to_string()),
                    });
                }
            }
        }

        flagged
    }

    /// Owner per normalized device id from the patch section. The first
    /// name found below a device row wins.
    pub fn owners_by_device(&self, patch: &str) -> HashMap<String, String> {
        let lines = patch.lines().collect::<Vec<&str>>();
        let mut owners = HashMap::new();

        for (index, line) in lines.iter().enumerate() {
            let Some(first) = line.split_whitespace().next() else {
                continue;
            };
            if !self.shapes.is_device_id(first) {
                continue;
            }

            let device_id = normalize_device_id(trim_token(first));
            if owners.contains_key(&device_id) {
                continue;
            }

            let end = (index + 1 + PATCH_LOOKAHEAD_LINES).min(lines.len());
            let owner = lines[index + 1..end]
                .iter()
                .map(|candidate| candidate.trim())
                .find(|candidate| self.is_person_name(candidate));
            if let Some(owner) = owner {
                owners.insert(device_id, owner.to_string());
            }
        }

        owners
    }

    /// Owners of devices flagged in the health section that also have a
    /// name in the patch section. Devices missing either side are dropped.
    pub fn correlate(&self, health: &str, patch: &str, os_label: &str) -> Vec<DeviceRecord> {
        let owners = self.owners_by_device(patch);
        self.flagged_devices(health, os_label)
            .into_iter()
            .filter_map(|mut record| {
                let owner = owners.get(&record.device_id)?;
                record.owner_name = Some(owner.clone());
                Some(record)
            })
            .collect()
    }

    fn first_device_token<'l>(&self, line: &'l str) -> Option<&'l str> {
        line.split_whitespace()
            .map(trim_token)
            .find(|token| self.shapes.is_device_id(token))
    }

    fn is_person_name(&self, candidate: &str) -> bool {
        candidate.contains(' ')
            && self.person_name.is_match(candidate)
            && !candidate
                .split_whitespace()
                .any(|word| is_boilerplate(word.trim_matches('.')))
    }
}

/// Deduplicated owner names, keeping first-seen order.
pub fn owner_names(records: &[DeviceRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|record| record.owner_name.as_ref())
        .filter(|name| seen.insert(name.to_ascii_lowercase()))
        .cloned()
        .collect()
}
