use std::collections::BTreeMap;

use super::normalize::{find_all_ci, find_ci};

pub const DOCUMENT_BOUNDARY: &str = "===== DOCUMENT BOUNDARY =====";
pub const PAGE_BREAK: &str = "--- Page Break ---";
pub const SENSOR_MARKER: &str = "Local Probe (Local Probe)";

pub const DEVICE_HEALTH: &str = "device health summary";
pub const EXECUTIVE: &str = "executive summary";
pub const DEVICE_STORAGE: &str = "device storage";
pub const PATCH_MANAGEMENT: &str = "patch management summary";

pub const HEALTH_SECTION_TITLES: &[&str] =
    &[DEVICE_HEALTH, EXECUTIVE, DEVICE_STORAGE, PATCH_MANAGEMENT];

/// Named regions of one merged health report.
///
/// Every known title is present; titles missing from the text map to an
/// empty string so extraction degrades to defaults.
#[derive(Debug, Clone, Default)]
pub struct Sections {
    full_text: String,
    named: BTreeMap<String, String>,
}

impl Sections {
    /// A single unnamed region, used for per-sensor blocks.
    pub fn from_text(text: &str) -> Self {
        Self {
            full_text: text.to_string(),
            named: BTreeMap::new(),
        }
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Look up a section by case-insensitive label substring.
    pub fn get(&self, label: &str) -> &str {
        let wanted = label.trim().to_ascii_lowercase();
        if wanted.is_empty() {
            return "";
        }
        self.named
            .iter()
            .find(|(title, _)| title.contains(&wanted))
            .map(|(_, body)| body.as_str())
            .unwrap_or("")
    }

    pub fn present_titles(&self) -> Vec<&str> {
        self.named
            .iter()
            .filter(|(_, body)| !body.trim().is_empty())
            .map(|(title, _)| title.as_str())
            .collect()
    }
}

pub fn segment_named(text: &str, titles: &[&str]) -> Sections {
    let mut cut_points = find_all_ci(text, DOCUMENT_BOUNDARY);
    for title in titles {
        cut_points.extend(find_all_ci(text, title));
    }
    cut_points.sort_unstable();
    cut_points.dedup();

    let mut named = BTreeMap::new();
    for title in titles {
        let key = title.to_ascii_lowercase();
        let body = match find_ci(text, title) {
            Some(start) => {
                let content_start = start + title.len();
                let content_end = cut_points
                    .iter()
                    .copied()
                    .find(|point| *point >= content_start)
                    .unwrap_or(text.len());
                text[content_start..content_end].trim().to_string()
            }
            None => String::new(),
        };
        named.entry(key).or_insert(body);
    }

    Sections {
        full_text: text.to_string(),
        named,
    }
}

/// Split link-report text at every sensor marker; text before the first
/// marker is boilerplate and dropped.
pub fn segment_blocks(text: &str, marker: &str) -> Vec<String> {
    let starts = find_all_ci(text, marker);
    starts
        .iter()
        .enumerate()
        .map(|(index, start)| {
            let end = starts.get(index + 1).copied().unwrap_or(text.len());
            text[*start + marker.len()..end].to_string()
        })
        .collect()
}

pub fn merge_documents(texts: &[String]) -> String {
    texts.join(&format!("\n{DOCUMENT_BOUNDARY}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_sections_stop_at_next_title_or_boundary() {
        let text = format!(
            "cover page\nExecutive Summary\nDevices: 12\nDEVICE HEALTH SUMMARY\nTotal Managed devices: 12\n{DOCUMENT_BOUNDARY}\nPatch Management Summary\nFully Patched: 9"
        );
        let sections = segment_named(&text, HEALTH_SECTION_TITLES);

        assert_eq!(sections.get("executive"), "Devices: 12");
        assert_eq!(sections.get("Device Health"), "Total Managed devices: 12");
        assert_eq!(sections.get(PATCH_MANAGEMENT), "Fully Patched: 9");
        assert_eq!(sections.get(DEVICE_STORAGE), "");
        assert_eq!(sections.present_titles().len(), 3);
    }

    #[test]
    fn repeated_title_keeps_first_occurrence() {
        let text = "Device Storage\nPC01 70%\nDevice Storage\nPC02 40%";
        let sections = segment_named(text, HEALTH_SECTION_TITLES);
        assert_eq!(sections.get(DEVICE_STORAGE), "PC01 70%");
    }

    #[test]
    fn unknown_label_is_empty() {
        let sections = segment_named("", HEALTH_SECTION_TITLES);
        assert_eq!(sections.get("antivirus"), "");
        assert_eq!(sections.get(""), "");
        assert!(sections.present_titles().is_empty());
    }

    #[test]
    fn blocks_discard_leading_boilerplate() {
        let text = "PRTG report header\nLocal Probe (Local Probe) Gigiri LAN\nUptime: 99 %\nlocal probe (local probe) Kitisuru WAN\nUptime: 97 %";
        let blocks = segment_blocks(text, SENSOR_MARKER);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with(" Gigiri LAN"));
        assert!(blocks[1].contains("97 %"));
        assert!(segment_blocks("no markers here", SENSOR_MARKER).is_empty());
    }

    #[test]
    fn merge_documents_inserts_boundaries() {
        let merged = merge_documents(&["a".to_string(), "b".to_string()]);
        assert_eq!(merged, format!("a\n{DOCUMENT_BOUNDARY}\nb"));
    }
}
