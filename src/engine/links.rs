use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::reconcile::{
    LinkTiming, ReportWindow, parse_report_window, reconcile, render_percent,
};
use super::rules::{FieldSpec, MetricExtractor, MetricRecord, Rule, RuleTable, Scope};
use super::segment::{SENSOR_MARKER, Sections, segment_blocks};

const AVG_BANDWIDTH: &str = "avg_bandwidth";
const TOTAL_DATA: &str = "total_data";
const UPTIME_PERCENT: &str = "uptime_percent";
const DOWNTIME_PERCENT: &str = "downtime_percent";
const UPTIME_DURATION: &str = "uptime_duration";
const DOWNTIME_DURATION: &str = "downtime_duration";

const BANDWIDTH_SHAPE: &str = r"(?i)(\d[\d,]*(?:\.\d+)?\s*[kmgt]?bit/s)";
const DATA_SHAPE: &str = r"(?i)\b(\d[\d,]*(?:\.\d+)?\s*(?:KB|MB|GB|TB))\b";

pub const LINK_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: AVG_BANDWIDTH,
        rules: &[
            Rule {
                source: "after average label",
                scope: Scope::Window {
                    section: None,
                    anchor: "average",
                },
                pattern: BANDWIDTH_SHAPE,
            },
            Rule {
                source: "first bandwidth in block",
                scope: Scope::Global,
                pattern: BANDWIDTH_SHAPE,
            },
        ],
    },
    FieldSpec {
        field: TOTAL_DATA,
        rules: &[
            Rule {
                source: "after total label",
                scope: Scope::Window {
                    section: None,
                    anchor: "total",
                },
                pattern: DATA_SHAPE,
            },
            Rule {
                source: "first volume in block",
                scope: Scope::Global,
                pattern: DATA_SHAPE,
            },
        ],
    },
    FieldSpec {
        field: UPTIME_PERCENT,
        rules: &[
            Rule {
                source: "uptime label",
                scope: Scope::Global,
                pattern: r"(?i)\buptime[^\n%A-Za-z\[]*?(\d{1,3}(?:[.,]\d+)?)\s*%",
            },
            Rule {
                source: "up label",
                scope: Scope::Global,
                pattern: r"(?i)\bup\s*:\s*(\d{1,3}(?:[.,]\d+)?)\s*%",
            },
        ],
    },
    FieldSpec {
        field: DOWNTIME_PERCENT,
        rules: &[
            Rule {
                source: "downtime label",
                scope: Scope::Global,
                pattern: r"(?i)\bdowntime[^\n%A-Za-z\[]*?(\d{1,3}(?:[.,]\d+)?)\s*%",
            },
            Rule {
                source: "down label",
                scope: Scope::Global,
                pattern: r"(?i)\bdown\s*:\s*(\d{1,3}(?:[.,]\d+)?)\s*%",
            },
        ],
    },
    FieldSpec {
        field: UPTIME_DURATION,
        rules: &[
            Rule {
                source: "uptime label",
                scope: Scope::Global,
                pattern: r"(?i)\b(?:uptime|up\s*:)[^\n\[A-Za-z]*\[\s*((?:\d+d\s*)?(?:\d+h\s*)?(?:\d+m\s*)?\d+s)\s*\]",
            },
        ],
    },
    FieldSpec {
        field: DOWNTIME_DURATION,
        rules: &[
            Rule {
                source: "downtime label",
                scope: Scope::Global,
                pattern: r"(?i)\b(?:downtime|down\s*:)[^\n\[A-Za-z]*\[\s*((?:\d+d\s*)?(?:\d+h\s*)?(?:\d+m\s*)?\d+s)\s*\]",
            },
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub name: String,
    pub avg_bandwidth: String,
    pub total_data: String,
    pub uptime_percent: String,
    pub downtime_percent: String,
    pub uptime_duration: String,
    pub downtime_duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSummaryStats {
    pub overall_avg_uptime_percent: String,
    pub overall_avg_downtime_percent: String,
    pub total_links_monitored: u64,
    pub links_with_downtime: u64,
}

/// One reconciled link plus the numeric values behind its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkExtraction {
    pub record: LinkRecord,
    pub uptime_value: f64,
    pub downtime_value: f64,
}

pub struct LinkExtractor {
    table: RuleTable,
}

impl LinkExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            table: RuleTable::compile(LINK_FIELDS)?,
        })
    }

    /// Every sensor block of a normalized link report, in report order.
    pub fn extract(&self, text: &str) -> (Vec<LinkExtraction>, Vec<MetricRecord>) {
        let report_window = parse_report_window(text);
        let mut links = Vec::new();
        let mut records = Vec::new();

        for (index, block) in segment_blocks(text, SENSOR_MARKER).iter().enumerate() {
            let window = parse_report_window(block).or(report_window);
            let (link, block_records) = self.extract_block(block, window.as_ref());
            debug!(index, name = %link.record.name, "extracted link block");
            links.push(link);
            records.extend(block_records.into_iter().map(|mut record| {
                record.field = format!("links[{index}].{}", record.field);
                record
            }));
        }

        (links, records)
    }

    fn extract_block(
        &self,
        block: &str,
        window: Option<&ReportWindow>,
    ) -> (LinkExtraction, Vec<MetricRecord>) {
        let sections = Sections::from_text(block);
        let mut extractor = MetricExtractor::new(&self.table, &sections);

        let name = block_name(block);
        let avg_bandwidth = extractor.text(AVG_BANDWIDTH);
        let total_data = extractor.text(TOTAL_DATA);
        let timing = LinkTiming {
            uptime_percent: extractor.percent(UPTIME_PERCENT),
            downtime_percent: extractor.percent(DOWNTIME_PERCENT),
            uptime_duration: extractor.text(UPTIME_DURATION),
            downtime_duration: extractor.text(DOWNTIME_DURATION),
        };

        let reconciled = reconcile(&timing, window);
        extractor.record("timing", reconciled.method.as_str(), reconciled.uptime_label());

        let record = LinkRecord {
            name,
            avg_bandwidth: avg_bandwidth.unwrap_or_else(|| "N/A".to_string()),
            total_data: total_data.unwrap_or_else(|| "N/A".to_string()),
            uptime_percent: reconciled.uptime_label(),
            downtime_percent: reconciled.downtime_label(),
            uptime_duration: reconciled.uptime_duration.clone(),
            downtime_duration: reconciled.downtime_duration.clone(),
        };

        (
            LinkExtraction {
                record,
                uptime_value: reconciled.uptime_percent,
                downtime_value: reconciled.downtime_percent,
            },
            extractor.into_records(),
        )
    }
}

/// Sensor name: the rest of the marker line, else the next non-empty line.
fn block_name(block: &str) -> String {
    let clean = |line: &str| {
        line.trim()
            .trim_start_matches(|character: char| {
                matches!(character, '>' | '-' | ':' | '|') || character.is_whitespace()
            })
            .trim()
            .to_string()
    };

    let mut lines = block.lines();
    let first = lines.next().map(clean).unwrap_or_default();
    if !first.is_empty() {
        return first;
    }

    lines
        .map(clean)
        .find(|line| !line.is_empty())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn summarize_links(links: &[LinkExtraction]) -> LinkSummaryStats {
    let count = links.len();
    let (uptime_avg, downtime_avg) = if count == 0 {
        (0.0, 0.0)
    } else {
        let uptime_total: f64 = links.iter().map(|link| link.uptime_value).sum();
        let downtime_total: f64 = links.iter().map(|link| link.downtime_value).sum();
        (uptime_total / count as f64, downtime_total / count as f64)
    };

    LinkSummaryStats {
        overall_avg_uptime_percent: render_percent(uptime_avg),
        overall_avg_downtime_percent: render_percent(downtime_avg),
        total_links_monitored: count as u64,
        links_with_downtime: links
            .iter()
            .filter(|link| link.downtime_value > 0.0)
            .count() as u64,
    }
}
