use anyhow::Result;
use tracing::{info, warn};

use super::{ClientContext, Extraction, ReportParser, chart_path, is_pdf};
use crate::engine::links::{LinkExtractor, summarize_links};
use crate::engine::normalize::normalize_text;
use crate::model::{ChartInputs, LinkReport, ParsedReport, PrtgMonitoring, ScorePoint};

pub const MODULE_ID: &str = "prtg_monitoring";

pub struct PrtgMonitoringParser {
    extractor: LinkExtractor,
}

impl PrtgMonitoringParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            extractor: LinkExtractor::new()?,
        })
    }
}

impl ReportParser for PrtgMonitoringParser {
    fn module_id(&self) -> &'static str {
        MODULE_ID
    }

    fn source_subdir(&self) -> &'static str {
        "prtg"
    }

    fn accepts_source(&self, filename: &str) -> bool {
        is_pdf(filename) && filename.to_ascii_lowercase().contains("prtg")
    }

    fn extract(&self, context: &ClientContext) -> Result<Extraction> {
        let text = normalize_text(&context.text);
        let (links, provenance) = self.extractor.extract(&text);
        if links.is_empty() && !text.trim().is_empty() {
            warn!(client = %context.client_name, "no sensor blocks found in link report text");
        }

        let summary_stats = summarize_links(&links);
        info!(
            client = %context.client_name,
            links = summary_stats.total_links_monitored,
            with_downtime = summary_stats.links_with_downtime,
            "extracted link uptime report"
        );

        let chart_inputs = ChartInputs {
            link_uptime: links
                .iter()
                .map(|link| ScorePoint {
                    label: link.record.name.clone(),
                    value: link.uptime_value,
                })
                .collect(),
            ..ChartInputs::default()
        };
        let sections_found = links.iter().map(|link| link.record.name.clone()).collect();

        let report = LinkReport {
            prtg_monitoring: PrtgMonitoring {
                links: links.into_iter().map(|link| link.record).collect(),
                summary_stats,
                chart_path: chart_path("prtg_uptime", &context.client_name),
            },
        };

        Ok(Extraction {
            report: ParsedReport::Links(report),
            chart_inputs,
            sections_found,
            provenance,
        })
    }
}
