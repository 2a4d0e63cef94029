use anyhow::Result;
use tracing::info;

use super::{ClientContext, Extraction, ReportParser, chart_path, is_pdf};
use crate::config::ExtractionSettings;
use crate::engine::health::{HealthExtractor, HealthMetrics, ratio_percent};
use crate::engine::normalize::normalize_text;
use crate::engine::recommend::recommendations;
use crate::model::{
    AntivirusStatus, ChartInputs, DeviceHealth, DeviceHealthMetrics, DiskSpaceMetric,
    HealthReport, ParsedReport, PassFail, PatchManagement, PolicyMetric, ReportMeta, ReportScores,
    ReportSummary, ScorePoint, TicketSummary,
};

pub const MODULE_ID: &str = "datto_rmm";

pub struct DattoRmmParser {
    extractor: HealthExtractor,
    settings: ExtractionSettings,
}

impl DattoRmmParser {
    pub fn new(settings: &ExtractionSettings) -> Result<Self> {
        Ok(Self {
            extractor: HealthExtractor::new(settings)?,
            settings: settings.clone(),
        })
    }
}

impl ReportParser for DattoRmmParser {
    fn module_id(&self) -> &'static str {
        MODULE_ID
    }

    fn source_subdir(&self) -> &'static str {
        ""
    }

    /// Health reports sit at the top of the data directory next to other
    /// vendors' exports; link reports are told apart by name.
    fn accepts_source(&self, filename: &str) -> bool {
        is_pdf(filename) && !filename.to_ascii_lowercase().contains("prtg")
    }

    fn extract(&self, context: &ClientContext) -> Result<Extraction> {
        let text = normalize_text(&context.text);
        let extraction = self.extractor.extract(&text)?;
        let metrics = &extraction.metrics;

        info!(
            client = %context.client_name,
            total_managed = metrics.total_managed,
            compliance = metrics.compliance_percentage,
            sections = extraction.sections_found.len(),
            "extracted device health report"
        );

        let report = health_report(context, metrics, recommendations(metrics, &self.settings));

        Ok(Extraction {
            report: ParsedReport::Health(Box::new(report)),
            chart_inputs: chart_inputs(metrics),
            sections_found: extraction.sections_found,
            provenance: extraction.provenance,
        })
    }
}

fn health_report(
    context: &ClientContext,
    metrics: &HealthMetrics,
    recommendations: Vec<String>,
) -> HealthReport {
    let client = context.client_name.as_str();

    HealthReport {
        meta: ReportMeta {
            client_name: context.client_name.clone(),
            report_month: context.report_period.clone(),
            generated_date: context.generated_date.clone(),
        },
        summary: ReportSummary {
            total_tickets: metrics.tickets.total,
            av_installed: metrics.antivirus_installed,
            fully_patched: metrics.fully_patched,
        },
        scores: ReportScores {
            average_score: metrics.average_score,
            services_delivered_chart_path: chart_path("services_delivered", client),
        },
        tickets: TicketSummary {
            total: metrics.tickets.total,
            software_count: metrics.tickets.software,
            hardware_count: metrics.tickets.hardware,
        },
        device_health: DeviceHealth {
            total_managed: metrics.total_managed,
            compliance_percentage: metrics.compliance_percentage,
            chart_path: chart_path("device_health", client),
            metrics: DeviceHealthMetrics {
                disk_space: DiskSpaceMetric {
                    passed_count: metrics.disk.passed,
                    total_count: metrics.disk.total(),
                    low_space_count: metrics.low_space_count,
                    chart_path: chart_path("disk_space", client),
                },
                ram: PolicyMetric {
                    passed_count: metrics.ram.passed,
                    total_count: metrics.ram.total(),
                },
                os_support: PolicyMetric {
                    passed_count: metrics.os_support.passed,
                    total_count: metrics.os_support.total(),
                },
            },
        },
        antivirus: AntivirusStatus {
            installed_count: metrics.antivirus_installed,
            chart_path: chart_path("antivirus", client),
        },
        patch_management: PatchManagement {
            fully_patched_count: metrics.fully_patched,
            update_required_count: metrics.update_required,
            chart_path: chart_path("patch_status", client),
            status_buckets: metrics.patch_buckets,
            windows_10_users_list: metrics.os_users.clone(),
        },
        recommendations,
    }
}

fn chart_inputs(metrics: &HealthMetrics) -> ChartInputs {
    let patch_base = metrics
        .patch_total_devices
        .unwrap_or(metrics.fully_patched.saturating_add(metrics.update_required));
    let pass_fail = |label: &str, passed: u64, failed: u64| PassFail {
        label: label.to_string(),
        passed,
        failed,
    };

    ChartInputs {
        service_scores: vec![
            ScorePoint {
                label: "Device Health".to_string(),
                value: metrics.compliance_percentage,
            },
            ScorePoint {
                label: "Antivirus".to_string(),
                value: ratio_percent(metrics.antivirus_installed, metrics.total_managed),
            },
            ScorePoint {
                label: "Patching".to_string(),
                value: ratio_percent(metrics.fully_patched, patch_base),
            },
        ],
        pass_fail: vec![
            pass_fail("Disk Space", metrics.disk.passed, metrics.disk.failed),
            pass_fail("RAM", metrics.ram.passed, metrics.ram.failed),
            pass_fail("OS Support", metrics.os_support.passed, metrics.os_support.failed),
        ],
        top_disks: metrics.top_disks.clone(),
        antivirus_coverage: Some(pass_fail(
            "Antivirus",
            metrics.antivirus_installed,
            metrics.total_managed.saturating_sub(metrics.antivirus_installed),
        )),
        patch_totals: Some(pass_fail(
            "Patch Status",
            metrics.fully_patched,
            metrics.update_required,
        )),
        link_uptime: Vec::new(),
    }
}
