use serde::{Deserialize, Serialize};

use crate::engine::disk::DiskUsageEntry;
use crate::engine::health::PatchBuckets;
use crate::engine::links::{LinkRecord, LinkSummaryStats};
use crate::engine::matcher::MatchConfidence;
use crate::engine::rules::MetricRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub client_name: String,
    pub report_month: String,
    pub generated_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_tickets: u64,
    pub av_installed: u64,
    pub fully_patched: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportScores {
    pub average_score: f64,
    pub services_delivered_chart_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub total: u64,
    pub software_count: u64,
    pub hardware_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSpaceMetric {
    pub passed_count: u64,
    pub total_count: u64,
    pub low_space_count: u64,
    pub chart_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetric {
    pub passed_count: u64,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceHealthMetrics {
    pub disk_space: DiskSpaceMetric,
    pub ram: PolicyMetric,
    pub os_support: PolicyMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceHealth {
    pub total_managed: u64,
    pub compliance_percentage: f64,
    pub chart_path: String,
    pub metrics: DeviceHealthMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntivirusStatus {
    pub installed_count: u64,
    pub chart_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchManagement {
    pub fully_patched_count: u64,
    pub update_required_count: u64,
    pub chart_path: String,
    pub status_buckets: PatchBuckets,
    pub windows_10_users_list: Vec<String>,
}

/// Hand-off document for the device health report flavor. Every key is
/// always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub meta: ReportMeta,
    pub summary: ReportSummary,
    pub scores: ReportScores,
    pub tickets: TicketSummary,
    pub device_health: DeviceHealth,
    pub antivirus: AntivirusStatus,
    pub patch_management: PatchManagement,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrtgMonitoring {
    pub links: Vec<LinkRecord>,
    pub summary_stats: LinkSummaryStats,
    pub chart_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkReport {
    pub prtg_monitoring: PrtgMonitoring,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParsedReport {
    Health(Box<HealthReport>),
    Links(LinkReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassFail {
    pub label: String,
    pub passed: u64,
    pub failed: u64,
}

/// Raw series for the chart renderer. Kept out of the hand-off report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartInputs {
    pub service_scores: Vec<ScorePoint>,
    pub pass_fail: Vec<PassFail>,
    pub top_disks: Vec<DiskUsageEntry>,
    pub antivirus_coverage: Option<PassFail>,
    pub patch_totals: Option<PassFail>,
    pub link_uptime: Vec<ScorePoint>,
}

/// Extracted values with the rule that produced each one.
#[derive(Debug, Clone, Serialize)]
pub struct DebugArtifact {
    pub module: String,
    pub client_name: String,
    pub engine_version: String,
    pub generated_at: String,
    pub sections_found: Vec<String>,
    pub provenance: Vec<MetricRecord>,
    pub report: ParsedReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceEntry {
    pub filename: String,
    pub confidence: MatchConfidence,
    pub sha256: String,
    pub text_origin: String,
    pub page_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleRunEntry {
    pub module: String,
    pub status: String,
    pub sources: Vec<SourceEntry>,
    pub merged_text_path: Option<String>,
    pub output_path: Option<String>,
    pub debug_path: Option<String>,
    pub chart_inputs_path: Option<String>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub engine_version: String,
    pub client_name: String,
    pub report_period: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub modules: Vec<ModuleRunEntry>,
    pub warnings: Vec<String>,
}
