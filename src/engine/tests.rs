use super::disk::DiskRanker;
use super::devices::{DeviceShapes, default_prefixes};
use super::health::HealthExtractor;
use super::links::{LinkExtractor, summarize_links};
use super::matcher::{MatchConfidence, match_client_files};
use super::normalize::normalize_text;
use super::recommend::{MAX_RECOMMENDATIONS, MIN_RECOMMENDATIONS, recommendations};
use super::segment::{DOCUMENT_BOUNDARY, merge_documents};
use crate::config::ExtractionSettings;

const HEALTH_PAGE_ONE: &str = "Datto RMM  Monthly Report\n\
Executive Summary\n\
Devices: 50\n\
Device Health Summary\n\
Total Managed devices: 50\n\
Devices with Check Passed: 45\n\
Devices with Check Failed: 5\n\
Disk Space  47  3  94%\n\
RAM Usage  50  0  100%\n\
OS Support  46  4  92%\n\
PC0012\n\
Jane Doe\n\
Windows 10 Pro\n\
PC0019 Windows 11 Pro\n\
PC0023\n\
Windows 10 Enterprise\n\
Server Antivirus\n\
Running and Up to Date: 3\n\
Workstation Antivirus\n\
Running and Up to Date: 44";

const HEALTH_PAGE_TWO: &str = "Device Storage\n\
Device  Drive  Size  Used\n\
PC0012  C:  237GB  91.5%\n\
PC0019  C:  476GB  42%\n\
PC0012  D:  931GB  60%\n\
Patch Management Summary\n\
Total Devices: 50\n\
Fully Patched: 41\n\
Reboot Required: 4\n\
PC0012\n\
Windows 10 Pro\n\
Jane Doe\n\
PC0023\n\
Omar O'Neil\n\
PC0019\n\
Li Wei";

fn merged_health_text() -> String {
    normalize_text(&merge_documents(&[
        HEALTH_PAGE_ONE.to_string(),
        HEALTH_PAGE_TWO.to_string(),
    ]))
}

#[test]
fn empty_health_text_degrades_to_defaults() {
    let settings = ExtractionSettings::default();
    let extractor = HealthExtractor::new(&settings).expect("health rules compile");
    let metrics = extractor.extract("").expect("extraction runs").metrics;

    assert_eq!(metrics.total_managed, 0);
    assert_eq!(metrics.compliance_percentage, 0.0);
    assert_eq!(metrics.antivirus_installed, 0);
    assert_eq!(metrics.fully_patched, 0);

    let items = recommendations(&metrics, &settings);
    assert!(items.len() >= MIN_RECOMMENDATIONS);
    assert!(items.len() <= MAX_RECOMMENDATIONS);
}

#[test]
fn merged_health_report_extracts_every_section() {
    let text = merged_health_text();
    assert!(text.contains(DOCUMENT_BOUNDARY));

    let settings = ExtractionSettings::default();
    let extractor = HealthExtractor::new(&settings).expect("health rules compile");
    let extraction = extractor.extract(&text).expect("extraction runs");
    let metrics = &extraction.metrics;

    assert_eq!(metrics.total_managed, 50);
    assert_eq!(metrics.compliance_percentage, 90.0);
    assert_eq!(metrics.disk.passed, 47);
    assert_eq!(metrics.disk.failed, 3);
    assert_eq!(metrics.ram.failed, 0);
    assert_eq!(metrics.os_support.failed, 4);
    assert_eq!(metrics.antivirus_installed, 47);
    assert_eq!(metrics.fully_patched, 41);
    assert_eq!(metrics.update_required, 9);
    assert_eq!(metrics.low_space_count, 3);

    assert_eq!(metrics.top_disks[0].label, "PC0012");
    assert_eq!(metrics.top_disks[0].used_percent, 91.5);
    assert_eq!(metrics.top_disks.len(), 2);

    assert_eq!(metrics.os_users, vec!["Jane Doe", "Omar O'Neil"]);
    assert_eq!(extraction.sections_found.len(), 4);

    let items = recommendations(metrics, &settings);
    assert!(items.iter().any(|item| item.contains("require updates")));
    assert!(items.len() <= MAX_RECOMMENDATIONS);
}

#[test]
fn disk_ranking_is_stable_across_runs() {
    let shapes = DeviceShapes::new(&default_prefixes()).expect("shapes compile");
    let ranker = DiskRanker::new(&shapes).expect("ranker compiles");
    let text = merged_health_text();
    assert_eq!(ranker.rank(&text), ranker.rank(&text));
}

#[test]
fn link_report_reconciles_against_report_window() {
    let text = normalize_text(
        "PRTG Uptime Report (1/1/2026 12:00:00 AM - 1/3/2026 12:00:00 AM)\n\
         Local Probe (Local Probe) \u{bb} Head Office Fibre\n\
         Average 12.4 Mbit/s Total 88,120 MB\n\
         Uptime: 99 % [2d 00h 00m 00s]",
    );
    let extractor = LinkExtractor::new().expect("link rules compile");
    let (links, _) = extractor.extract(&text);

    assert_eq!(links.len(), 1);
    assert_eq!(links[0].record.name, "Head Office Fibre");
    assert_eq!(links[0].record.uptime_percent, "100%");
    assert_eq!(links[0].record.downtime_percent, "0%");

    let stats = summarize_links(&links);
    assert_eq!(stats.total_links_monitored, 1);
    assert_eq!(stats.links_with_downtime, 0);
}

#[test]
fn typo_in_filename_only_matches_fuzzily() {
    let files = vec![
        "Acme_Corp_Report.pdf".to_string(),
        "Globex_Report.pdf".to_string(),
    ];
    let matched = match_client_files("Acme Corp", &files);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].confidence, MatchConfidence::Exact);

    let files = vec!["Acem_Corp_Report.pdf".to_string()];
    let matched = match_client_files("Acme Corp", &files);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].confidence, MatchConfidence::Fuzzy);
}
