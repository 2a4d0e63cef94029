use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::correlate::{Correlator, DeviceRecord, owner_names};
use super::devices::DeviceShapes;
use super::disk::{DiskRanker, DiskUsageEntry, low_space_count};
use super::reconcile::clamp_percent;
use super::rules::{FieldSpec, MetricExtractor, MetricRecord, Rule, RuleTable, Scope};
use super::segment::{
    DEVICE_HEALTH, DEVICE_STORAGE, EXECUTIVE, HEALTH_SECTION_TITLES, PATCH_MANAGEMENT,
    segment_named,
};
use crate::config::ExtractionSettings;

const TOTAL_MANAGED: &str = "total_managed";
const CHECK_PASSED: &str = "check_passed";
const CHECK_FAILED: &str = "check_failed";
const DISK_POLICY: &str = "disk_policy";
const DISK_SECTION_PASSED: &str = "disk_section_passed";
const DISK_SECTION_FAILED: &str = "disk_section_failed";
const RAM_POLICY: &str = "ram_policy";
const OS_POLICY: &str = "os_policy";
const SERVER_ANTIVIRUS: &str = "server_antivirus";
const WORKSTATION_ANTIVIRUS: &str = "workstation_antivirus";
const FULLY_PATCHED: &str = "fully_patched";
const PATCH_TOTAL: &str = "patch_total_devices";
const APPROVED_PENDING: &str = "approved_pending";
const INSTALL_ERROR: &str = "install_error";
const REBOOT_REQUIRED: &str = "reboot_required";
const NO_DATA: &str = "no_data";
const NO_POLICY: &str = "no_policy";
const TOTAL_TICKETS: &str = "total_tickets";
const SOFTWARE_TICKETS: &str = "software_tickets";
const HARDWARE_TICKETS: &str = "hardware_tickets";

/// Passed count, failed count and percentage on one policy row.
const POLICY_TRIPLE: &str = r"(\d[\d,]*)\s+(\d[\d,]*)\s+(\d{1,3}(?:[.,]\d+)?)\s*%";
const DEVICES_COUNT: &str = r"(?i)\bdevices\s*:?\s*(\d[\d,]*)";
const RUNNING_UP_TO_DATE: &str = r"(?i)running\s+and\s+up\s+to\s+date\s*:?\s*(\d[\d,]*)";

pub const HEALTH_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: TOTAL_MANAGED,
        rules: &[
            Rule {
                source: "explicit total managed devices",
                scope: Scope::Global,
                pattern: r"(?i)total\s+managed\s+devices?\s*:?\s*(\d[\d,]*)",
            },
            Rule {
                source: "devices in device health section",
                scope: Scope::Section(DEVICE_HEALTH),
                pattern: DEVICES_COUNT,
            },
            Rule {
                source: "devices in executive section",
                scope: Scope::Section(EXECUTIVE),
                pattern: DEVICES_COUNT,
            },
        ],
    },
    FieldSpec {
        field: CHECK_PASSED,
        rules: &[Rule {
            source: "devices with check passed",
            scope: Scope::Global,
            pattern: r"(?i)devices\s+with\s+checks?\s+passed\s*:?\s*(\d[\d,]*)",
        }],
    },
    FieldSpec {
        field: CHECK_FAILED,
        rules: &[Rule {
            source: "devices with check failed",
            scope: Scope::Global,
            pattern: r"(?i)devices\s+with\s+checks?\s+failed\s*:?\s*(\d[\d,]*)",
        }],
    },
    FieldSpec {
        field: DISK_POLICY,
        rules: &[
            Rule {
                source: "disk space row in device health section",
                scope: Scope::Window {
                    section: Some(DEVICE_HEALTH),
                    anchor: "disk space",
                },
                pattern: POLICY_TRIPLE,
            },
            Rule {
                source: "disk space row",
                scope: Scope::Window {
                    section: None,
                    anchor: "disk space",
                },
                pattern: POLICY_TRIPLE,
            },
        ],
    },
    FieldSpec {
        field: DISK_SECTION_PASSED,
        rules: &[Rule {
            source: "device storage passed summary",
            scope: Scope::Section(DEVICE_STORAGE),
            pattern: r"(?i)\bpassed\s*:?\s*(\d[\d,]*)",
        }],
    },
    FieldSpec {
        field: DISK_SECTION_FAILED,
        rules: &[Rule {
            source: "device storage failed summary",
            scope: Scope::Section(DEVICE_STORAGE),
            pattern: r"(?i)\bfailed\s*:?\s*(\d[\d,]*)",
        }],
    },
    FieldSpec {
        field: RAM_POLICY,
        rules: &[
            Rule {
                source: "ram usage row",
                scope: Scope::Window {
                    section: None,
                    anchor: "ram usage",
                },
                pattern: POLICY_TRIPLE,
            },
            Rule {
                source: "memory row",
                scope: Scope::Window {
                    section: None,
                    anchor: "memory",
                },
                pattern: POLICY_TRIPLE,
            },
        ],
    },
    FieldSpec {
        field: OS_POLICY,
        rules: &[
            Rule {
                source: "os support row",
                scope: Scope::Window {
                    section: None,
                    anchor: "os support",
                },
                pattern: POLICY_TRIPLE,
            },
            Rule {
                source: "operating system row",
                scope: Scope::Window {
                    section: None,
                    anchor: "operating system",
                },
                pattern: POLICY_TRIPLE,
            },
        ],
    },
    FieldSpec {
        field: SERVER_ANTIVIRUS,
        rules: &[Rule {
            source: "server antivirus running and up to date",
            scope: Scope::Window {
                section: None,
                anchor: "server antivirus",
            },
            pattern: RUNNING_UP_TO_DATE,
        }],
    },
    FieldSpec {
        field: WORKSTATION_ANTIVIRUS,
        rules: &[Rule {
            source: "workstation antivirus running and up to date",
            scope: Scope::Window {
                section: None,
                anchor: "workstation antivirus",
            },
            pattern: RUNNING_UP_TO_DATE,
        }],
    },
    FieldSpec {
        field: FULLY_PATCHED,
        rules: &[
            Rule {
                source: "patch section fully patched",
                scope: Scope::Section(PATCH_MANAGEMENT),
                pattern: r"(?i)fully\s+patched\s*:?\s*(\d[\d,]*)",
            },
            Rule {
                source: "fully patched",
                scope: Scope::Global,
                pattern: r"(?i)fully\s+patched\s*:?\s*(\d[\d,]*)",
            },
        ],
    },
    FieldSpec {
        field: PATCH_TOTAL,
        rules: &[
            Rule {
                source: "patch section total devices",
                scope: Scope::Section(PATCH_MANAGEMENT),
                pattern: r"(?i)total\s+devices\s*:?\s*(\d[\d,]*)",
            },
            Rule {
                source: "total devices",
                scope: Scope::Global,
                pattern: r"(?i)total\s+devices\s*:?\s*(\d[\d,]*)",
            },
        ],
    },
    FieldSpec {
        field: APPROVED_PENDING,
        rules: &[
            Rule {
                source: "patch section approved pending",
                scope: Scope::Section(PATCH_MANAGEMENT),
                pattern: r"(?i)approved\s+pending\s*:?\s*(\d[\d,]*)",
            },
            Rule {
                source: "approved pending",
                scope: Scope::Global,
                pattern: r"(?i)approved\s+pending\s*:?\s*(\d[\d,]*)",
            },
        ],
    },
    FieldSpec {
        field: INSTALL_ERROR,
        rules: &[
            Rule {
                source: "patch section install error",
                scope: Scope::Section(PATCH_MANAGEMENT),
                pattern: r"(?i)install(?:ation)?\s+errors?\s*:?\s*(\d[\d,]*)",
            },
            Rule {
                source: "install error",
                scope: Scope::Global,
                pattern: r"(?i)install(?:ation)?\s+errors?\s*:?\s*(\d[\d,]*)",
            },
        ],
    },
    FieldSpec {
        field: REBOOT_REQUIRED,
        rules: &[
            Rule {
                source: "patch section reboot required",
                scope: Scope::Section(PATCH_MANAGEMENT),
                pattern: r"(?i)reboot\s+required\s*:?\s*(\d[\d,]*)",
            },
            Rule {
                source: "reboot required",
                scope: Scope::Global,
                pattern: r"(?i)reboot\s+required\s*:?\s*(\d[\d,]*)",
            },
        ],
    },
    FieldSpec {
        field: NO_DATA,
        rules: &[
            Rule {
                source: "patch section no data",
                scope: Scope::Section(PATCH_MANAGEMENT),
                pattern: r"(?i)\bno\s+data\s*:?\s*(\d[\d,]*)",
            },
            Rule {
                source: "no data",
                scope: Scope::Global,
                pattern: r"(?i)\bno\s+data\s*:?\s*(\d[\d,]*)",
            },
        ],
    },
    FieldSpec {
        field: NO_POLICY,
        rules: &[
            Rule {
                source: "patch section no policy",
                scope: Scope::Section(PATCH_MANAGEMENT),
                pattern: r"(?i)\bno\s+policy\s*:?\s*(\d[\d,]*)",
            },
            Rule {
                source: "no policy",
                scope: Scope::Global,
                pattern: r"(?i)\bno\s+policy\s*:?\s*(\d[\d,]*)",
            },
        ],
    },
    FieldSpec {
        field: TOTAL_TICKETS,
        rules: &[Rule {
            source: "total tickets",
            scope: Scope::Global,
            pattern: r"(?i)total\s+tickets\s*:?\s*(\d[\d,]*)",
        }],
    },
    FieldSpec {
        field: SOFTWARE_TICKETS,
        rules: &[Rule {
            source: "software tickets",
            scope: Scope::Global,
            pattern: r"(?i)software\s+tickets\s*:?\s*(\d[\d,]*)",
        }],
    },
    FieldSpec {
        field: HARDWARE_TICKETS,
        rules: &[Rule {
            source: "hardware tickets",
            scope: Scope::Global,
            pattern: r"(?i)hardware\s+tickets\s*:?\s*(\d[\d,]*)",
        }],
    },
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PolicyCounts {
    pub passed: u64,
    pub failed: u64,
}

impl PolicyCounts {
    pub fn total(&self) -> u64 {
        self.passed.saturating_add(self.failed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchBuckets {
    pub approved_pending: u64,
    pub install_error: u64,
    pub reboot_required: u64,
    pub no_data: u64,
    pub no_policy: u64,
}

impl PatchBuckets {
    pub fn sum(&self) -> u64 {
        [
            self.install_error,
            self.reboot_required,
            self.no_data,
            self.no_policy,
        ]
        .into_iter()
        .fold(self.approved_pending, u64::saturating_add)
    }
}

/// Ticket tallies. Health exports rarely carry them, so zero is the norm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TicketCounts {
    pub total: u64,
    pub software: u64,
    pub hardware: u64,
}

/// Every number the health report flavor needs, defaults already applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthMetrics {
    pub total_managed: u64,
    pub check_passed: u64,
    pub compliance_percentage: f64,
    pub disk: PolicyCounts,
    pub low_space_count: u64,
    pub ram: PolicyCounts,
    pub os_support: PolicyCounts,
    pub antivirus_installed: u64,
    pub patch_total_devices: Option<u64>,
    pub fully_patched: u64,
    pub update_required: u64,
    pub patch_buckets: PatchBuckets,
    pub tickets: TicketCounts,
    pub top_disks: Vec<DiskUsageEntry>,
    pub flagged_devices: Vec<DeviceRecord>,
    pub os_users: Vec<String>,
    pub average_score: f64,
}

#[derive(Debug, Clone)]
pub struct HealthExtraction {
    pub metrics: HealthMetrics,
    pub sections_found: Vec<String>,
    pub provenance: Vec<MetricRecord>,
}

pub struct HealthExtractor {
    table: RuleTable,
    shapes: DeviceShapes,
    settings: ExtractionSettings,
}

impl HealthExtractor {
    pub fn new(settings: &ExtractionSettings) -> Result<Self> {
        Ok(Self {
            table: RuleTable::compile(HEALTH_FIELDS)?,
            shapes: DeviceShapes::new(&settings.device_id_prefixes)?,
            settings: settings.clone(),
        })
    }

    /// Extract from normalized, merged health-report text. Missing anchors
    /// fall back to their documented defaults; only pattern compilation
    /// can fail.
    pub fn extract(&self, text: &str) -> Result<HealthExtraction> {
        let sections = segment_named(text, HEALTH_SECTION_TITLES);
        let mut extractor = MetricExtractor::new(&self.table, &sections);
        let mut metrics = HealthMetrics::default();

        metrics.total_managed = extractor.count(TOTAL_MANAGED).unwrap_or_else(|| {
            extractor.record(TOTAL_MANAGED, "default", 0);
            0
        });

        let explicit_failed = extractor.count(CHECK_FAILED);
        metrics.check_passed = match (extractor.count(CHECK_PASSED), explicit_failed) {
            (Some(passed), _) => passed,
            (None, Some(failed)) if metrics.total_managed > 0 => {
                let passed = metrics.total_managed.saturating_sub(failed);
                extractor.record(CHECK_PASSED, "total managed minus failed", passed);
                passed
            }
            _ => {
                extractor.record(CHECK_PASSED, "default", 0);
                0
            }
        };
        metrics.compliance_percentage =
            ratio_percent(metrics.check_passed, metrics.total_managed);

        metrics.disk = self.disk_counts(&mut extractor);
        metrics.ram = self.assumed_compliant(&mut extractor, RAM_POLICY, metrics.total_managed);
        metrics.os_support =
            self.assumed_compliant(&mut extractor, OS_POLICY, metrics.total_managed);

        let server = extractor.count(SERVER_ANTIVIRUS).unwrap_or(0);
        let workstation = extractor.count(WORKSTATION_ANTIVIRUS).unwrap_or(0);
        metrics.antivirus_installed = server.saturating_add(workstation);

        self.patch_counts(&mut extractor, &mut metrics);
        metrics.tickets = ticket_counts(&mut extractor);

        let ranker = DiskRanker::new(&self.shapes)?;
        let ranked = ranker.rank(sections.get(DEVICE_STORAGE));
        metrics.low_space_count = low_space_count(
            &ranked,
            self.settings.low_space_threshold,
            metrics.disk.failed,
        );
        extractor.record(
            "low_space_count",
            "max of threshold tally and failed",
            metrics.low_space_count,
        );
        metrics.top_disks = ranked
            .into_iter()
            .take(self.settings.top_disk_count)
            .collect();

        let correlator = Correlator::new(&self.shapes)?;
        metrics.flagged_devices = correlator.correlate(
            sections.get(DEVICE_HEALTH),
            sections.get(PATCH_MANAGEMENT),
            &self.settings.os_label,
        );
        metrics.os_users = owner_names(&metrics.flagged_devices);
        debug!(
            os_label = %self.settings.os_label,
            users = metrics.os_users.len(),
            "correlated device owners"
        );

        metrics.average_score = average_score(&metrics);

        Ok(HealthExtraction {
            metrics,
            sections_found: sections
                .present_titles()
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
            provenance: extractor.into_records(),
        })
    }

    fn disk_counts(&self, extractor: &mut MetricExtractor<'_>) -> PolicyCounts {
        if let Some((passed, failed, _)) = extractor.triple(DISK_POLICY) {
            return PolicyCounts { passed, failed };
        }
        let passed = extractor.count(DISK_SECTION_PASSED);
        let failed = extractor.count(DISK_SECTION_FAILED);
        if passed.is_none() && failed.is_none() {
            extractor.record(DISK_POLICY, "default", "0 passed / 0 failed");
        }
        PolicyCounts {
            passed: passed.unwrap_or(0),
            failed: failed.unwrap_or(0),
        }
    }

    /// RAM and OS rows default to every managed device passing when the
    /// report states no failure count.
    fn assumed_compliant(
        &self,
        extractor: &mut MetricExtractor<'_>,
        field: &str,
        total_managed: u64,
    ) -> PolicyCounts {
        match extractor.triple(field) {
            Some((passed, failed, _)) => PolicyCounts { passed, failed },
            None => {
                extractor.record(field, "assumed compliant", total_managed);
                PolicyCounts {
                    passed: total_managed,
                    failed: 0,
                }
            }
        }
    }

    fn patch_counts(&self, extractor: &mut MetricExtractor<'_>, metrics: &mut HealthMetrics) {
        metrics.fully_patched = extractor.count(FULLY_PATCHED).unwrap_or(0);
        metrics.patch_total_devices = extractor.count(PATCH_TOTAL);
        metrics.patch_buckets = PatchBuckets {
            approved_pending: extractor.count(APPROVED_PENDING).unwrap_or(0),
            install_error: extractor.count(INSTALL_ERROR).unwrap_or(0),
            reboot_required: extractor.count(REBOOT_REQUIRED).unwrap_or(0),
            no_data: extractor.count(NO_DATA).unwrap_or(0),
            no_policy: extractor.count(NO_POLICY).unwrap_or(0),
        };

        metrics.update_required = match metrics.patch_total_devices {
            Some(total) => {
                let required = total.saturating_sub(metrics.fully_patched);
                extractor.record("update_required", "total devices minus fully patched", required);
                required
            }
            None => {
                let required = metrics.patch_buckets.sum();
                extractor.record("update_required", "sum of status buckets", required);
                required
            }
        };
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn ticket_counts(extractor: &mut MetricExtractor<'_>) -> TicketCounts {
    let software = extractor.count(SOFTWARE_TICKETS).unwrap_or(0);
    let hardware = extractor.count(HARDWARE_TICKETS).unwrap_or(0);
    let total = match extractor.count(TOTAL_TICKETS) {
        Some(total) => total,
        None => {
            let total = software.saturating_add(hardware);
            extractor.record(TOTAL_TICKETS, "software plus hardware tickets", total);
            total
        }
    };
    TicketCounts {
        total,
        software,
        hardware,
    }
}

/// `part / whole` as a percentage with one decimal; zero when `whole` is.
pub fn ratio_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_one_decimal(clamp_percent(part as f64 / whole as f64 * 100.0))
}

/// Mean of the coverage percentages the report could back with a
/// denominator: check compliance, antivirus coverage and patch coverage.
fn average_score(metrics: &HealthMetrics) -> f64 {
    let patch_base = metrics
        .patch_total_devices
        .filter(|total| *total > 0)
        .unwrap_or(metrics.total_managed);

    let mut scores = Vec::with_capacity(3);
    if metrics.total_managed > 0 {
        scores.push(metrics.compliance_percentage);
        scores.push(ratio_percent(metrics.antivirus_installed, metrics.total_managed));
    }
    if patch_base > 0 {
        scores.push(ratio_percent(metrics.fully_patched, patch_base));
    }

    if scores.is_empty() {
        0.0
    } else {
        round_one_decimal(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}
