use super::health::HealthMetrics;
use crate::config::ExtractionSettings;

pub const MIN_RECOMMENDATIONS: usize = 3;
pub const MAX_RECOMMENDATIONS: usize = 6;

const GENERIC_RECOMMENDATIONS: &[&str] = &[
    "Continue monthly review of device health alerts and resolve failed checks promptly.",
    "Maintain the current patch approval cadence and verify reboots complete after patching.",
    "Review antivirus definitions and scan schedules on all managed devices each month.",
    "Keep the device inventory current by retiring devices that no longer report in.",
];

/// Threshold-driven recommendations first, then generic hygiene items until
/// at least three exist. Never more than six.
pub fn recommendations(metrics: &HealthMetrics, settings: &ExtractionSettings) -> Vec<String> {
    let mut items = Vec::new();

    if metrics.total_managed > 0 && metrics.compliance_percentage < settings.compliance_target {
        items.push(format!(
            "Device health compliance is {:.1}%, below the {:.0}% target. Investigate and remediate devices with failed checks.",
            metrics.compliance_percentage, settings.compliance_target
        ));
    }
    if metrics.update_required > 0 {
        items.push(format!(
            "{} device(s) require updates. Schedule patch deployment and follow up on install errors and pending reboots.",
            metrics.update_required
        ));
    }
    if metrics.antivirus_installed < metrics.total_managed {
        items.push(format!(
            "Antivirus is running and up to date on {} of {} managed devices. Deploy or repair protection on the remainder.",
            metrics.antivirus_installed, metrics.total_managed
        ));
    }
    if metrics.low_space_count > 0 {
        items.push(format!(
            "{} device(s) are low on disk space. Clean up or expand storage before it affects users.",
            metrics.low_space_count
        ));
    }
    if metrics.ram.failed > 0 {
        items.push(format!(
            "{} device(s) failed the RAM check. Consider memory upgrades or workload review.",
            metrics.ram.failed
        ));
    }
    if metrics.os_support.failed > 0 {
        items.push(format!(
            "{} device(s) run an unsupported operating system. Plan upgrades or replacements.",
            metrics.os_support.failed
        ));
    }

    for generic in GENERIC_RECOMMENDATIONS {
        if items.len() >= MIN_RECOMMENDATIONS {
            break;
        }
        items.push((*generic).to_string());
    }

    items.truncate(MAX_RECOMMENDATIONS);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::health::PolicyCounts;

    #[test]
    fn empty_report_gets_generic_items() {
        let items = recommendations(&HealthMetrics::default(), &ExtractionSettings::default());
        assert_eq!(items.len(), MIN_RECOMMENDATIONS);
        assert_eq!(items[0], GENERIC_RECOMMENDATIONS[0]);
    }

    #[test]
    fn every_threshold_tripped_is_capped() {
        let metrics = HealthMetrics {
            total_managed: 50,
            compliance_percentage: 70.0,
            update_required: 9,
            antivirus_installed: 40,
            low_space_count: 3,
            ram: PolicyCounts { passed: 48, failed: 2 },
            os_support: PolicyCounts { passed: 45, failed: 5 },
            ..HealthMetrics::default()
        };
        let items = recommendations(&metrics, &ExtractionSettings::default());
        assert_eq!(items.len(), MAX_RECOMMENDATIONS);
        assert!(items[0].contains("70.0%"));
        assert!(items[5].contains("unsupported operating system"));
    }

    #[test]
    fn threshold_items_come_before_generic_ones() {
        let metrics = HealthMetrics {
            total_managed: 10,
            compliance_percentage: 100.0,
            antivirus_installed: 10,
            low_space_count: 1,
            ..HealthMetrics::default()
        };
        let items = recommendations(&metrics, &ExtractionSettings::default());
        assert_eq!(items.len(), 3);
        assert!(items[0].contains("low on disk space"));
        assert_eq!(items[1], GENERIC_RECOMMENDATIONS[0]);
    }
}
