use super::*;
use crate::error::EngineError;

fn registry() -> ParserRegistry {
    ParserRegistry::new(&ExtractionSettings::default()).expect("parsers build")
}

fn context(text: &str) -> ClientContext {
    ClientContext {
        client_name: "Acme Corp".to_string(),
        report_period: "January 2026".to_string(),
        generated_date: "2026-02-01".to_string(),
        text: text.to_string(),
    }
}

#[test]
fn registry_resolves_known_modules_only() {
    let registry = registry();
    assert_eq!(registry.module_ids(), vec!["datto_rmm", "prtg_monitoring"]);
    assert_eq!(
        registry.get(" prtg_monitoring ").expect("known module").module_id(),
        "prtg_monitoring"
    );

    match registry.get("connectwise") {
        Err(EngineError::UnknownModule(module)) => assert_eq!(module, "connectwise"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unknown module resolved"),
    }
}

#[test]
fn source_filters_split_vendors_by_name() {
    let registry = registry();
    let datto = registry.get("datto_rmm").expect("datto parser");
    let prtg = registry.get("prtg_monitoring").expect("prtg parser");

    assert!(datto.accepts_source("Acme_Corp_Health.PDF"));
    assert!(!datto.accepts_source("Acme_Corp_PRTG.pdf"));
    assert!(!datto.accepts_source("Acme_Corp_Health.txt"));
    assert!(prtg.accepts_source("Acme_Corp_prtg_uptime.pdf"));
    assert!(!prtg.accepts_source("Acme_Corp_Health.pdf"));
    assert_eq!(prtg.source_subdir(), "prtg");
}

#[test]
fn empty_health_text_still_emits_every_key() {
    let registry = registry();
    let extraction = registry
        .get("datto_rmm")
        .expect("datto parser")
        .extract(&context(""))
        .expect("extraction runs");
    let value = serde_json::to_value(&extraction.report).expect("serializes");

    assert_eq!(value["meta"]["client_name"], "Acme Corp");
    assert_eq!(value["meta"]["report_month"], "January 2026");
    assert_eq!(value["device_health"]["total_managed"], 0);
    assert_eq!(value["device_health"]["compliance_percentage"], 0.0);
    assert_eq!(value["device_health"]["metrics"]["disk_space"]["low_space_count"], 0);
    assert_eq!(value["summary"]["total_tickets"], 0);
    assert_eq!(
        value["tickets"],
        serde_json::json!({ "total": 0, "software_count": 0, "hardware_count": 0 })
    );
    assert_eq!(value["antivirus"]["installed_count"], 0);
    assert_eq!(value["patch_management"]["fully_patched_count"], 0);
    assert_eq!(
        value["patch_management"]["windows_10_users_list"],
        serde_json::json!([])
    );
    assert_eq!(
        value["scores"]["services_delivered_chart_path"],
        "assets/services_delivered_Acme_Corp.png"
    );
    assert!(value["recommendations"].as_array().expect("array").len() >= 3);
}

#[test]
fn health_chart_inputs_stay_out_of_report() {
    let registry = registry();
    let text = "Device Health Summary\nTotal Managed devices: 50\nDevices with Check Passed: 45";
    let extraction = registry
        .get("datto_rmm")
        .expect("datto parser")
        .extract(&context(text))
        .expect("extraction runs");

    assert_eq!(extraction.chart_inputs.service_scores[0].value, 90.0);
    assert_eq!(extraction.chart_inputs.pass_fail.len(), 3);
    let value = serde_json::to_value(&extraction.report).expect("serializes");
    assert!(value.get("service_scores").is_none());
    assert_eq!(value["device_health"]["compliance_percentage"], 90.0);
}

#[test]
fn link_report_is_wrapped_under_module_key() {
    let registry = registry();
    let text = "Report (1/1/2026 - 1/3/2026)\nLocal Probe (Local Probe) Branch WAN\nUptime: 50 %\n";
    let extraction = registry
        .get("prtg_monitoring")
        .expect("prtg parser")
        .extract(&context(text))
        .expect("extraction runs");
    let value = serde_json::to_value(&extraction.report).expect("serializes");

    let links = value["prtg_monitoring"]["links"].as_array().expect("links array");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["name"], "Branch WAN");
    assert_eq!(links[0]["uptime_percent"], "50%");
    assert_eq!(links[0]["downtime_percent"], "50%");
    assert_eq!(links[0]["total_data"], "N/A");
    assert_eq!(
        value["prtg_monitoring"]["summary_stats"]["links_with_downtime"],
        1
    );
    assert_eq!(
        value["prtg_monitoring"]["chart_path"],
        "assets/prtg_uptime_Acme_Corp.png"
    );
    assert_eq!(extraction.chart_inputs.link_uptime[0].value, 50.0);
}

#[test]
fn artifact_names_use_sanitized_client() {
    assert_eq!(
        output_filename("datto_rmm", "Acme Corp."),
        "temp_datto_rmm_output_Acme_Corp_.json"
    );
    assert_eq!(chart_path("disk_space", "A&B"), "assets/disk_space_A_B.png");
}
