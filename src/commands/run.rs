use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, error, info};

use crate::cli::RunArgs;
use crate::commands::matching::list_files;
use crate::config::ClientConfig;
use crate::engine::ENGINE_VERSION;
use crate::engine::matcher::match_client_files;
use crate::engine::segment::merge_documents;
use crate::error::EngineError;
use crate::model::{DebugArtifact, ModuleRunEntry, RunManifest, SourceEntry};
use crate::ocr::read_source_text;
use crate::parsers::{ClientContext, ParserRegistry, ReportParser, output_filename};
use crate::util::{
    now_utc_string, read_text_if_present, sanitize_client_name, sha256_file, utc_compact_string,
    write_json_pretty, write_text,
};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: RunArgs) -> Result<()> {
    let config = ClientConfig::load(&args.config)?;
    let registry = ParserRegistry::new(&config.extraction)?;

    let modules = if args.modules.is_empty() {
        config.modules_to_run.clone()
    } else {
        args.modules.clone()
    };
    let parsers = modules
        .iter()
        .map(|module| registry.get(module))
        .collect::<Result<Vec<&dyn ReportParser>, EngineError>>()?;

    let started_at = now_utc_string();
    let mut manifest = RunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: format!("run-{}", utc_compact_string(Utc::now())),
        engine_version: ENGINE_VERSION.to_string(),
        client_name: config.client_name.clone(),
        report_period: config.report_period.clone(),
        status: "running".to_string(),
        started_at: started_at.clone(),
        updated_at: started_at,
        command: render_run_command(&args),
        modules: Vec::new(),
        warnings: Vec::new(),
    };
    let manifest_path = args.work_dir.join("output").join(format!(
        "run_manifest_{}.json",
        sanitize_client_name(&config.client_name)
    ));

    info!(
        client = %config.client_name,
        run_id = %manifest.run_id,
        modules = ?modules,
        "starting client run"
    );

    for parser in parsers {
        match run_module(parser, &config, &args, &mut manifest.warnings) {
            Ok(entry) => manifest.modules.push(entry),
            Err(err) => {
                error!(
                    client = %config.client_name,
                    module = parser.module_id(),
                    error = %err,
                    "module failed; aborting client run"
                );
                manifest.modules.push(ModuleRunEntry {
                    module: parser.module_id().to_string(),
                    status: "failed".to_string(),
                    sources: Vec::new(),
                    merged_text_path: None,
                    output_path: None,
                    debug_path: None,
                    chart_inputs_path: None,
                    failure_reason: Some(format!("{err:#}")),
                });
                manifest.status = "failed".to_string();
                manifest.updated_at = now_utc_string();
                write_json_pretty(&manifest_path, &manifest)?;
                return Err(err);
            }
        }
    }

    manifest.status = "completed".to_string();
    manifest.updated_at = now_utc_string();
    write_json_pretty(&manifest_path, &manifest)?;
    info!(
        client = %config.client_name,
        path = %manifest_path.display(),
        warnings = manifest.warnings.len(),
        "client run completed"
    );

    Ok(())
}

struct SourceSet {
    dir: PathBuf,
    sources: Vec<SourceEntry>,
    texts: Vec<String>,
}

struct MergedText {
    path: PathBuf,
    text: String,
}

fn run_module(
    parser: &dyn ReportParser,
    config: &ClientConfig,
    args: &RunArgs,
    warnings: &mut Vec<String>,
) -> Result<ModuleRunEntry> {
    let module = parser.module_id();
    let client = config.client_name.as_str();
    let safe_client = sanitize_client_name(client);
    let output_dir = args.work_dir.join("output");

    let source_set = collect_sources(parser, config, args, warnings)?;
    debug!(
        module,
        dir = %source_set.dir.display(),
        sources = source_set.sources.len(),
        "collected sources"
    );
    let merged = merge_sources(
        &source_set.texts,
        &output_dir.join(format!("merged_{module}_{safe_client}.txt")),
    )?;

    let context = ClientContext {
        client_name: client.to_string(),
        report_period: config.report_period.clone(),
        generated_date: Utc::now().format("%Y-%m-%d").to_string(),
        text: merged.text,
    };
    let extraction = parser.extract(&context)?;

    let output_path = args.work_dir.join(output_filename(module, client));
    write_json_pretty(&output_path, &extraction.report)?;

    let debug_path = output_dir.join(format!("extracted_{module}_{safe_client}.json"));
    write_json_pretty(
        &debug_path,
        &DebugArtifact {
            module: module.to_string(),
            client_name: client.to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            generated_at: now_utc_string(),
            sections_found: extraction.sections_found,
            provenance: extraction.provenance,
            report: extraction.report,
        },
    )?;

    let chart_inputs_path = output_dir.join(format!("chart_inputs_{module}_{safe_client}.json"));
    write_json_pretty(&chart_inputs_path, &extraction.chart_inputs)?;

    info!(module, client, path = %output_path.display(), "wrote report data");

    Ok(ModuleRunEntry {
        module: module.to_string(),
        status: "completed".to_string(),
        sources: source_set.sources,
        merged_text_path: Some(merged.path.display().to_string()),
        output_path: Some(output_path.display().to_string()),
        debug_path: Some(debug_path.display().to_string()),
        chart_inputs_path: Some(chart_inputs_path.display().to_string()),
        failure_reason: None,
    })
}

fn collect_sources(
    parser: &dyn ReportParser,
    config: &ClientConfig,
    args: &RunArgs,
    warnings: &mut Vec<String>,
) -> Result<SourceSet> {
    let module = parser.module_id();
    let client = config.client_name.as_str();
    let dir = data_directory(&args.work_dir, &config.data_directory).join(parser.source_subdir());

    let filenames = list_files(&dir, |name| parser.accepts_source(name))?;
    let candidates = match_client_files(client, &filenames);
    if candidates.is_empty() {
        return Err(EngineError::NotFound {
            client: client.to_string(),
            module: module.to_string(),
            dir,
        }
        .into());
    }

    let mut sources = Vec::with_capacity(candidates.len());
    let mut texts = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let path = dir.join(&candidate.filename);
        let sha256 = sha256_file(&path)?;
        let source = read_source_text(&path, &args.ocr_lang)
            .with_context(|| format!("failed to read text for {}", path.display()))?;
        if source.is_blank() {
            return Err(EngineError::StructuralFailure { path }.into());
        }
        info!(
            module,
            file = %candidate.filename,
            confidence = candidate.confidence.as_str(),
            origin = source.origin.as_str(),
            pages = source.page_count,
            "read source document"
        );
        warnings.extend(source.warnings);
        sources.push(SourceEntry {
            filename: candidate.filename,
            confidence: candidate.confidence,
            sha256,
            text_origin: source.origin.as_str().to_string(),
            page_count: source.page_count,
        });
        texts.push(source.text);
    }

    Ok(SourceSet {
        dir,
        sources,
        texts,
    })
}

/// Writes the merged text, then reads it back; the extractor only ever sees
/// what landed on disk.
fn merge_sources(texts: &[String], path: &Path) -> Result<MergedText> {
    write_text(path, &merge_documents(texts))?;
    let text = read_text_if_present(path)?.ok_or_else(|| EngineError::StructuralFailure {
        path: path.to_path_buf(),
    })?;

    Ok(MergedText {
        path: path.to_path_buf(),
        text,
    })
}

fn data_directory(work_dir: &Path, configured: &str) -> PathBuf {
    let configured = Path::new(configured);
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        work_dir.join(configured)
    }
}

fn render_run_command(args: &RunArgs) -> String {
    let mut command = vec![
        "rmm-report-extract".to_string(),
        "run".to_string(),
        "--config".to_string(),
        args.config.display().to_string(),
        "--work-dir".to_string(),
        args.work_dir.display().to_string(),
    ];
    for module in &args.modules {
        command.push("--module".to_string());
        command.push(module.clone());
    }
    command.push("--ocr-lang".to_string());
    command.push(args.ocr_lang.clone());

    command.join(" ")
}
