//! `cmdroute check`: load everything and report what was found.

use cmdroute_commands::Registry;
use cmdroute_config::{validate, EngineConfig};

use crate::engine::LoadReport;
use crate::output::{note_info, note_success, note_warn, render_table};

pub fn run(config: &EngineConfig, registry: &Registry, report: &LoadReport) {
    let validation = validate(config);
    for warning in &validation.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }

    note_info(&format!("Categories: {}", registry.categories().join(" > ")));
    note_success(&format!(
        "Base registry {}: {} templates",
        report.base.display(),
        registry.len()
    ));
    for (path, summary) in &report.merged {
        note_success(&format!("Extension {}: {}", path.display(), summary));
    }
    for (path, reason) in &report.skipped {
        note_warn(&format!("Skipped extension {}: {}", path.display(), reason));
    }

    let dangling: Vec<Vec<String>> = registry
        .entries()
        .filter(|e| e.is_dangling())
        .map(|e| vec![e.template().to_string()])
        .collect();
    if !dangling.is_empty() {
        note_warn(&format!("{} templates have no handler", dangling.len()));
        print!("{}", render_table(&["Template"], &dangling));
    }

    let duplicates: Vec<Vec<String>> = registry
        .duplicates()
        .into_iter()
        .map(|d| vec![d.template, d.path])
        .collect();
    if !duplicates.is_empty() {
        note_warn(&format!(
            "{} registrations repeat their wildcard handler",
            duplicates.len()
        ));
        print!("{}", render_table(&["Template", "Context"], &duplicates));
    }

    let parameterized = registry.templates().filter(|t| t.has_parameters()).count();
    note_info(&format!(
        "{} handlers over {} templates ({} parameterized)",
        registry.handler_count(),
        registry.len(),
        parameterized
    ));
}
