//! Contract validation for plugin units
//!
//! Validates a plugin script against the capability sets: a pure syntax
//! parse, an isolated introspection pass per capability set, and a
//! content-level anti-pattern scan. Findings are ordered errors, then
//! warnings, then info; the verdict is VALID iff there are no errors.

use colored::*;
use eyre::{Context, Result, eyre};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::process::Command;

use super::Contract;
use crate::plugin::{self, PluginUnit};

/// Probe script run in a child shell: sources the unit in isolation and
/// reports which of the requested function names it defines. Top-level
/// failures in the unit are tolerated; only function presence matters.
const PROBE_SCRIPT: &str = r#"
unit="$1"
shift
source "$unit" >/dev/null 2>&1 || true
for fn in "$@"; do
    if declare -F "$fn" >/dev/null 2>&1; then
        printf '%s\n' "$fn"
    fi
done
"#;

/// Known anti-patterns detectable without executing the unit
struct AntiPattern {
    pattern: Regex,
    warning: &'static str,
}

static ANTI_PATTERNS: Lazy<Vec<AntiPattern>> = Lazy::new(|| {
    vec![
        // Color belongs to the renderer, derived from plugin state
        AntiPattern {
            pattern: Regex::new(r"@tickbar_[a-z0-9_]*accent_color").unwrap(),
            warning: "declares an accent color option; segment color is renderer-determined from plugin state",
        },
        // Escaped forms (\e[, \033[, \x1b[) and a raw ESC byte
        AntiPattern {
            pattern: Regex::new(r"\\(?:e|033|x1b)\[[0-9;]*m|\x1b\[").unwrap(),
            warning: "embeds terminal styling escape sequences; render output must be plain text",
        },
    ]
});

/// Validation findings for one plugin unit
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub plugin_name: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    fn new(plugin_name: &str) -> Self {
        Self {
            plugin_name: plugin_name.to_string(),
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Results of validating every unit in a directory
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub reports: Vec<ValidationReport>,
}

impl BatchSummary {
    pub fn all_valid(&self) -> bool {
        self.invalid == 0
    }
}

/// Validate a single plugin unit against the contract.
///
/// Structural failures (missing file, parse error) are fatal and surface as
/// `Err`; contract and hygiene violations land in the report.
pub fn validate(contract: &Contract, path: &Path) -> Result<ValidationReport> {
    let unit = PluginUnit::new(path);

    if !unit.exists() {
        return Err(eyre!("Plugin not found or unreadable: {}", path.display()));
    }

    check_syntax(&unit)?;

    let mut report = ValidationReport::new(&unit.name);

    // Each set is probed in its own isolated child shell
    let present_mandatory = probe_functions(&unit, contract.mandatory)?;
    for name in contract.mandatory {
        if !present_mandatory.contains(*name) {
            report.errors.push(format!("missing mandatory function: {}", name));
        }
    }

    let present_deprecated = probe_functions(&unit, contract.deprecated)?;
    for name in contract.deprecated {
        if present_deprecated.contains(*name) {
            report.warnings.push(format!("uses deprecated function: {}", name));
        }
    }

    let present_optional = probe_functions(&unit, contract.optional)?;
    for name in contract.optional {
        if !present_optional.contains(*name) {
            if let Some(suggestion) = contract.suggestion_for(name) {
                report.info.push(suggestion.to_string());
            }
        }
    }

    scan_anti_patterns(&unit, &mut report)?;

    Ok(report)
}

/// Validate every unit in a directory, never aborting on the first invalid
/// one. Units are evaluated in stable lexical order.
pub fn validate_all(contract: &Contract, dir: &Path) -> Result<BatchSummary> {
    let units = plugin::discover(dir)?;

    let mut summary = BatchSummary {
        total: 0,
        valid: 0,
        invalid: 0,
        reports: Vec::new(),
    };

    for unit in &units {
        summary.total += 1;
        match validate(contract, &unit.path) {
            Ok(report) => {
                if report.is_valid() {
                    summary.valid += 1;
                } else {
                    summary.invalid += 1;
                }
                summary.reports.push(report);
            }
            Err(e) => {
                // Structural failure counts as invalid but never stops the batch
                summary.invalid += 1;
                let mut report = ValidationReport::new(&unit.name);
                report.errors.push(e.to_string());
                summary.reports.push(report);
            }
        }
    }

    Ok(summary)
}

/// Pure parse via `bash -n`; never executes the unit's top level
fn check_syntax(unit: &PluginUnit) -> Result<()> {
    let output = Command::new("bash")
        .arg("-n")
        .arg(&unit.path)
        .output()
        .context("Failed to run bash for syntax check")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(eyre!("Syntax error in {}:\n{}", unit.path.display(), stderr.trim()));
    }

    Ok(())
}

/// Source the unit in an isolated child shell and return which of `names`
/// it defines. No state is shared with the validator's own process.
fn probe_functions(unit: &PluginUnit, names: &[&str]) -> Result<HashSet<String>> {
    if names.is_empty() {
        return Ok(HashSet::new());
    }

    let output = Command::new("bash")
        .arg("-c")
        .arg(PROBE_SCRIPT)
        .arg("tickbar-probe")
        .arg(&unit.path)
        .args(names)
        .output()
        .with_context(|| format!("Failed to probe functions in {}", unit.path.display()))?;

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

/// Content-level scan; requires no execution
fn scan_anti_patterns(unit: &PluginUnit, report: &mut ValidationReport) -> Result<()> {
    let content = fs::read_to_string(&unit.path)
        .with_context(|| format!("Failed to read plugin source: {}", unit.path.display()))?;

    for anti in ANTI_PATTERNS.iter() {
        if anti.pattern.is_match(&content) {
            report.warnings.push(anti.warning.to_string());
        }
    }

    Ok(())
}

/// Print a report to the terminal, findings ordered by severity
pub fn print_report(report: &ValidationReport) {
    println!("Validating plugin: {}\n", report.plugin_name.cyan().bold());

    for error in &report.errors {
        println!("  {} {}", "ERROR:".red().bold(), error);
    }
    for warning in &report.warnings {
        println!("  {} {}", "WARNING:".yellow().bold(), warning);
    }
    for info in &report.info {
        println!("  {} {}", "INFO:".blue(), info.dimmed());
    }

    if report.errors.is_empty() && report.warnings.is_empty() && report.info.is_empty() {
        println!("  {} no findings", "✓".green());
    }

    println!();
    if report.is_valid() {
        println!("Verdict: {}", "VALID".green().bold());
    } else {
        println!("Verdict: {}", "INVALID".red().bold());
    }
}

/// Print a batch summary in the `Total: n, Valid: n, Invalid: n` form
pub fn print_batch_summary(summary: &BatchSummary) {
    for report in &summary.reports {
        print_report(report);
        println!();
    }

    println!(
        "Total: {}, Valid: {}, Invalid: {}",
        summary.total,
        summary.valid.to_string().green(),
        summary.invalid.to_string().red()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const CONFORMING_PLUGIN: &str = r#"#!/usr/bin/env bash
plugin_render() { echo "ok"; }
plugin_interval() { echo 5; }
plugin_options() { echo "@tickbar_test_enabled"; }
plugin_health() { echo "good"; }
plugin_click() { :; }
"#;

    const MINIMAL_PLUGIN: &str = r#"#!/usr/bin/env bash
plugin_render() { echo "ok"; }
plugin_interval() { echo 5; }
"#;

    fn write_plugin(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_conforming_plugin_is_valid() {
        let temp = tempdir().unwrap();
        let path = write_plugin(temp.path(), "battery.sh", CONFORMING_PLUGIN);

        let report = validate(&Contract::standard(), &path).unwrap();
        assert!(report.is_valid());
        assert!(report.errors.is_empty());
        assert!(report.info.is_empty());
    }

    #[test]
    fn test_missing_mandatory_function_is_error() {
        let temp = tempdir().unwrap();
        let path = write_plugin(
            temp.path(),
            "broken.sh",
            "#!/usr/bin/env bash\nplugin_render() { echo hi; }\n",
        );

        let report = validate(&Contract::standard(), &path).unwrap();
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("plugin_interval")));
    }

    #[test]
    fn test_deprecated_function_is_warning_not_error() {
        let temp = tempdir().unwrap();
        let content = format!("{}plugin_color() {{ echo red; }}\n", MINIMAL_PLUGIN);
        let path = write_plugin(temp.path(), "old.sh", &content);

        let report = validate(&Contract::standard(), &path).unwrap();
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.contains("plugin_color")));
    }

    #[test]
    fn test_absent_optional_yields_suggestions() {
        let temp = tempdir().unwrap();
        let path = write_plugin(temp.path(), "minimal.sh", MINIMAL_PLUGIN);

        let report = validate(&Contract::standard(), &path).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.info.len(), 3);
        assert!(report.info.iter().any(|i| i.contains("plugin_options")));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = validate(&Contract::standard(), Path::new("/nonexistent/plugin.sh"));
        assert!(result.is_err());
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let temp = tempdir().unwrap();
        let path = write_plugin(temp.path(), "bad.sh", "plugin_render() {\n");

        let result = validate(&Contract::standard(), &path);
        assert!(result.is_err());
    }

    #[test]
    fn test_syntax_check_does_not_execute_top_level() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join("executed");
        let content = format!(
            "#!/usr/bin/env bash\ntouch {}\nplugin_render() {{ :; }}\nplugin_interval() {{ :; }}\n",
            marker.display()
        );
        let path = write_plugin(temp.path(), "side.sh", &content);

        check_syntax(&PluginUnit::new(&path)).unwrap();
        assert!(!marker.exists());
    }

    #[test]
    fn test_accent_color_option_flagged() {
        let temp = tempdir().unwrap();
        let content = format!("{}color=$(get_option @tickbar_net_accent_color red)\n", MINIMAL_PLUGIN);
        let path = write_plugin(temp.path(), "net.sh", &content);

        let report = validate(&Contract::standard(), &path).unwrap();
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.contains("accent color")));
    }

    #[test]
    fn test_escape_sequences_flagged() {
        let temp = tempdir().unwrap();
        let content = format!("{}echo -e \"\\033[31mred\\033[0m\"\n", MINIMAL_PLUGIN);
        let path = write_plugin(temp.path(), "fancy.sh", &content);

        let report = validate(&Contract::standard(), &path).unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("escape sequences")));
    }

    #[test]
    fn test_batch_evaluates_all_units() {
        let temp = tempdir().unwrap();
        write_plugin(temp.path(), "a-broken.sh", "#!/usr/bin/env bash\n");
        write_plugin(temp.path(), "b-good.sh", MINIMAL_PLUGIN);
        write_plugin(temp.path(), "c-good.sh", CONFORMING_PLUGIN);

        let summary = validate_all(&Contract::standard(), temp.path()).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.valid, 2);
        assert_eq!(summary.invalid, 1);
        assert!(!summary.all_valid());
        // the invalid first unit did not stop the batch
        assert_eq!(summary.reports.len(), 3);
    }

    #[test]
    fn test_batch_empty_directory_succeeds() {
        let temp = tempdir().unwrap();
        let summary = validate_all(&Contract::standard(), temp.path()).unwrap();
        assert_eq!(summary.total, 0);
        assert!(summary.all_valid());
    }
}
