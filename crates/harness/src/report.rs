#![forbid(unsafe_code)]

use crate::execution::{CaseOutcome, CaseResult};
use crate::suite::{HarnessError, SuiteReport};
use serde::Serialize;
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub const JUNIT_FILE: &str = "junit.xml";
pub const JSON_FILE: &str = "report.json";

pub fn write_reports(report: &SuiteReport, output_root: &Path) -> Result<(), HarnessError> {
    let junit = output_root.join(JUNIT_FILE);
    std::fs::write(&junit, to_junit(report))
        .map_err(|source| HarnessError::Report { path: junit, source })?;
    let json = output_root.join(JSON_FILE);
    let rendered = to_json(report).map_err(|err| HarnessError::Report {
        path: json.clone(),
        source: std::io::Error::other(err),
    })?;
    std::fs::write(&json, rendered).map_err(|source| HarnessError::Report { path: json, source })
}

/// Escapes markup and replaces characters XML 1.0 cannot carry (terminal
/// control codes in operator logs) with U+FFFD.
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => out.push('\u{fffd}'),
            _ => out.push(ch),
        }
    }
    out
}

pub fn to_junit(report: &SuiteReport) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<testsuites><testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\" time=\"{:.3}\" timestamp=\"{}\">\n",
        xml_escape(&report.suite_name),
        report.cases.len(),
        report.count("failed"),
        report.count("errored"),
        report.count("skipped"),
        report.duration.as_secs_f64(),
        xml_escape(&timestamp(report)),
    ));
    for case in &report.cases {
        out.push_str(&format!(
            "<testcase classname=\"{}\" name=\"{}\" time=\"{:.3}\">",
            xml_escape(&report.suite_name),
            xml_escape(&case.name),
            case.duration.as_secs_f64()
        ));
        match &case.outcome {
            CaseOutcome::Passed => {}
            CaseOutcome::Skipped { message } => {
                out.push_str(&format!("<skipped message=\"{}\"/>", xml_escape(message)));
            }
            CaseOutcome::Failed { message, details } => {
                out.push_str(&format!(
                    "<failure message=\"{}\">{}</failure>",
                    xml_escape(message),
                    xml_escape(&body(message, details))
                ));
            }
            CaseOutcome::Errored { message, details } => {
                out.push_str(&format!(
                    "<error message=\"{}\">{}</error>",
                    xml_escape(message),
                    xml_escape(&body(message, details))
                ));
            }
        }
        if !case.stdout.is_empty() {
            out.push_str(&format!("<system-out>{}</system-out>", xml_escape(&case.stdout)));
        }
        if !case.stderr.is_empty() {
            out.push_str(&format!("<system-err>{}</system-err>", xml_escape(&case.stderr)));
        }
        out.push_str("</testcase>\n");
    }
    out.push_str("</testsuite></testsuites>\n");
    out
}

fn body(message: &str, details: &[String]) -> String {
    if details.is_empty() {
        return message.to_string();
    }
    format!("{message}\n{}", details.join("\n"))
}

fn timestamp(report: &SuiteReport) -> String {
    report.started_at.format(&Rfc3339).unwrap_or_default()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    suite: &'a str,
    started_at: String,
    duration_seconds: f64,
    cancelled: bool,
    success: bool,
    tests: usize,
    failures: usize,
    errors: usize,
    skipped: usize,
    cases: Vec<JsonCase<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonCase<'a> {
    name: &'a str,
    path: String,
    status: &'static str,
    duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "no_details")]
    details: &'a [String],
    output_dir: String,
    stdout: &'a str,
    stderr: &'a str,
}

fn no_details(details: &&[String]) -> bool {
    details.is_empty()
}

impl<'a> From<&'a CaseResult> for JsonCase<'a> {
    fn from(case: &'a CaseResult) -> Self {
        Self {
            name: &case.name,
            path: case.relative_dir.to_string_lossy().into_owned(),
            status: case.outcome.status(),
            duration_seconds: case.duration.as_secs_f64(),
            message: case.outcome.message(),
            details: case.outcome.details(),
            output_dir: case.output_dir.to_string_lossy().into_owned(),
            stdout: &case.stdout,
            stderr: &case.stderr,
        }
    }
}

pub fn to_json(report: &SuiteReport) -> Result<String, serde_json::Error> {
    let doc = JsonReport {
        suite: &report.suite_name,
        started_at: timestamp(report),
        duration_seconds: report.duration.as_secs_f64(),
        cancelled: report.cancelled,
        success: report.is_success(),
        tests: report.cases.len(),
        failures: report.count("failed"),
        errors: report.count("errored"),
        skipped: report.count("skipped"),
        cases: report.cases.iter().map(JsonCase::from).collect(),
    };
    let mut out = serde_json::to_string_pretty(&doc)?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use time::macros::datetime;

    fn case(name: &str, outcome: CaseOutcome) -> CaseResult {
        CaseResult {
            name: name.to_string(),
            relative_dir: PathBuf::from(name),
            output_dir: PathBuf::from("/out").join(name),
            duration: Duration::from_millis(1500),
            outcome,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn report() -> SuiteReport {
        let mut failed = case(
            "diff <1>",
            CaseOutcome::failed("1 difference(s) from expected output", vec!["a & b".into()]),
        );
        failed.stderr = "boom\n".into();
        SuiteReport {
            suite_name: "apply-configuration".into(),
            started_at: datetime!(2024-01-02 03:04:05 UTC),
            duration: Duration::from_secs(3),
            cases: vec![
                case("ok", CaseOutcome::Passed),
                failed,
                case("broken", CaseOutcome::errored("invalid test directory", Vec::new())),
                case("later", CaseOutcome::Skipped { message: "cancelled".into() }),
            ],
            cancelled: true,
        }
    }

    #[test]
    fn junit_counts_and_escapes() {
        let xml = to_junit(&report());
        assert!(xml.contains(
            "<testsuite name=\"apply-configuration\" tests=\"4\" failures=\"1\" errors=\"1\" skipped=\"1\" time=\"3.000\" timestamp=\"2024-01-02T03:04:05Z\">"
        ));
        assert!(xml.contains("name=\"diff &lt;1&gt;\" time=\"1.500\""));
        assert!(xml.contains(
            "<failure message=\"1 difference(s) from expected output\">1 difference(s) from expected output\na &amp; b</failure>"
        ));
        assert!(xml.contains("<system-err>boom\n</system-err>"));
        assert!(xml.contains(
            "<error message=\"invalid test directory\">invalid test directory</error>"
        ));
        assert!(xml.contains("<skipped message=\"cancelled\"/>"));
        assert!(xml.ends_with("</testsuite></testsuites>\n"));
    }

    #[test]
    fn junit_replaces_terminal_control_codes() {
        let mut coloured = case("coloured", CaseOutcome::failed("exit\u{7}", Vec::new()));
        coloured.stderr = "\u{1b}[31mE1019 boom\u{1b}[0m\n\tat line 3\r\n".into();
        let mut report = report();
        report.cases = vec![coloured];

        let xml = to_junit(&report);
        assert!(
            !xml.chars()
                .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
        );
        assert!(xml.contains(
            "<system-err>\u{fffd}[31mE1019 boom\u{fffd}[0m\n\tat line 3\r\n</system-err>"
        ));
        assert!(xml.contains("<failure message=\"exit\u{fffd}\">"));
    }

    #[test]
    fn json_summary() {
        let rendered = to_json(&report()).expect("json");
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("parse");
        assert_eq!(value["tests"], 4);
        assert_eq!(value["success"], false);
        assert_eq!(value["cases"][0]["status"], "passed");
        assert!(value["cases"][0].get("message").is_none());
        assert_eq!(value["cases"][1]["details"][0], "a & b");
        assert_eq!(value["cases"][3]["message"], "cancelled");
    }

    #[test]
    fn reports_are_written_to_the_output_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_reports(&report(), dir.path()).expect("write");
        assert!(dir.path().join(JUNIT_FILE).is_file());
        assert!(dir.path().join(JSON_FILE).is_file());
    }
}
