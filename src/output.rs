//! Rendering of command results.
//!
//! Every command produces one value. With `--json` it is wrapped in a
//! versioned envelope on stdout:
//!
//! ```text
//! { "schema_version": "taskdeck.v1", "command": "add", "status": "success",
//!   "data": { ... }, "warnings": [...], "next_steps": [...] }
//! ```
//!
//! Failures use the same envelope with `"status": "error"` and an `error`
//! object in place of `data`. Without `--json` the command's [`HumanOutput`]
//! is printed instead, and errors go to stderr with an optional hint.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, ErrorReport, Result};

pub const SCHEMA_VERSION: &str = "taskdeck.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text report: a header line followed by optional blocks
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, line: impl Into<String>) {
        self.details.push(line.into());
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn push_next_step(&mut self, step: impl Into<String>) {
        self.next_steps.push(step.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;

        let summary: Vec<String> = self
            .summary
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{key}: {value}")
                }
            })
            .collect();
        let blocks: [(&str, &[String]); 4] = [
            ("Summary", summary.as_slice()),
            ("Details", self.details.as_slice()),
            ("Warnings", self.warnings.as_slice()),
            ("Next steps", self.next_steps.as_slice()),
        ];

        for (title, lines) in blocks {
            if lines.is_empty() {
                continue;
            }
            write!(f, "\n\n{title}:")?;
            for line in lines {
                write!(f, "\n- {line}")?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome<'a, T: Serialize> {
    Data(&'a T),
    Error(ErrorReport),
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "no_lines")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "no_lines")]
    next_steps: &'a [String],
}

fn no_lines(lines: &&[String]) -> bool {
    lines.is_empty()
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let (warnings, next_steps) = match human {
            Some(human) => (human.warnings.as_slice(), human.next_steps.as_slice()),
            None => (&[][..], &[][..]),
        };
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            outcome: Outcome::Data(data),
            warnings,
            next_steps,
        });
    }

    if let Some(human) = human.filter(|_| !options.quiet) {
        println!("{human}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        return print_envelope::<()>(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            outcome: Outcome::Error(ErrorReport::from(err)),
            warnings: &[],
            next_steps: &next_steps,
        });
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// First non-flag argument, used to label error envelopes before clap has
/// parsed anything
pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if matches!(arg.as_str(), "--data-dir" | "--config") {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "td".to_string()
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::TaskNotFound(_) => vec!["td list".to_string()],
        Error::AmbiguousTaskId { input, .. } => {
            vec![format!("td list --search {input} --json  # copy the full id")]
        }
        Error::InvalidConfig(_) => vec!["fix config.toml then retry".to_string()],
        Error::LockFailed(_) => vec!["retry once other td processes finish".to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn command_name_skips_flags_and_their_values() {
        assert_eq!(infer_command_name(args(&["--json", "list"])), "list");
        assert_eq!(
            infer_command_name(args(&["--data-dir", "/tmp/x", "toggle", "abc"])),
            "toggle"
        );
        assert_eq!(infer_command_name(args(&["-q"])), "td");
    }

    #[test]
    fn human_output_lists_sections_in_order() {
        let mut human = HumanOutput::new("td stats");
        human.push_summary("total", "3");
        human.push_detail("In Progress: 1");
        human.push_warning("tasks were not saved");
        human.push_next_step("td list");

        let text = human.to_string();
        let summary = text.find("Summary:").unwrap();
        let details = text.find("Details:").unwrap();
        let warnings = text.find("Warnings:").unwrap();
        let next = text.find("Next steps:").unwrap();
        assert!(text.starts_with("td stats\n\nSummary:"));
        assert!(summary < details && details < warnings && warnings < next);
        assert!(text.contains("- total: 3"));
    }

    #[test]
    fn empty_blocks_are_omitted() {
        let mut human = HumanOutput::new("Task deleted");
        human.push_summary("ID", "task_1");
        assert_eq!(human.to_string(), "Task deleted\n\nSummary:\n- ID: task_1");
    }

    #[test]
    fn success_envelope_carries_data_and_skips_empty_lists() {
        let data = serde_json::json!({ "total": 2 });
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command: "stats",
            status: "success",
            outcome: Outcome::Data(&data),
            warnings: &[],
            next_steps: &["td list".to_string()],
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["schema_version"], "taskdeck.v1");
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["total"], 2);
        assert!(value.get("warnings").is_none());
        assert_eq!(value["next_steps"][0], "td list");
    }

    #[test]
    fn error_envelope_uses_error_report() {
        let err = Error::TaskNotFound("task_9".to_string());
        let envelope = Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command: "show",
            status: "error",
            outcome: Outcome::Error(ErrorReport::from(&err)),
            warnings: &[],
            next_steps: &error_next_steps(&err),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("data").is_none());
        assert_eq!(value["error"]["kind"], "task_not_found");
        assert_eq!(value["error"]["code"], 2);
        assert_eq!(value["error"]["details"]["id"], "task_9");
        assert_eq!(value["next_steps"][0], "td list");
    }
}
