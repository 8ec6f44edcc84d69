//! Translator that runs an external program
//!
//! Builds a command line from [`TranslatorConfig`], runs it to completion and
//! turns its stderr into diagnostics.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, trace};

use crate::config::TranslatorConfig;
use crate::module::traits::{Diagnostic, ModuleError, Severity, TranslateRequest, Translator};

/// Spawns a configured program for every translation
#[derive(Debug, Clone)]
pub struct ProcessTranslator {
    config: TranslatorConfig,
}

impl ProcessTranslator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Command for `request`:
    /// `program args.. <output_flag> <output> (<reference_flag> <ref>)* [debug_flag] sources..`
    pub fn command(&self, request: &TranslateRequest<'_>) -> Command {
        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args);
        command.arg(&self.config.output_flag).arg(request.output);
        for reference in request.references {
            command.arg(&self.config.reference_flag).arg(reference);
        }
        if request.debug_info {
            if let Some(flag) = &self.config.debug_flag {
                command.arg(flag);
            }
        }
        command.args(request.sources);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl Translator for ProcessTranslator {
    fn runtime_references(&self) -> Vec<PathBuf> {
        self.config.runtime_references.clone()
    }

    fn translate(&self, request: &TranslateRequest<'_>) -> Result<Vec<Diagnostic>, ModuleError> {
        let name = &request.module.unique_name;
        let mut command = self.command(request);
        debug!("Running translator for {}: {:?}", name, command);

        let output = match command.output() {
            Ok(output) => output,
            Err(e) => {
                return Ok(vec![Diagnostic::error(format!(
                    "failed to run translator {:?}: {}",
                    self.config.program, e
                ))])
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        trace!("Translator stderr for {}:\n{}", name, stderr);
        let mut diagnostics: Vec<Diagnostic> = stderr.lines().filter_map(parse_line).collect();

        if !output.status.success() && !diagnostics.iter().any(|d| d.is_error()) {
            diagnostics.push(Diagnostic::error(format!(
                "translator exited with {}",
                output.status
            )));
        }
        if output.status.success() && !request.output.exists() {
            diagnostics.push(Diagnostic::error(format!(
                "translator did not write {}",
                request.output.display()
            )));
        }

        Ok(diagnostics)
    }
}

/// Parse one stderr line
///
/// Accepts `error: msg`, `warning: msg` and the same prefixed by `path:`,
/// `path:line:` or `path:line:col:`. A bracketed code after the severity
/// (`error[E0425]:`) is allowed. Anything else is not a diagnostic.
pub fn parse_line(line: &str) -> Option<Diagnostic> {
    let line = line.trim();
    if let Some((severity, message)) = split_severity(line) {
        return Some(diagnostic(severity, message));
    }

    // first ": " followed by a severity marks the end of the location
    let mut search_from = 0;
    while let Some(offset) = line[search_from..].find(": ") {
        let split = search_from + offset;
        if let Some((severity, message)) = split_severity(&line[split + 2..]) {
            let (path, line_no, column) = parse_location(&line[..split]);
            return Some(diagnostic(severity, message).at(path, line_no, column));
        }
        search_from = split + 2;
    }
    None
}

fn diagnostic(severity: Severity, message: &str) -> Diagnostic {
    match severity {
        Severity::Error => Diagnostic::error(message),
        Severity::Warning => Diagnostic::warning(message),
    }
}

fn split_severity(text: &str) -> Option<(Severity, &str)> {
    let (severity, rest) = if let Some(rest) = text.strip_prefix("error") {
        (Severity::Error, rest)
    } else if let Some(rest) = text.strip_prefix("warning") {
        (Severity::Warning, rest)
    } else {
        return None;
    };

    let rest = match rest.strip_prefix('[') {
        Some(code) => &code[code.find(']')? + 1..],
        None => rest,
    };
    let message = rest.strip_prefix(':')?.trim();
    Some((severity, message))
}

/// Split `path[:line[:col]]`, peeling numeric suffixes off the right
fn parse_location(text: &str) -> (PathBuf, Option<u32>, Option<u32>) {
    let mut numbers = Vec::new();
    let mut path = text;
    while numbers.len() < 2 {
        match path.rsplit_once(':') {
            Some((head, tail)) => match tail.trim().parse::<u32>() {
                Ok(n) => {
                    numbers.push(n);
                    path = head;
                }
                Err(_) => break,
            },
            None => break,
        }
    }
    numbers.reverse();
    (
        Path::new(path).to_path_buf(),
        numbers.first().copied(),
        numbers.get(1).copied(),
    )
}
