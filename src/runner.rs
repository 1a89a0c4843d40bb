use std::{cell::RefCell, process::Command};

use crate::errors::{ErrorLayer, Result, ToolError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The one seam through which we spawn external programs (`docker-compose`,
/// `nginx`, `chown`, ...), so the deployment logic can be exercised without
/// touching the machine.
pub trait CommandRunner {
    /// Run `program` with `args` to completion.  A non-zero exit status is an
    /// error whose message includes the program's stderr.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command_line = render_command_line(program, args);
        let span = trace_span!("run_command", command = %command_line);
        let _span_guard = span.enter();

        let output = match Command::new(program).args(args).output() {
            Ok(output) => output,
            Err(e) => {
                return Err(ToolError::sticky(
                    ErrorLayer::ExternalLayer,
                    format!("Problem spawning `{}`: {}", command_line, e),
                ));
            }
        };

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            return Err(ToolError::sticky(
                ErrorLayer::ExternalLayer,
                format!(
                    "`{}` failed with {}: {}",
                    command_line,
                    output.status,
                    result.stderr.trim()
                ),
            ));
        }

        trace!("command succeeded");
        Ok(result)
    }
}

pub fn render_command_line(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program];
    parts.extend_from_slice(args);
    parts.join(" ")
}

/// Records every invocation instead of running it, optionally failing for
/// chosen programs.  For tests.
#[derive(Debug, Default)]
pub struct RecordingCommandRunner {
    invocations: RefCell<Vec<Vec<String>>>,
    failing_programs: Vec<String>,
}

impl RecordingCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation of `program` fail.
    pub fn failing(mut self, program: &str) -> Self {
        self.failing_programs.push(program.to_string());
        self
    }

    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.borrow().clone()
    }

    /// Invocations rendered as shell-ish command lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(|argv| argv.join(" "))
            .collect()
    }
}

impl CommandRunner for RecordingCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut argv = vec![program.to_string()];
        argv.extend(args.iter().map(|a| a.to_string()));
        self.invocations.borrow_mut().push(argv);

        if self.failing_programs.iter().any(|p| p == program) {
            return Err(ToolError::sticky(
                ErrorLayer::ExternalLayer,
                format!("`{}` failed", render_command_line(program, args)),
            ));
        }
        Ok(CommandOutput::default())
    }
}
