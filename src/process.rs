//! Running external programs
//!
//! All programs are started from an argument list, never through a shell,
//! and block until they exit. A program that cannot be started or that
//! exits with a nonzero code is an error.
use std::ffi::OsString;
use std::io::{BufRead, BufReader, IsTerminal};
use std::path::Path;
use std::process::{Command, Stdio};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, info};

use crate::{DrugsetError, DrugsetResult};

/// How the output of an external program is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Print the output of the program to the terminal
    Show,
    /// Hide the standard output and show a spinner while the program runs,
    /// errors are still printed
    Progress,
    /// Hide the output
    Silent,
}

/// An external program and its arguments
#[derive(Debug, Clone)]
pub struct Task {
    program: OsString,
    args: Vec<OsString>,
}

impl Task {
    /// Constructs a new `Task` to run `program`
    pub fn new<S: Into<OsString>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Adds an argument
    #[must_use]
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds a path as argument
    #[must_use]
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().as_os_str())
    }

    /// The name of the program
    pub fn program(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// All arguments
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Returns the full command line, for logging only
    pub fn command_line(&self) -> String {
        let mut line = self.program();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Runs the program and blocks until it exits
    ///
    /// # Errors
    ///
    /// [`DrugsetError::ExternalProcess`] if the program can't be started
    /// or exits with a nonzero code
    pub fn run(&self, output: Output) -> DrugsetResult<()> {
        debug!("Running {}", self.command_line());
        let mut command = Command::new(&self.program);
        command.args(&self.args);

        let status = match output {
            Output::Show => command.status().map_err(|err| self.spawn_error(&err))?,
            Output::Silent => command
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map_err(|err| self.spawn_error(&err))?,
            Output::Progress => {
                let mut child = command
                    .stdout(Stdio::piped())
                    .spawn()
                    .map_err(|err| self.spawn_error(&err))?;
                let spinner = spinner(&self.program());
                let mut read_error = None;
                if let Some(stdout) = child.stdout.take() {
                    for line in BufReader::new(stdout).split(b'\n') {
                        match line {
                            Ok(line) => {
                                spinner.set_message(
                                    String::from_utf8_lossy(&line).trim_end().to_string(),
                                );
                                spinner.tick();
                            }
                            Err(err) => {
                                read_error = Some(err);
                                break;
                            }
                        }
                    }
                }
                spinner.finish_and_clear();
                // the child is always reaped, also when reading its output failed
                let status = child.wait()?;
                if let Some(err) = read_error {
                    return Err(err.into());
                }
                status
            }
        };

        if status.success() {
            info!("{} finished", self.program());
            Ok(())
        } else {
            Err(DrugsetError::ExternalProcess {
                program: self.program(),
                reason: format!("exited with {status}"),
            })
        }
    }

    fn spawn_error(&self, err: &std::io::Error) -> DrugsetError {
        DrugsetError::ExternalProcess {
            program: self.program(),
            reason: format!("unable to start: {err}"),
        }
    }
}

fn spinner(program: &str) -> ProgressBar {
    let draw_target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(10)
    } else {
        ProgressDrawTarget::hidden()
    };
    let pb = ProgressBar::with_draw_target(None, draw_target);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {prefix} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(program.to_string());
    pb
}
