//! Test reporter - display results as they arrive

use crate::status::{Status, StatusDump, StatusEntry};
use colored::*;
use std::io::{self, Write};
use std::time::Duration;

/// Streaming reporter: one line (or dot) per result, then a summary
pub struct TestReporter<W: Write = io::Stdout> {
    out: W,
    /// Show a line per test instead of a dot
    verbose: bool,
    printed: usize,
}

impl TestReporter {
    /// Reporter printing to stdout
    pub fn new(verbose: bool) -> Self {
        Self::with_writer(io::stdout(), verbose)
    }
}

impl<W: Write> TestReporter<W> {
    pub fn with_writer(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            printed: 0,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print a single result
    pub fn record(&mut self, entry: &StatusEntry) -> io::Result<()> {
        self.printed += 1;

        if self.verbose {
            let label = match entry.status {
                Status::Passed => "PASS ".green().bold(),
                Status::Failed => "FAIL ".red().bold(),
                Status::Error => "ERROR".yellow().bold(),
                Status::Skipped => "SKIP ".dimmed(),
            };
            writeln!(
                self.out,
                "{} {} ({:.2?})",
                label,
                entry.name(),
                Duration::from_millis(entry.duration_ms as u64)
            )
        } else {
            let mark = match entry.status {
                Status::Passed => ".".green(),
                Status::Failed => "F".red().bold(),
                Status::Error => "E".yellow().bold(),
                Status::Skipped => "S".dimmed(),
            };
            write!(self.out, "{}", mark)?;
            self.out.flush()
        }
    }

    /// Print the summary and failure details
    pub fn finish(&mut self, dump: &StatusDump, elapsed: Duration) -> io::Result<()> {
        // Dots need a newline
        if !self.verbose && self.printed > 0 {
            writeln!(self.out)?;
        }

        writeln!(self.out)?;
        self.print_summary(dump, elapsed)?;
        self.print_failures(dump)
    }

    fn print_summary(&mut self, dump: &StatusDump, elapsed: Duration) -> io::Result<()> {
        writeln!(self.out, "{}", "─".repeat(50))?;

        let status = if dump.has_failures() {
            "FAILED".red().bold()
        } else {
            "PASSED".green().bold()
        };
        let errors = dump.errors();
        let failed = dump.failed - errors;

        writeln!(
            self.out,
            "Test result: {} | {} total, {} passed, {} failed, {} errors, {} skipped",
            status,
            dump.tests.to_string().bold(),
            dump.passed.to_string().green().bold(),
            if failed > 0 {
                failed.to_string().red().bold()
            } else {
                failed.to_string().normal()
            },
            if errors > 0 {
                errors.to_string().yellow().bold()
            } else {
                errors.to_string().normal()
            },
            dump.skipped,
        )?;
        writeln!(self.out, "Time: {:.2?}", elapsed)
    }

    fn print_failures(&mut self, dump: &StatusDump) -> io::Result<()> {
        let failures: Vec<_> = dump.results.iter().filter(|e| e.is_failure()).collect();

        if failures.is_empty() {
            return Ok(());
        }

        writeln!(self.out)?;
        writeln!(self.out, "{}", "Failures:".red().bold())?;
        writeln!(self.out)?;

        for entry in failures {
            let bullet = match entry.status {
                Status::Error => "●".yellow(),
                _ => "●".red(),
            };
            writeln!(self.out, "  {} {}", bullet, entry.name().bold())?;

            if let Some(failure) = &entry.failure {
                writeln!(self.out, "    {}", failure.name)?;
                for line in failure.message.lines() {
                    writeln!(self.out, "      {}", line.dimmed())?;
                }
                for link in &failure.links {
                    writeln!(self.out, "      see {}", link.underline())?;
                }
            }
            if let (Some(expected), Some(actual)) = (&entry.expected, &entry.actual) {
                writeln!(self.out, "      expected: {}", expected)?;
                writeln!(self.out, "      actual:   {}", actual)?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }
}
