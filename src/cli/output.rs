//! Handles all user-facing output for the CLI.
//!
//! Colors are applied through `termcolor`; every function takes the color
//! choice so output stays plain when piped or when `--no-color` is given.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::report::{OutputResult, Status};

use super::Verification;

pub fn color_choice(no_color: bool) -> ColorChoice {
    if no_color || !atty::is(atty::Stream::Stdout) {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Passed => Color::Green,
        Status::Failed => Color::Red,
        Status::Pending => Color::Yellow,
    }
}

/// Prints each row and a totals line.
pub fn print_summary(report: &OutputResult, choice: ColorChoice) {
    let mut stdout = StandardStream::stdout(choice);
    let _ = stdout.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(stdout, "{}", report.title);
    let _ = stdout.reset();

    for row in &report.tests {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(status_color(row.status))));
        let _ = write!(stdout, "{:<8}", row.status.as_str().to_uppercase());
        let _ = stdout.reset();
        let _ = writeln!(
            stdout,
            " {} ({} ms, {} evidence)",
            row.id,
            row.duration,
            row.evidence.len()
        );
    }

    let _ = writeln!(
        stdout,
        "\nTotal {}: {} passed, {} failed, {} pending",
        report.tests.len(),
        report.count(Status::Passed),
        report.count(Status::Failed),
        report.count(Status::Pending),
    );
}

pub fn print_verification(verification: &Verification, choice: ColorChoice) {
    let mut stdout = StandardStream::stdout(choice);
    for missing in &verification.missing {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
        let _ = write!(stdout, "MISSING");
        let _ = stdout.reset();
        let _ = writeln!(stdout, " {} [{}]", missing.resource, missing.test_id);
    }
    for orphan in &verification.orphans {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = write!(stdout, "UNREFERENCED");
        let _ = stdout.reset();
        let _ = writeln!(stdout, " {}", orphan.display());
    }
    let color = if verification.is_ok() {
        Color::Green
    } else {
        Color::Red
    };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(
        stdout,
        "{} resources checked, {} missing, {} unreferenced",
        verification.checked,
        verification.missing.len(),
        verification.orphans.len()
    );
    let _ = stdout.reset();
}
