//! Terminal styling and logging setup for the `sbsim` binary.

use clap::builder::styling::{AnsiColor, Color, Style};

/// Cargo-like terminal color style for clap's help output.
pub fn styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::BrightGreen))))
        .header(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::BrightGreen))))
        .literal(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .invalid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .valid(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
}

/// Compact terminal logging, gated by `max_level`.
pub fn logging_setup(max_level: &'static tracing::Level) {
    use tracing_subscriber::{filter, prelude::*};

    let filter = filter::filter_fn(move |meta| meta.level() <= max_level);

    let terminal_log = tracing_subscriber::fmt::layer()
        .compact()
        .with_file(false)
        .with_target(false)
        .without_time()
        .with_thread_names(false)
        .with_filter(filter);

    tracing_subscriber::registry().with(terminal_log).init();
}
