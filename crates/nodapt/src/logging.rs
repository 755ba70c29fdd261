use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Log to stderr: everything from nodapt crates in debug mode, warnings and
/// errors otherwise. Stdout stays reserved for command output.
pub fn init_logging(debug_enabled: bool) {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .add_filter_allow_str("nodapt")
        .build();

    let _ = TermLogger::init(
        LevelFilter::Debug,
        config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    set_logging_enabled(debug_enabled);

    if debug_enabled {
        log::debug!("Debug logging enabled");
    }
}

pub fn set_logging_enabled(enabled: bool) {
    if enabled {
        log::set_max_level(LevelFilter::Debug);
    } else {
        log::set_max_level(LevelFilter::Warn);
    }
}
