use chrono::{DateTime, Utc};

/// Installs the global logger.
///
/// The level comes from `GATESIM_LOG` (`TRACE`, `DEBUG`, `INFO`, `WARN` or
/// `ERROR`, default `INFO`). Records go to the file named by
/// `GATESIM_LOG_FILE` if it is set, otherwise to stderr.
pub fn init_logging() -> anyhow::Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let now: DateTime<Utc> = Utc::now();
            out.finish(format_args!(
                "[{} {} {}] {}",
                now.format("%Y-%m-%dT%H:%M:%S%.fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level_filter(&std::env::var("GATESIM_LOG").unwrap_or_default()));

    dispatch = match std::env::var("GATESIM_LOG_FILE") {
        Ok(path) if !path.is_empty() => dispatch.chain(fern::log_file(path)?),
        _ => dispatch.chain(std::io::stderr()),
    };

    dispatch.apply().map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}

fn level_filter(level: &str) -> log::LevelFilter {
    match level.to_uppercase().as_str() {
        "TRACE" => log::LevelFilter::Trace,
        "DEBUG" => log::LevelFilter::Debug,
        "WARN" => log::LevelFilter::Warn,
        "ERROR" => log::LevelFilter::Error,
        "OFF" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

#[test]
fn level_names() {
    assert_eq!(level_filter("debug"), log::LevelFilter::Debug);
    assert_eq!(level_filter("TRACE"), log::LevelFilter::Trace);
    assert_eq!(level_filter(""), log::LevelFilter::Info);
    assert_eq!(level_filter("loud"), log::LevelFilter::Info);
}
