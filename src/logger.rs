pub fn init(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Warn)
        .level_for("foodgram", level)
        .level_for("load_ingredients", level)
        .level_for("warp", level.min(log::LevelFilter::Info))
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}
