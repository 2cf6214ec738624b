use chrono::{SecondsFormat, Utc};
use fern::colors::{Color, ColoredLevelConfig};
use log::{Level, LevelFilter, SetLoggerError};

/// Install the process-wide logger: one line per record with an RFC 3339
/// timestamp, colored level and target. Dependencies log at `warn` and above;
/// this crate logs at `level`.
pub fn init_logging(level: Level) -> Result<(), SetLoggerError> {
	let colors = ColoredLevelConfig::new()
		.error(Color::Red)
		.warn(Color::Yellow)
		.info(Color::Green)
		.debug(Color::Blue)
		.trace(Color::Magenta);

	fern::Dispatch::new()
		.format(move |out, message, record| {
			out.finish(format_args!(
				"{} {} [{}] {}",
				Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
				colors.color(record.level()),
				record.target(),
				message
			))
		})
		.level(LevelFilter::Warn)
		.level_for(env!("CARGO_CRATE_NAME"), level.to_level_filter())
		.chain(std::io::stderr())
		.apply()
}
