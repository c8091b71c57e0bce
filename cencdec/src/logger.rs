use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter, Metadata, Record};

pub struct Logger;

pub fn init(filter: LevelFilter) {
    static LOGGER: Logger = Logger;

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(filter);
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if log::max_level() >= LevelFilter::Debug {
            eprintln!(
                "{} {} {}",
                label(record.level()),
                record.target().dimmed(),
                record.args()
            );
        } else if record.level() == Level::Info {
            eprintln!("{}", record.args());
        } else {
            eprintln!("{} {}", label(record.level()), record.args());
        }
    }

    fn flush(&self) {}
}

fn label(level: Level) -> ColoredString {
    match level {
        Level::Debug => "[DEBUG]".bold().blue(),
        Level::Error => "[ERROR]".bold().red(),
        Level::Info => "[INFO]".bold().green(),
        Level::Trace => "[TRACE]".bold().purple(),
        Level::Warn => "[WARN]".bold().yellow(),
    }
}
