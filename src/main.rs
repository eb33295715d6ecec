use main_error::MainResult;
mod collector;
mod config;
mod options;
mod point;
mod sink;
mod source;

use collector::Collector;
use options::Opts;
use sink::Writer;
use source::speedtest::SpeedTest;

fn main() -> MainResult {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse_from_args();
    let config = config::read(opts.config_source().as_ref())?;

    let database = sink::build(&config.database)?;
    let collector = Collector::new(
        Box::new(SpeedTest::new(config.speedtest)),
        Writer::new(database, config.verbose),
        config.delay,
        config.verbose,
    );

    match collector.run(std::thread::sleep)? {}
}
