use std::{convert::Infallible, time::Duration};

use tracing::{debug, info};

use crate::{
    point::{Point, Points},
    sink::{WriteOutcome, Writer},
    source::{DataSource, DataSourceResult},
};

pub struct Collector {
    source: Box<dyn DataSource>,

    writer: Writer,

    delay: Duration,

    verbose: bool,
}

impl Collector {
    pub fn new(source: Box<dyn DataSource>, writer: Writer, delay: Duration, verbose: bool) -> Self {
        Self {
            source,
            writer,
            delay,
            verbose,
        }
    }

    /// Collects one measurement and writes it. Only a data source failure is
    /// returned, write failures are handled by the writer.
    pub fn cycle(&self) -> DataSourceResult<WriteOutcome> {
        let measurement = self.source.collect()?;

        if self.verbose {
            info!(
                download = measurement.download,
                upload = measurement.upload,
                "measurement collected"
            );
        }

        let points = Points::from(Point::from(measurement));
        Ok(self.writer.write(&points))
    }

    /// Runs cycles forever, calling `sleep` with the configured delay after
    /// each one. Only returns when the data source fails.
    pub fn run(&self, mut sleep: impl FnMut(Duration)) -> DataSourceResult<Infallible> {
        loop {
            let outcome = self.cycle()?;
            debug!(?outcome, delay = self.delay.as_secs(), "cycle complete");

            sleep(self.delay);
        }
    }
}
