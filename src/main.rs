use std::fs::File;
use std::io::{stdout, BufWriter, Write};

use clap::Parser;
use rating_rbm::dataset::Dataset;
use rating_rbm::helpers::tracing::init as init_tracing;
use rating_rbm::metrics::Stopwatch;
use rating_rbm::opts::{self, Opts};
use rating_rbm::prelude::*;
use rating_rbm::trainer::{Trainer, TracingReporter, TrainingOutcome};

fn main() -> Result {
    let opts = Opts::parse();
    init_tracing()?;
    info!(version = opts::version(), "starting…");

    let dataset = Dataset::load(&opts.dataset)?;
    let outcome = {
        let _stopwatch = Stopwatch::new("trained");
        Trainer::new(&dataset, opts.hyperparameters.clone().into())?.train(&mut TracingReporter)?
    };
    write_outcome(&opts, &outcome)?;

    info!("finished");
    Ok(())
}

#[instrument(skip_all, fields(output = ?opts.output))]
fn write_outcome(opts: &Opts, outcome: &TrainingOutcome) -> Result {
    let writer: Box<dyn Write> = match &opts.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("failed to create `{}`", path.display()))?,
        ),
        None => Box::new(stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    if opts.pretty {
        serde_json::to_writer_pretty(&mut writer, outcome)?;
    } else {
        serde_json::to_writer(&mut writer, outcome)?;
    }
    writeln!(writer)?;
    writer.flush().context("failed to flush the output")?;
    Ok(())
}
