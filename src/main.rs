use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use dtaread::concurrency::{seq_rw_marshall, Sender};
use dtaread::stata::error::Result as DtaResult;
use dtaread::stata::reader::{open_any, DtaReader, Observation};
use dtaread::stata::{Header, ValueLabelTable, Variable};

pub mod cli;
use crate::cli::Args;

const CHUNK: u64 = 10000;

type Out = csv::Writer<io::Stdout>;

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match dtaread(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_message(&args.infile, &e));
            ExitCode::FAILURE
        }
    }
}

fn failure_message(infile: &Path, e: &anyhow::Error) -> String {
    format!("{}: {e:#}", infile.display())
}

fn dtaread(args: &Args) -> anyhow::Result<()> {
    let reader = match args.release {
        Some(release) => DtaReader::open(&args.infile, release)?,
        None => open_any(&args.infile)?,
    };
    let mut out = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(io::stdout());

    if args.header {
        write_header(&mut out, reader.header())?;
    }
    if args.variables {
        write_variables(&mut out, reader.variables())?;
    }
    if args.labels {
        write_labels(&mut out, reader.variables())?;
    }
    let sections = args.header || args.variables || args.labels;
    if !sections || args.range.is_some() {
        let nobs = reader.header().nobs;
        let range = args.range.map_or((1, nobs), |r| r.resolve(nobs));
        let threads = match args.threads {
            Some(t) => t,
            None => std::thread::available_parallelism().map_or(1, usize::from),
        };
        write_observations(&mut out, &reader, range, threads)?;
    }
    out.flush()?;
    reader.close();
    Ok(())
}

fn write_header(out: &mut Out, h: &Header) -> anyhow::Result<()> {
    out.write_record(["release", h.release.to_string().as_str()])?;
    out.write_record(["byteorder", format!("{:?}", h.byteorder).as_str()])?;
    out.write_record(["nvars", h.nvars.to_string().as_str()])?;
    out.write_record(["nobs", h.nobs.to_string().as_str()])?;
    out.write_record(["label", h.data_label.as_str()])?;
    out.write_record(["timestamp", h.timestamp.as_str()])?;
    Ok(())
}

fn write_variables(out: &mut Out, vars: &[Variable]) -> anyhow::Result<()> {
    out.write_record(["name", "type", "format", "value_label", "label"])?;
    for v in vars {
        out.write_record([
            v.name.as_str(),
            v.type_code.to_string().as_str(),
            v.format.as_str(),
            v.value_label.as_str(),
            v.var_label.as_str(),
        ])?;
    }
    Ok(())
}

fn write_labels(out: &mut Out, vars: &[Variable]) -> anyhow::Result<()> {
    let tables: BTreeMap<&str, &Arc<ValueLabelTable>> = vars
        .iter()
        .filter_map(|v| v.dictionary.as_ref())
        .map(|d| (d.labelname.as_str(), d))
        .collect();
    out.write_record(["labelname", "value", "label"])?;
    for (name, table) in tables {
        let mut entries: Vec<(&String, &String)> = table.labels.iter().collect();
        entries.sort_by_key(|(k, _)| k.parse::<i64>().unwrap_or(i64::MAX));
        for (value, label) in entries {
            out.write_record([name, value.as_str(), label.as_str()])?;
        }
    }
    Ok(())
}

/// Decodes chunks of observations in parallel and writes them in order.
fn write_observations(
    out: &mut Out,
    reader: &DtaReader,
    (start, end): (u64, u64),
    threads: usize,
) -> anyhow::Result<()> {
    let names: Vec<&str> = reader.variables().iter().map(|v| v.name.as_str()).collect();
    out.write_record(&names)?;

    let view = reader.view();
    let mut tasks = Vec::new();
    let mut m = start;
    while m <= end {
        let n = m.saturating_add(CHUNK - 1).min(end);
        tasks.push(move |s: Sender<DtaResult<Vec<Observation>>>| {
            move || {
                let _ = s.send(view.observations(m, n));
            }
        });
        match n.checked_add(1) {
            Some(next) => m = next,
            None => break,
        }
    }
    let mut writer = |chunk: DtaResult<Vec<Observation>>| -> anyhow::Result<()> {
        for obs in chunk? {
            out.write_record(&obs)?;
        }
        Ok(())
    };
    seq_rw_marshall(tasks.into_iter(), &mut writer, threads)
}
