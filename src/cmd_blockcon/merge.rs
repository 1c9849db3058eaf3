use clap::*;
use log::info;
use std::io::{BufRead, Cursor, Read, Write};

use blockcon::libs::histogram::{BinKey, BlockKey, ConfidencePair, Histogram};

pub fn make_subcommand() -> Command {
    Command::new("merge")
        .about("Sum histogram tables of the same kind")
        .after_help(
            r###"
Adds up histogram tables written by `blockcon concordance`, e.g. the results
of separate runs over different contigs.

Notes:
* The kind of table is taken from the header of the first file
* All files must share that header
* Counts of identical keys are summed

Examples:
1. Merge per-chromosome confidence concordance tables:
   blockcon merge chr1.cch.tsv chr2.cch.tsv -o all.cch.tsv

2. Add a table from a pipe to one on disk:
   gzip -dc chr1.cch.tsv.gz | blockcon merge stdin chr2.cch.tsv

"###,
        )
        .arg(
            Arg::new("infiles")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Histogram tables to merge"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let infiles: Vec<&String> = args.get_many::<String>("infiles").unwrap().collect();
    let mut writer = blockcon::writer(args.get_one::<String>("outfile").unwrap())?;

    // Each input is opened once, so `stdin` works as any of them
    let mut reader = blockcon::reader(infiles[0])?;
    let header = first_line(&mut reader)?;
    let first = Cursor::new(format!("{}\n", header)).chain(reader);

    if header == Histogram::<BlockKey>::header() {
        merge_tables::<BlockKey>(first, &infiles, &mut writer)?;
    } else if header == Histogram::<ConfidencePair>::header() {
        merge_tables::<ConfidencePair>(first, &infiles, &mut writer)?;
    } else {
        anyhow::bail!("{}: not a histogram table", infiles[0]);
    }
    writer.flush()?;

    Ok(())
}

fn first_line(reader: &mut dyn BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    while reader.read_line(&mut line)? > 0 {
        if !line.trim().is_empty() {
            return Ok(line.trim_end().to_string());
        }
        line.clear();
    }
    Ok(String::new())
}

fn merge_tables<K: BinKey>(
    mut first: impl BufRead,
    infiles: &[&String],
    writer: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut merged: Histogram<K> =
        Histogram::read_tsv(&mut first).map_err(|e| anyhow::anyhow!("{}: {}", infiles[0], e))?;

    for infile in &infiles[1..] {
        let mut reader = blockcon::reader(infile)?;
        let histogram = Histogram::<K>::read_tsv(&mut reader)
            .map_err(|e| anyhow::anyhow!("{}: {}", infile, e))?;
        merged.merge(&histogram);
    }
    info!("Merged {} tables into {} bins", infiles.len(), merged.len());

    merged.write_tsv(writer)?;
    Ok(())
}
