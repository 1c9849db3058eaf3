use clap::*;
use log::info;
use std::io::Write;

use blockcon::libs::gvcf::GvcfReader;
use blockcon::libs::histogram::{BinKey, Histogram};
use blockcon::libs::join::JointRecords;
use blockcon::libs::record::JointRecord;
use blockcon::libs::shard::{split_by_contig, track_shards};
use blockcon::libs::tracker::{BlockTracker, ConcordanceStats};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("concordance")
        .about("Histograms of reference-confidence blocks in a truth and an eval gVCF")
        .after_help(
            r###"
Compares the reference-confidence blocks of two single-sample gVCFs.

Three tables are written:
* truth block histogram: length, confidence (GQ) and count of each truth block
* eval block histogram: the same for the eval blocks
* confidence concordance histogram: number of positions covered by a truth
  block and an eval block, per pair of confidences

Notes:
* Supports both plain text and gzipped (.gz) files
* Reads from stdin if input file is 'stdin'
* A block is a record whose first ALT allele is <NON_REF> or <*>
* Both files must be sorted by position; contig order follows the ##contig headers
* Records not passing FILTER are skipped unless --keep-filtered is given
* --parallel splits the work by contig

Examples:
1. Compare two gVCFs:
   blockcon concordance --truth truth.g.vcf.gz --eval eval.g.vcf.gz \
       --tbh truth.tsv --ebh eval.tsv --cch joint.tsv

2. One thread per contig, up to 8:
   blockcon concordance -t truth.g.vcf -e eval.g.vcf --tbh t.tsv --ebh e.tsv --cch j.tsv -p 8

"###,
        )
        .arg(
            Arg::new("truth")
                .long("truth")
                .short('t')
                .required(true)
                .num_args(1)
                .help("Truth gVCF"),
        )
        .arg(
            Arg::new("eval")
                .long("eval")
                .short('e')
                .required(true)
                .num_args(1)
                .help("Eval gVCF"),
        )
        .arg(
            Arg::new("truth_block_histogram")
                .long("truth-block-histogram")
                .visible_alias("tbh")
                .required(true)
                .num_args(1)
                .help("Output histogram of truth block lengths and confidences. [stdout] for screen"),
        )
        .arg(
            Arg::new("eval_block_histogram")
                .long("eval-block-histogram")
                .visible_alias("ebh")
                .required(true)
                .num_args(1)
                .help("Output histogram of eval block lengths and confidences. [stdout] for screen"),
        )
        .arg(
            Arg::new("confidence_concordance_histogram")
                .long("confidence-concordance-histogram")
                .visible_alias("cch")
                .required(true)
                .num_args(1)
                .help("Output histogram of overlapping positions per truth/eval confidence pair. [stdout] for screen"),
        )
        .arg(
            Arg::new("keep_filtered")
                .long("keep-filtered")
                .action(ArgAction::SetTrue)
                .help("Also use records that did not pass FILTER"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("1")
                .help("Number of threads for parallel processing"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let opt_truth = args.get_one::<String>("truth").unwrap();
    let opt_eval = args.get_one::<String>("eval").unwrap();
    let opt_keep_filtered = args.get_flag("keep_filtered");
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();

    //----------------------------
    // Ops
    //----------------------------
    let truth = GvcfReader::new(blockcon::reader(opt_truth)?)?.keep_filtered(opt_keep_filtered);
    let eval = GvcfReader::new(blockcon::reader(opt_eval)?)?.keep_filtered(opt_keep_filtered);

    let contigs: Vec<String> = truth
        .contigs()
        .iter()
        .chain(eval.contigs().iter())
        .cloned()
        .collect();
    let joint = JointRecords::new(truth, eval, &contigs);

    let stats = if opt_parallel <= 1 {
        let mut tracker = BlockTracker::new();
        for record in joint {
            tracker.process(&record?)?;
        }
        tracker.finish()
    } else {
        rayon::ThreadPoolBuilder::new()
            .num_threads(opt_parallel)
            .build_global()?;

        let records: Vec<JointRecord> = joint.collect::<anyhow::Result<_>>()?;
        let shards = split_by_contig(records)?;
        info!("{} contigs on {} threads", shards.len(), opt_parallel);
        track_shards(&shards)?
    };

    log_summary(&stats);

    //----------------------------
    // Output
    //----------------------------
    write_histogram(
        &stats.truth_blocks,
        args.get_one::<String>("truth_block_histogram").unwrap(),
    )?;
    write_histogram(
        &stats.eval_blocks,
        args.get_one::<String>("eval_block_histogram").unwrap(),
    )?;
    write_histogram(
        &stats.confidence_concordance,
        args.get_one::<String>("confidence_concordance_histogram")
            .unwrap(),
    )?;

    Ok(())
}

fn log_summary(stats: &ConcordanceStats) {
    info!(
        "Truth blocks: {}, eval blocks: {}, jointly covered positions: {}",
        stats.truth_blocks.total(),
        stats.eval_blocks.total(),
        stats.confidence_concordance.total()
    );
}

fn write_histogram<K: BinKey>(histogram: &Histogram<K>, output: &str) -> anyhow::Result<()> {
    let mut writer = blockcon::writer(output)?;
    histogram.write_tsv(&mut writer)?;
    writer.flush()?;
    Ok(())
}
