extern crate clap;
use clap::*;

mod cmd_blockcon;

fn main() -> anyhow::Result<()> {
    let app = Command::new("blockcon")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`blockcon` - Reference-confidence block concordance")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("Increase logging verbosity, repeat for more"),
        )
        .subcommand(cmd_blockcon::concordance::make_subcommand())
        .subcommand(cmd_blockcon::merge::make_subcommand())
        .after_help(
            r###"Subcommands:

* concordance - Block and confidence histograms of a truth and an eval gVCF
* merge       - Sum histogram tables of the same kind

"###,
        );

    let matches = app.get_matches();

    let level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(level)
        .init();

    // Dispatch to the chosen subcommand
    match matches.subcommand() {
        Some(("concordance", sub_matches)) => cmd_blockcon::concordance::execute(sub_matches),
        Some(("merge", sub_matches)) => cmd_blockcon::merge::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
