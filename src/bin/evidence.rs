// Command-line entry point: see `evidence_collector::cli` for the subcommands.

fn main() {
    evidence_collector::cli::run();
}
