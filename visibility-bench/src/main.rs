//! Command line entry point of the visibility harness.
//!
//! See [`visibility_bench::cli`] for the available subcommands.

fn main() -> anyhow::Result<()> {
    visibility_bench::cli::execute()
}
