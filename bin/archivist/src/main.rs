#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod cli;
pub mod commands;
pub mod flags;

fn main() {
    archivist_cli::backtrace::enable();

    use clap::Parser;
    if let Err(err) = cli::Cli::parse().run() {
        tracing::error!(target: "archivist", "{err:?}");
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
