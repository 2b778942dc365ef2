//! Contains subcommands for the archivist binary.

mod archive;
pub use archive::ArchiveCommand;

mod download;
pub use download::DownloadCommand;

mod fund;
pub use fund::FundCommand;

mod verify;
pub use verify::VerifyArchiveCommand;
