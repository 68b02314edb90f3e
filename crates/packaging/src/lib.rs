//! # geosim-packaging
//!
//! Build tooling for the `geo_sim_processing` QGIS plugin:
//!
//! - **archive**: version-stamped ZIP for the plugin repository
//! - **deploy**: link the working copy into the local QGIS profile
//! - **translation**: Qt `.ts`/`.qm` update, compile and clean
//! - **targets**: named targets (`test`, `deploy`, `transup`, `zip`, ...)
//!   driving external tools through a [`CommandRunner`]

pub mod archive;
pub mod config;
pub mod deploy;
pub mod error;
pub mod metadata;
pub mod runner;
pub mod targets;
pub mod translation;

pub use archive::build_archive;
pub use config::PackagingConfig;
pub use deploy::deploy;
pub use error::{PackagingError, Result};
pub use metadata::{archive_name, parse_version, read_version};
pub use runner::{CommandRunner, RecordingRunner, SystemRunner, ToolCommand, ToolStatus};
pub use targets::{run_target, Target, TargetContext, TargetOutcome};
