//! Test modules for the downloader, sharing one prelude so individual
//! files can just `use super::*;`.

pub(crate) use crate::downloader::test_helpers::{SAMPLE_NZB, create_test_downloader};
use crate::config;
use crate::config::Config;
use crate::db;
use crate::types::{DownloadId, DownloadOptions, Event, Priority, Stage, Status};
use tempfile::tempdir;

mod control;
mod control_unit;
mod queue_processor;
mod queue_unit;
