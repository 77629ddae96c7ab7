/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2025 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Helpers shared by our command-line programs: config file bootstrap,
//! config/argument merging and logger setup.
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

use log::info;
use serde::de::DeserializeOwned;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use structopt::StructOpt;
use structopt_toml::StructOptToml;

use super::path::{expand_path, get_config_path};
use crate::{Error, Result};

/// Write the bundled default config to `path` if nothing is there yet.
/// Returns `true` if a new file was created.
pub fn spawn_config(path: &Path, contents: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false)
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    file.write_all(contents)?;
    println!("Config file created in {path:?}. Please review it and adjust to your setup.");
    Ok(true)
}

/// Parse command-line arguments, using the TOML config file as the source
/// of defaults. Arguments given on the command line take precedence.
pub fn parse_args_with_config<T>(
    config: Option<String>,
    config_file: &str,
    config_contents: &str,
) -> Result<T>
where
    T: StructOpt + StructOptToml + DeserializeOwned,
{
    let config_path = get_config_path(config, config_file)?;
    spawn_config(&config_path, config_contents.as_bytes())?;

    let toml = fs::read_to_string(&config_path)?;
    match T::from_args_with_toml(&toml) {
        Ok(args) => Ok(args),
        Err(e) => {
            eprintln!("Failed parsing config file {config_path:?}: {e}");
            Err(Error::ConfigInvalid)
        }
    }
}

/// Translate a `-v` count into a log level and a logger configuration.
pub fn log_config(verbosity: u8) -> (LevelFilter, simplelog::Config) {
    let lvl = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = ConfigBuilder::new();
    builder.set_target_level(LevelFilter::Error).set_location_level(LevelFilter::Off);

    // The HTTP stack is chatty, keep it out unless tracing.
    if lvl < LevelFilter::Trace {
        builder.add_filter_ignore_str("hyper").add_filter_ignore_str("reqwest");
    }

    (lvl, builder.build())
}

/// Initialize the global logger. Logs go to the terminal, and are
/// additionally appended to `log_file` if one is given.
pub fn init_logger(verbosity: u8, log_file: Option<&str>) -> Result<()> {
    let (lvl, cfg) = log_config(verbosity);

    let mut loggers: Vec<Box<dyn SharedLogger>> =
        vec![TermLogger::new(lvl, cfg.clone(), TerminalMode::Mixed, ColorChoice::Auto)];

    if let Some(log_file) = log_file {
        let log_path = expand_path(log_file)?;
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new().create(true).append(true).open(&log_path)?;
        loggers.push(WriteLogger::new(lvl, cfg, file));
    }

    CombinedLogger::init(loggers)?;
    info!(target: "util::cli", "Logger initialized at level {lvl}");
    Ok(())
}
