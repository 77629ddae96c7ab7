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

// Hello developer. Please add your error to the according subsection
// that is commented, or make a new subsection. Keep it clean.

/// Main result type used throughout the codebase.
pub type Result<T> = std::result::Result<T, Error>;

/// General library errors used throughout the codebase.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    // ==============
    // Parsing errors
    // ==============
    #[error("Parse failed: {0}")]
    ParseFailed(&'static str),

    // ======================
    // Network-related errors
    // ======================
    #[error("Timeout Error")]
    TimeoutError,

    #[error("JSON-RPC error {0}: {1}")]
    JsonRpcError(i64, String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    // =========================
    // Ethereum-related errors
    // =========================
    #[error("ABI error: {0}")]
    AbiError(String),

    // ====================
    // Miscellaneous errors
    // ====================
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),

    #[error("SetLogger (log crate) failed: {0}")]
    SetLoggerError(String),

    #[error("Invalid config file detected")]
    ConfigInvalid,

    #[error("System clock went backwards")]
    BackwardsTime(std::time::SystemTimeError),

    #[error("{0}")]
    Custom(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.kind())
    }
}

impl From<std::time::SystemTimeError> for Error {
    fn from(err: std::time::SystemTimeError) -> Self {
        Self::BackwardsTime(err)
    }
}

impl From<log::SetLoggerError> for Error {
    fn from(err: log::SetLoggerError) -> Self {
        Self::SetLoggerError(err.to_string())
    }
}

#[cfg(feature = "ethers")]
impl From<ethers::providers::ProviderError> for Error {
    fn from(err: ethers::providers::ProviderError) -> Self {
        use ethers::providers::RpcError;

        // Keep the JSON-RPC error code so wallet rejections can be told apart
        match err.as_error_response() {
            Some(e) => Self::JsonRpcError(e.code, e.message.clone()),
            None => Self::ProviderError(err.to_string()),
        }
    }
}

#[cfg(feature = "ethers")]
impl From<ethers::abi::Error> for Error {
    fn from(err: ethers::abi::Error) -> Self {
        Self::AbiError(err.to_string())
    }
}
