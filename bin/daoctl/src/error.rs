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

use ethers::types::TxHash;

use devsdao::Error;

/// Result type used throughout the client
pub type DaoResult<T> = std::result::Result<T, DaoError>;

/// EIP-1193 provider error codes
const USER_REJECTED: i64 = 4001;
const UNAUTHORIZED: i64 = 4100;
const DISCONNECTED: i64 = 4900;
const CHAIN_DISCONNECTED: i64 = 4901;

/// Everything that can go wrong while talking to the DAO.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DaoError {
    // Session errors
    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Connected to chain {actual}, but expected chain {expected}")]
    WrongChain { expected: u64, actual: u64 },

    // Gateway errors
    #[error("Failed reading {function}: {source}")]
    Read { function: String, source: Error },

    #[error("Failed sending {function}: {source}")]
    Write { function: String, source: Error },

    #[error("Request was rejected in the wallet")]
    UserRejected,

    #[error("Transaction {0:?} reverted")]
    Reverted(TxHash),

    #[error("Transaction {0:?} was dropped by the node")]
    Dropped(TxHash),

    #[error("Transaction {0:?} was not mined in time, it may still confirm later")]
    ConfirmationTimeout(TxHash),

    // Client-side preconditions
    #[error("Another action is still waiting for its transaction")]
    ActionInProgress,

    #[error("Only the DAO owner can withdraw its funds")]
    NotOwner,

    #[error("You do not own any CryptoDevs NFTs, you cannot create or vote on proposals")]
    NoNfts,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Lib(#[from] Error),
}

impl DaoError {
    /// Classify a failed read of `function`.
    pub fn read(function: &str, source: Error) -> Self {
        wallet_error(&source).unwrap_or(Self::Read { function: function.to_string(), source })
    }

    /// Classify a failed transaction submission of `function`.
    pub fn write(function: &str, source: Error) -> Self {
        wallet_error(&source).unwrap_or(Self::Write { function: function.to_string(), source })
    }

    /// `true` when the user cancelled the action, as opposed to a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::UserRejected)
    }
}

/// Map the wallet provider error codes onto the session taxonomy.
fn wallet_error(err: &Error) -> Option<DaoError> {
    let Error::JsonRpcError(code, _) = err else { return None };

    match *code {
        USER_REJECTED => Some(DaoError::UserRejected),
        UNAUTHORIZED | DISCONNECTED | CHAIN_DISCONNECTED => Some(DaoError::NotConnected),
        _ => None,
    }
}
