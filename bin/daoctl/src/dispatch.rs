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

//! Action dispatch: one write per action, awaited until mined, with a
//! loading flag that is held for the whole duration.
use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use log::{error, info, warn};
use ethers::types::{Address, TransactionReceipt, U256};

use crate::{
    contract::DaoContract,
    error::{DaoError, DaoResult},
    proposal::Vote,
};

/// State-changing DAO actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Create { nft_token_id: U256 },
    Vote { proposal_id: u64, vote: Vote },
    Execute { proposal_id: u64 },
    Withdraw,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { nft_token_id } => write!(f, "create proposal for NFT {nft_token_id}"),
            Self::Vote { proposal_id, vote } => write!(f, "vote {vote} on proposal {proposal_id}"),
            Self::Execute { proposal_id } => write!(f, "execute proposal {proposal_id}"),
            Self::Withdraw => write!(f, "withdraw DAO ETH"),
        }
    }
}

/// The UI loading flag. Only one action may hold it at a time.
#[derive(Debug, Default)]
pub struct LoadingFlag(AtomicBool);

impl LoadingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag, unless it is already set.
    pub fn try_acquire(&self) -> Option<LoadingGuard<'_>> {
        match self.0.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => Some(LoadingGuard(&self.0)),
            Err(_) => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears the loading flag when dropped.
pub struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Send `action` as `from` and wait for it to be mined.
/// Fails with [`DaoError::ActionInProgress`] if another action holds the flag.
pub async fn dispatch(
    contract: &DaoContract<'_>,
    loading: &LoadingFlag,
    from: Address,
    action: Action,
) -> DaoResult<TransactionReceipt> {
    let Some(_guard) = loading.try_acquire() else {
        warn!(target: "daoctl::dispatch", "Refusing to {action}, another action is in progress");
        return Err(DaoError::ActionInProgress)
    };

    info!(target: "daoctl::dispatch", "Trying to {action}");
    let res = send_and_confirm(contract, from, &action).await;

    match &res {
        Ok(receipt) => {
            info!(target: "daoctl::dispatch", "Done: {action} ({:?})", receipt.transaction_hash)
        }
        Err(e) if e.is_cancelled() => {
            warn!(target: "daoctl::dispatch", "Cancelled: {action}")
        }
        Err(e) => error!(target: "daoctl::dispatch", "Failed to {action}: {e}"),
    }

    res
}

async fn send_and_confirm(
    contract: &DaoContract<'_>,
    from: Address,
    action: &Action,
) -> DaoResult<TransactionReceipt> {
    let tx = match action {
        Action::Create { nft_token_id } => contract.create_proposal(from, *nft_token_id).await?,
        Action::Vote { proposal_id, vote } => {
            contract.vote_on_proposal(from, *proposal_id, *vote).await?
        }
        Action::Execute { proposal_id } => contract.execute_proposal(from, *proposal_id).await?,
        Action::Withdraw => contract.withdraw_ether(from).await?,
    };

    contract.await_confirmation(tx).await
}
