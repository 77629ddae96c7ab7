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

//! Wallet/Session Provider: which account we act as, and on which chain.
use log::{info, warn};

use ethers::{types::Address, utils::to_checksum};

use crate::{
    error::{DaoError, DaoResult},
    gateway::WalletProvider,
};

/// Connection state as exposed by the wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    address: Option<Address>,
    connected: bool,
    chain_id: Option<u64>,
}

impl Session {
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Ask `wallet` for its accounts and pick the one to act as.
    /// `preferred` must be among the exposed accounts if given, otherwise
    /// the first one is used. If `expected_chain` is given, the wallet
    /// has to be on that chain.
    pub async fn connect(
        wallet: &dyn WalletProvider,
        preferred: Option<Address>,
        expected_chain: Option<u64>,
    ) -> DaoResult<Self> {
        let chain_id = wallet.chain_id().await?;
        if let Some(expected) = expected_chain {
            if chain_id != expected {
                return Err(DaoError::WrongChain { expected, actual: chain_id })
            }
        }

        let accounts = wallet.request_accounts().await?;
        let address = match preferred {
            Some(p) if accounts.contains(&p) => p,
            Some(p) => {
                warn!(target: "daoctl::session", "Account {p:?} is not exposed by the wallet");
                return Err(DaoError::NotConnected)
            }
            None => match accounts.first() {
                Some(a) => *a,
                None => return Err(DaoError::NotConnected),
            },
        };

        info!(
            target: "daoctl::session",
            "Connected as {} on chain {chain_id}", to_checksum(&address, None),
        );
        Ok(Self { address: Some(address), connected: true, chain_id: Some(chain_id) })
    }

    pub fn disconnect(&mut self) {
        *self = Self::disconnected();
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// The connected account, or [`DaoError::NotConnected`].
    pub fn require_address(&self) -> DaoResult<Address> {
        match (self.connected, self.address) {
            (true, Some(a)) => Ok(a),
            _ => Err(DaoError::NotConnected),
        }
    }
}
