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

/// Error codes
pub mod error;

/// Wallet/Session Provider
pub mod session;

/// Contract Gateway trait and its JSON-RPC implementation
pub mod gateway;

/// DAO and NFT contract bindings
pub mod contract;

/// Proposal View Model and fetch sequence
pub mod proposal;

/// Tab/View state machine
pub mod view;

/// Action dispatch and the loading flag
pub mod dispatch;

/// UI Controller, the application context
pub mod controller;

/// CLI utility functions
pub mod cli_util;

/// Interactive shell
pub mod interactive;

#[cfg(test)]
pub(crate) mod tests {
    use std::{collections::HashSet, sync::Mutex, time::Duration};

    use async_trait::async_trait;
    use ethers::{
        abi::{self, AbiDecode, Token},
        types::{Address, Bytes, TransactionReceipt, TxHash, H160, U256, U64},
    };

    use devsdao::Error;

    use crate::{
        contract::{BalanceOfCall, CryptoDevsDaoCalls, DaoContract},
        controller::{Controller, FetchSettings},
        error::{DaoError, DaoResult},
        gateway::{ContractGateway, WalletProvider},
    };

    pub const DAO: Address = H160([0xda; 20]);
    pub const NFT: Address = H160([0x4f; 20]);

    /// DAO owner, holds two NFTs.
    /// 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed
    pub const ALICE: Address = H160([
        0x5a, 0xae, 0xb6, 0x05, 0x3f, 0x3e, 0x94, 0xc9, 0xb9, 0xa0, 0x9f, 0x33, 0x66, 0x94, 0x35,
        0xe7, 0xef, 0x1b, 0xea, 0xed,
    ]);

    /// Holds no NFTs.
    pub const BOB: Address = H160([0xb0; 20]);

    /// A deadline far in the future.
    pub const FUTURE: u64 = 4_000_000_000;

    pub fn proposal_tokens(
        nft_token_id: u64,
        deadline: u64,
        yay: u32,
        nay: u32,
        executed: bool,
    ) -> Vec<Token> {
        vec![
            Token::Uint(nft_token_id.into()),
            Token::Uint(deadline.into()),
            Token::Uint(yay.into()),
            Token::Uint(nay.into()),
            Token::Bool(executed),
        ]
    }

    #[derive(Default)]
    struct MockState {
        proposals: u64,
        failing: HashSet<u64>,
        reads: Vec<u64>,
        writes: Vec<(Address, CryptoDevsDaoCalls)>,
        write_error: Option<DaoError>,
        confirm_error: Option<DaoError>,
        confirm_delay: Duration,
        reject_accounts: bool,
    }

    /// In-memory DAO. Proposal `i` buys NFT `100 + i`, has `i` YAY votes
    /// and its deadline in the future.
    #[derive(Default)]
    pub struct MockGateway {
        state: Mutex<MockState>,
    }

    impl MockGateway {
        pub fn with_proposals(n: u64) -> Self {
            let gw = Self::default();
            gw.state.lock().unwrap().proposals = n;
            gw
        }

        pub fn contract(&self) -> DaoContract<'_> {
            DaoContract::new(self, DAO, NFT)
        }

        pub fn fail_proposal(&self, id: u64) {
            self.state.lock().unwrap().failing.insert(id);
        }

        pub fn fail_writes(&self, err: DaoError) {
            self.state.lock().unwrap().write_error = Some(err);
        }

        pub fn clear_write_failure(&self) {
            self.state.lock().unwrap().write_error = None;
        }

        pub fn fail_confirmations(&self, err: DaoError) {
            self.state.lock().unwrap().confirm_error = Some(err);
        }

        pub fn delay_confirmations(&self, delay: Duration) {
            self.state.lock().unwrap().confirm_delay = delay;
        }

        pub fn reject_accounts(&self) {
            self.state.lock().unwrap().reject_accounts = true;
        }

        /// IDs passed to `proposals(id)`, in call order.
        pub fn proposal_reads(&self) -> Vec<u64> {
            self.state.lock().unwrap().reads.clone()
        }

        /// Decoded DAO calls sent as transactions, with their sender.
        pub fn writes(&self) -> Vec<(Address, CryptoDevsDaoCalls)> {
            self.state.lock().unwrap().writes.clone()
        }
    }

    fn reverted(function: &str) -> DaoError {
        DaoError::read(function, Error::JsonRpcError(3, "execution reverted".to_string()))
    }

    #[async_trait]
    impl ContractGateway for MockGateway {
        async fn read(&self, contract: Address, function: &str, data: Bytes) -> DaoResult<Bytes> {
            let mut state = self.state.lock().unwrap();

            let tokens = if contract == NFT {
                let call = BalanceOfCall::decode(&data).unwrap();
                let balance: u32 = if call.owner == ALICE { 2 } else { 0 };
                vec![Token::Uint(balance.into())]
            } else {
                match CryptoDevsDaoCalls::decode(&data).unwrap() {
                    CryptoDevsDaoCalls::Owner(_) => vec![Token::Address(ALICE)],
                    CryptoDevsDaoCalls::NumProposals(_) => {
                        vec![Token::Uint(state.proposals.into())]
                    }
                    CryptoDevsDaoCalls::Proposals(call) => {
                        let id = call.proposal_index.as_u64();
                        state.reads.push(id);
                        if id >= state.proposals || state.failing.contains(&id) {
                            return Err(reverted(function))
                        }
                        proposal_tokens(100 + id, FUTURE, id as u32, 0, false)
                    }
                    _ => return Err(reverted(function)),
                }
            };

            Ok(abi::encode(&tokens).into())
        }

        async fn write(
            &self,
            from: Address,
            _contract: Address,
            _function: &str,
            data: Bytes,
        ) -> DaoResult<TxHash> {
            let mut state = self.state.lock().unwrap();
            if let Some(e) = state.write_error.clone() {
                return Err(e)
            }
            state.writes.push((from, CryptoDevsDaoCalls::decode(&data).unwrap()));
            Ok(TxHash::repeat_byte(state.writes.len() as u8))
        }

        async fn await_confirmation(&self, tx: TxHash) -> DaoResult<TransactionReceipt> {
            let (delay, error) = {
                let state = self.state.lock().unwrap();
                (state.confirm_delay, state.confirm_error.clone())
            };

            if !delay.is_zero() {
                smol::Timer::after(delay).await;
            }

            if let Some(e) = error {
                return Err(e)
            }

            Ok(TransactionReceipt {
                transaction_hash: tx,
                block_number: Some(U64::from(1)),
                status: Some(U64::from(1)),
                ..Default::default()
            })
        }

        async fn balance(&self, _address: Address) -> DaoResult<U256> {
            Ok(U256::from(1_500_000_000_000_000_000u64))
        }
    }

    #[async_trait]
    impl WalletProvider for MockGateway {
        async fn request_accounts(&self) -> DaoResult<Vec<Address>> {
            if self.state.lock().unwrap().reject_accounts {
                return Err(DaoError::UserRejected)
            }
            Ok(vec![ALICE, BOB])
        }

        async fn chain_id(&self) -> DaoResult<u64> {
            Ok(11155111)
        }
    }

    /// A controller over `gw`, connected as `account` (or the first account).
    pub fn connected(gw: MockGateway, account: Option<Address>) -> Controller<MockGateway> {
        let mut ctl = Controller::new(gw, DAO, NFT, FetchSettings::default());
        smol::block_on(ctl.connect(account, None)).unwrap();
        ctl
    }
}
