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

//! Bindings of the CryptoDevs DAO and NFT contracts, and a typed facade
//! over a [`ContractGateway`] for calling them.
use ethers::{
    abi::{self, AbiEncode, ParamType, Token},
    contract::{abigen, EthCall},
    types::{Address, TransactionReceipt, TxHash, U256},
};

use devsdao::Error;

use crate::{
    error::{DaoError, DaoResult},
    gateway::ContractGateway,
    proposal::{Proposal, Vote},
};

// The vote is the contract's `Vote` enum: `YAY = 0`, `NAY = 1`.
abigen!(
    CryptoDevsDao,
    r#"[
        function owner() external view returns (address)
        function numProposals() external view returns (uint256)
        function proposals(uint256 proposalIndex) external view returns (uint256 nftTokenId, uint256 deadline, uint256 yayVotes, uint256 nayVotes, bool executed)
        function createProposal(uint256 nftTokenId) external returns (uint256)
        function voteOnProposal(uint256 proposalIndex, uint8 vote) external
        function executeProposal(uint256 proposalIndex) external
        function withdrawEther() external
    ]"#
);

abigen!(
    CryptoDevsNft,
    r#"[
        function balanceOf(address owner) external view returns (uint256)
    ]"#
);

/// Output types of `proposals(uint256)`
pub const PROPOSAL_OUTPUTS: [ParamType; 5] = [
    ParamType::Uint(256),
    ParamType::Uint(256),
    ParamType::Uint(256),
    ParamType::Uint(256),
    ParamType::Bool,
];

fn unexpected(function: &str) -> DaoError {
    DaoError::read(function, Error::AbiError("unexpected return value".to_string()))
}

/// The pair of deployed contracts we talk to.
pub struct DaoContract<'a> {
    gateway: &'a dyn ContractGateway,
    /// DAO contract address, also the treasury
    pub dao: Address,
    /// NFT contract address
    pub nft: Address,
}

impl<'a> DaoContract<'a> {
    pub fn new(gateway: &'a dyn ContractGateway, dao: Address, nft: Address) -> Self {
        Self { gateway, dao, nft }
    }

    pub fn gateway(&self) -> &'a dyn ContractGateway {
        self.gateway
    }

    /// Call a view function on `contract` and decode its outputs.
    async fn call<C: EthCall + AbiEncode>(
        &self,
        contract: Address,
        call: C,
        outputs: &[ParamType],
    ) -> DaoResult<Vec<Token>> {
        let function = C::function_name();
        let output = self.gateway.read(contract, &function, call.encode().into()).await?;
        abi::decode(outputs, output.as_ref()).map_err(|e| DaoError::read(&function, e.into()))
    }

    async fn call_uint<C: EthCall + AbiEncode>(
        &self,
        contract: Address,
        call: C,
    ) -> DaoResult<U256> {
        let function = C::function_name();
        let tokens = self.call(contract, call, &[ParamType::Uint(256)]).await?;
        tokens.into_iter().next().and_then(Token::into_uint).ok_or_else(|| unexpected(&function))
    }

    /// Owner of the DAO contract, the only account allowed to withdraw.
    pub async fn owner(&self) -> DaoResult<Address> {
        let tokens = self.call(self.dao, OwnerCall, &[ParamType::Address]).await?;
        tokens.into_iter().next().and_then(Token::into_address).ok_or_else(|| unexpected("owner"))
    }

    pub async fn num_proposals(&self) -> DaoResult<u64> {
        let n = self.call_uint(self.dao, NumProposalsCall).await?;
        if n > U256::from(u64::MAX) {
            return Err(unexpected("numProposals"))
        }
        Ok(n.as_u64())
    }

    /// Read and parse a single proposal.
    pub async fn proposal(&self, id: u64) -> DaoResult<Proposal> {
        let call = ProposalsCall { proposal_index: id.into() };
        let tokens = self.call(self.dao, call, &PROPOSAL_OUTPUTS).await?;
        Proposal::from_tokens(id, tokens).map_err(|e| DaoError::read("proposals", e))
    }

    /// Number of CryptoDevs NFTs held by `owner`.
    pub async fn nft_balance(&self, owner: Address) -> DaoResult<U256> {
        self.call_uint(self.nft, BalanceOfCall { owner }).await
    }

    /// Ether held by the DAO, in wei.
    pub async fn treasury_balance(&self) -> DaoResult<U256> {
        self.gateway.balance(self.dao).await
    }

    async fn send<C: EthCall + AbiEncode>(&self, from: Address, call: C) -> DaoResult<TxHash> {
        let function = C::function_name();
        self.gateway.write(from, self.dao, &function, call.encode().into()).await
    }

    pub async fn create_proposal(&self, from: Address, nft_token_id: U256) -> DaoResult<TxHash> {
        self.send(from, CreateProposalCall { nft_token_id }).await
    }

    pub async fn vote_on_proposal(&self, from: Address, id: u64, vote: Vote) -> DaoResult<TxHash> {
        self.send(from, VoteOnProposalCall { proposal_index: id.into(), vote: vote.as_u8() }).await
    }

    pub async fn execute_proposal(&self, from: Address, id: u64) -> DaoResult<TxHash> {
        self.send(from, ExecuteProposalCall { proposal_index: id.into() }).await
    }

    pub async fn withdraw_ether(&self, from: Address) -> DaoResult<TxHash> {
        self.send(from, WithdrawEtherCall).await
    }

    pub async fn await_confirmation(&self, tx: TxHash) -> DaoResult<TransactionReceipt> {
        self.gateway.await_confirmation(tx).await
    }
}
