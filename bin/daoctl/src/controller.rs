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

//! UI Controller: the application context that owns the session, the
//! UI state and the gateway, and runs the commands the view asks for.
use ethers::types::{Address, TransactionReceipt, U256};
use log::{debug, info};

use devsdao::util::time::Timestamp;

use crate::{
    contract::DaoContract,
    dispatch::{dispatch, Action, LoadingFlag},
    error::{DaoError, DaoResult},
    gateway::{ContractGateway, WalletProvider},
    proposal::{fetch_all_proposals, FetchPolicy, Proposal, Vote},
    session::Session,
    view::{transition, Command, Event, Tab},
};

/// Scalar state shown on the welcome screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overview {
    pub owner: Address,
    pub treasury_wei: U256,
    pub num_proposals: u64,
    /// CryptoDevs NFTs held by the connected account
    pub nft_balance: U256,
}

impl Overview {
    /// The withdraw control is only offered to the DAO owner.
    pub fn can_withdraw(&self, session: &Session) -> bool {
        session.is_connected() && session.address() == Some(self.owner)
    }

    /// Only NFT holders may create or vote on proposals.
    pub fn is_member(&self) -> bool {
        !self.nft_balance.is_zero()
    }
}

/// Transient, process-local UI state.
#[derive(Debug, Default)]
pub struct UiState {
    pub tab: Tab,
    /// NFT token ID typed into the create-proposal form
    pub form_input: String,
    pub proposals: Vec<Proposal>,
    /// Proposals that could not be read on the last fetch
    pub failed_proposals: Vec<(u64, DaoError)>,
    /// When the proposal list was fetched, used to decide controls
    pub fetched_at: Option<Timestamp>,
}

/// How the proposal list is fetched.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchSettings {
    pub policy: FetchPolicy,
    pub concurrency: usize,
}

/// Application context, alive from startup to shutdown.
pub struct Controller<G> {
    gateway: G,
    dao_address: Address,
    nft_address: Address,
    session: Session,
    loading: LoadingFlag,
    fetch: FetchSettings,
    pub ui: UiState,
}

impl<G: ContractGateway + WalletProvider> Controller<G> {
    pub fn new(
        gateway: G,
        dao_address: Address,
        nft_address: Address,
        fetch: FetchSettings,
    ) -> Self {
        Self {
            gateway,
            dao_address,
            nft_address,
            session: Session::disconnected(),
            loading: LoadingFlag::new(),
            fetch,
            ui: UiState::default(),
        }
    }

    pub fn contract(&self) -> DaoContract<'_> {
        DaoContract::new(&self.gateway, self.dao_address, self.nft_address)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub async fn connect(
        &mut self,
        preferred: Option<Address>,
        expected_chain: Option<u64>,
    ) -> DaoResult<()> {
        self.session = Session::connect(&self.gateway, preferred, expected_chain).await?;
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.session.disconnect();
        self.ui = UiState::default();
    }

    /// Read owner, treasury balance, proposal count and our NFT balance.
    pub async fn overview(&self) -> DaoResult<Overview> {
        let address = self.session.require_address()?;
        let contract = self.contract();

        Ok(Overview {
            owner: contract.owner().await?,
            treasury_wei: contract.treasury_balance().await?,
            num_proposals: contract.num_proposals().await?,
            nft_balance: contract.nft_balance(address).await?,
        })
    }

    /// Feed an event to the view state machine and run what it asks for.
    pub async fn handle(&mut self, event: Event) -> DaoResult<()> {
        let (tab, command) = transition(self.ui.tab, event);
        debug!(target: "daoctl::controller", "Tab {} -> {tab}", self.ui.tab);
        self.ui.tab = tab;

        match command {
            Some(Command::FetchProposals) => self.refresh_proposals().await,
            None => Ok(()),
        }
    }

    pub async fn select_tab(&mut self, tab: Tab) -> DaoResult<()> {
        self.handle(Event::Select(tab)).await
    }

    /// Rebuild the proposal list from scratch. A failed fetch leaves it empty.
    pub async fn refresh_proposals(&mut self) -> DaoResult<()> {
        self.ui.proposals.clear();
        self.ui.failed_proposals.clear();
        self.ui.fetched_at = None;
        self.session.require_address()?;

        let report = {
            let contract = self.contract();
            let count = contract.num_proposals().await?;
            fetch_all_proposals(&contract, count, self.fetch.policy, self.fetch.concurrency)
                .await?
        };

        info!(
            target: "daoctl::controller",
            "Fetched {} proposals ({} failed)", report.proposals.len(), report.failures.len(),
        );
        self.ui.proposals = report.proposals;
        self.ui.failed_proposals = report.failures;
        self.ui.fetched_at = Some(Timestamp::current_time()?);
        Ok(())
    }

    async fn run(&self, action: Action) -> DaoResult<TransactionReceipt> {
        let from = self.session.require_address()?;
        dispatch(&self.contract(), &self.loading, from, action).await
    }

    /// Create a proposal to buy the NFT whose ID is in the form input.
    pub async fn create_proposal(&self) -> DaoResult<TransactionReceipt> {
        let from = self.session.require_address()?;

        let input = self.ui.form_input.trim();
        if input.is_empty() {
            return Err(DaoError::InvalidInput("NFT token ID is empty".to_string()))
        }

        let Ok(nft_token_id) = U256::from_dec_str(input) else {
            return Err(DaoError::InvalidInput(format!("'{input}' is not an NFT token ID")))
        };

        if self.contract().nft_balance(from).await?.is_zero() {
            return Err(DaoError::NoNfts)
        }

        self.run(Action::Create { nft_token_id }).await
    }

    pub async fn vote(&self, proposal_id: u64, vote: Vote) -> DaoResult<TransactionReceipt> {
        self.run(Action::Vote { proposal_id, vote }).await
    }

    pub async fn execute(&self, proposal_id: u64) -> DaoResult<TransactionReceipt> {
        self.run(Action::Execute { proposal_id }).await
    }

    /// Withdraw the treasury. Refused locally unless we are the owner.
    pub async fn withdraw(&self) -> DaoResult<TransactionReceipt> {
        let from = self.session.require_address()?;
        if self.contract().owner().await? != from {
            return Err(DaoError::NotOwner)
        }

        self.run(Action::Withdraw).await
    }
}
