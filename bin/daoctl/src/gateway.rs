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

//! Contract Gateway: the thin call layer between the client and the chain.
use std::{future::Future, time::Duration};

use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, PendingTransaction, Provider, ProviderError},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, TransactionReceipt,
        TransactionRequest, TxHash, U256, U64,
    },
};
use log::{debug, info};
use url::Url;

use devsdao::{
    system::{msleep, timeout::timeout},
    Error, Result,
};

use crate::error::{DaoError, DaoResult};

/// JSON-RPC "method not found", answered by nodes without a wallet.
const METHOD_NOT_FOUND: i64 = -32601;

/// Read, write and confirmation primitives against deployed contracts.
/// Calldata is ABI encoded by the caller, `function` names the call for
/// logs and errors.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Call a view function, returning its raw ABI encoded output.
    async fn read(&self, contract: Address, function: &str, data: Bytes) -> DaoResult<Bytes>;

    /// Submit a state-changing call as `from`, returning the transaction hash.
    async fn write(
        &self,
        from: Address,
        contract: Address,
        function: &str,
        data: Bytes,
    ) -> DaoResult<TxHash>;

    /// Block until the transaction is mined. A reverted transaction is an error.
    async fn await_confirmation(&self, tx: TxHash) -> DaoResult<TransactionReceipt>;

    /// Native balance of an address, in wei.
    async fn balance(&self, address: Address) -> DaoResult<U256>;
}

/// Source of accounts and network information, i.e. the wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask for access to the user's accounts.
    async fn request_accounts(&self) -> DaoResult<Vec<Address>>;

    /// Chain the provider is connected to.
    async fn chain_id(&self) -> DaoResult<u64>;
}

/// Decide what a receipt lookup means for a transaction we wait on.
/// `Ok(None)` means it is still pending. Some nodes hand out receipts
/// with no block number for transactions that are not mined yet.
pub fn check_receipt(
    tx: TxHash,
    lookup: std::result::Result<Option<TransactionReceipt>, ProviderError>,
) -> DaoResult<Option<TransactionReceipt>> {
    let receipt = match lookup {
        Ok(Some(r)) => r,
        Ok(None) => return Err(DaoError::Dropped(tx)),
        Err(e) => return Err(DaoError::read("eth_getTransactionReceipt", e.into())),
    };

    let Some(block) = receipt.block_number else {
        debug!(target: "daoctl::gateway", "Transaction {tx:?} still pending");
        return Ok(None)
    };

    if receipt.status == Some(U64::zero()) {
        return Err(DaoError::Reverted(tx))
    }

    info!(target: "daoctl::gateway", "Transaction {tx:?} confirmed in block {block}");
    Ok(Some(receipt))
}

/// [`ContractGateway`] and [`WalletProvider`] over an Ethereum JSON-RPC node.
pub struct EthGateway {
    provider: Provider<Http>,
    request_timeout: Duration,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl EthGateway {
    pub fn new(
        endpoint: Url,
        request_timeout: Duration,
        poll_interval: Duration,
        confirmation_timeout: Duration,
    ) -> Self {
        let provider = Provider::new(Http::new(endpoint)).interval(poll_interval);
        Self { provider, request_timeout, poll_interval, confirmation_timeout }
    }

    /// Run a single node request, bounded by the request timeout.
    async fn request<T>(
        &self,
        fut: impl Future<Output = std::result::Result<T, ProviderError>>,
    ) -> Result<T> {
        match timeout(self.request_timeout, fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(Error::TimeoutError),
        }
    }

    /// Wait for `tx` to be mined, re-checking receipts that are not in a
    /// block yet.
    async fn wait_mined(&self, tx: TxHash) -> DaoResult<TransactionReceipt> {
        loop {
            let pending = PendingTransaction::new(tx, &self.provider).interval(self.poll_interval);
            if let Some(receipt) = check_receipt(tx, pending.await)? {
                return Ok(receipt)
            }
            msleep(self.poll_interval.as_millis() as u64).await;
        }
    }
}

#[async_trait]
impl ContractGateway for EthGateway {
    async fn read(&self, contract: Address, function: &str, data: Bytes) -> DaoResult<Bytes> {
        let call: TypedTransaction = TransactionRequest::new().to(contract).data(data).into();

        debug!(target: "daoctl::gateway", "eth_call {function} on {contract:?}");
        self.request(self.provider.call(&call, None))
            .await
            .map_err(|e| DaoError::read(function, e))
    }

    async fn write(
        &self,
        from: Address,
        contract: Address,
        function: &str,
        data: Bytes,
    ) -> DaoResult<TxHash> {
        let tx = TransactionRequest::new().from(from).to(contract).data(data);

        info!(target: "daoctl::gateway", "Sending {function} to {contract:?}");
        let send = async {
            let pending = self.provider.send_transaction(tx, None).await?;
            Ok::<_, ProviderError>(*pending)
        };
        let hash = self.request(send).await.map_err(|e| DaoError::write(function, e))?;

        info!(target: "daoctl::gateway", "Transaction {hash:?} submitted");
        Ok(hash)
    }

    async fn await_confirmation(&self, tx: TxHash) -> DaoResult<TransactionReceipt> {
        match timeout(self.confirmation_timeout, self.wait_mined(tx)).await {
            Ok(res) => res,
            Err(_) => Err(DaoError::ConfirmationTimeout(tx)),
        }
    }

    async fn balance(&self, address: Address) -> DaoResult<U256> {
        self.request(self.provider.get_balance(address, None))
            .await
            .map_err(|e| DaoError::read("eth_getBalance", e))
    }
}

#[async_trait]
impl WalletProvider for EthGateway {
    /// Plain nodes do not implement `eth_requestAccounts`, in which case
    /// we fall back to the accounts they already expose.
    async fn request_accounts(&self) -> DaoResult<Vec<Address>> {
        let requested = self
            .request(self.provider.request::<_, Vec<Address>>("eth_requestAccounts", ()))
            .await;

        let res = match requested {
            Err(Error::JsonRpcError(METHOD_NOT_FOUND, _)) => {
                debug!(target: "daoctl::gateway", "No eth_requestAccounts, using eth_accounts");
                self.request(self.provider.get_accounts()).await
            }
            res => res,
        };

        res.map_err(|e| DaoError::read("eth_requestAccounts", e))
    }

    async fn chain_id(&self) -> DaoResult<u64> {
        let chain_id = self
            .request(self.provider.get_chainid())
            .await
            .map_err(|e| DaoError::read("eth_chainId", e))?;

        if chain_id > U256::from(u64::MAX) {
            return Err(DaoError::read("eth_chainId", Error::ParseFailed("Chain ID out of range")))
        }
        Ok(chain_id.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(block: Option<u64>, status: Option<u64>) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: TxHash::repeat_byte(7),
            block_number: block.map(U64::from),
            status: status.map(U64::from),
            ..Default::default()
        }
    }

    #[test]
    fn mined_receipts() {
        let tx = TxHash::repeat_byte(7);

        let r = check_receipt(tx, Ok(Some(receipt(Some(42), Some(1))))).unwrap().unwrap();
        assert_eq!(r.block_number, Some(U64::from(42)));

        // Pre-Byzantium receipts carry no status
        assert!(check_receipt(tx, Ok(Some(receipt(Some(42), None)))).unwrap().is_some());

        let res = check_receipt(tx, Ok(Some(receipt(Some(42), Some(0)))));
        assert!(matches!(res, Err(DaoError::Reverted(h)) if h == tx));
    }

    #[test]
    fn receipt_without_block_is_pending() {
        let tx = TxHash::repeat_byte(7);
        assert!(check_receipt(tx, Ok(Some(receipt(None, None)))).unwrap().is_none());
        assert!(check_receipt(tx, Ok(Some(receipt(None, Some(1))))).unwrap().is_none());
    }

    #[test]
    fn dropped_transaction() {
        let tx = TxHash::repeat_byte(7);
        assert!(matches!(check_receipt(tx, Ok(None)), Err(DaoError::Dropped(h)) if h == tx));
    }
}
