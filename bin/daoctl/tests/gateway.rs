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

//! EthGateway against a minimal JSON-RPC node served over HTTP.
use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use ethers::types::{Address, Bytes, TxHash, H160, U256, U64};
use smol::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tinyjson::JsonValue;
use url::Url;

use devsdao::Error;

use daoctl::{
    contract::DaoContract,
    error::DaoError,
    gateway::{ContractGateway, EthGateway, WalletProvider},
};

const DAO: Address = H160([0xda; 20]);
const NFT: Address = H160([0x4f; 20]);
const ACCOUNT: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

/// Node behaviour, set per test.
#[derive(Default)]
struct Node {
    calls: Mutex<HashMap<String, usize>>,
    /// Answer `eth_sendTransaction` with a wallet rejection
    reject_sends: bool,
    /// Mined transactions have status 0
    reverted: bool,
    /// `eth_getTransactionByHash` finds nothing
    dropped: bool,
    /// Transactions never make it into a block
    never_mined: bool,
    /// Answer every request with HTTP 500
    broken: bool,
    /// Accept connections and never answer
    hang: bool,
}

impl Node {
    fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    fn tx_hash() -> String {
        format!("\"0x{}\"", "ab".repeat(32))
    }

    /// Position of a mined transaction, or nulls while it is pending.
    fn inclusion(mined: bool) -> String {
        if mined {
            format!(
                "\"blockHash\":\"0x{}\",\"blockNumber\":\"0x2a\",\"transactionIndex\":\"0x0\"",
                "11".repeat(32)
            )
        } else {
            "\"blockHash\":null,\"blockNumber\":null,\"transactionIndex\":null".to_string()
        }
    }

    fn transaction(&self, n: usize) -> String {
        if self.dropped {
            return "null".to_string()
        }

        let mined = !self.never_mined && n > 1;
        format!(
            "{{\"hash\":{},\"nonce\":\"0x0\",{},\"from\":\"{ACCOUNT}\",\"to\":\"{DAO:?}\",\
             \"value\":\"0x0\",\"gasPrice\":\"0x3b9aca00\",\"gas\":\"0x5208\",\"input\":\"0x\",\
             \"v\":\"0x1b\",\"r\":\"0x1\",\"s\":\"0x1\"}}",
            Self::tx_hash(),
            Self::inclusion(mined),
        )
    }

    /// The first receipt handed out is not in a block yet.
    fn receipt(&self, n: usize) -> String {
        let status = if self.reverted { "0x0" } else { "0x1" };
        let inclusion = if n > 1 || self.reverted {
            Self::inclusion(true)
        } else {
            "\"blockHash\":null,\"blockNumber\":null,\"transactionIndex\":\"0x0\"".to_string()
        };

        format!(
            "{{\"transactionHash\":{},{inclusion},\"from\":\"{ACCOUNT}\",\"to\":\"{DAO:?}\",\
             \"cumulativeGasUsed\":\"0x5208\",\"gasUsed\":\"0x5208\",\"contractAddress\":null,\
             \"logs\":[],\"logsBloom\":\"0x{}\",\"status\":\"{status}\",\"type\":\"0x0\"}}",
            Self::tx_hash(),
            "0".repeat(512),
        )
    }

    fn answer(&self, method: &str) -> std::result::Result<String, (i64, &'static str)> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(method.to_string()).or_default();
            *n += 1;
            *n
        };

        let res = match method {
            "eth_chainId" => "\"0xaa36a7\"".to_string(),
            "eth_requestAccounts" => return Err((-32601, "method not found")),
            "eth_accounts" => format!("[\"{ACCOUNT}\"]"),
            "eth_getBalance" => "\"0x14d1120d7b160000\"".to_string(),
            "eth_call" => format!("\"0x{}3\"", "0".repeat(63)),
            "eth_blockNumber" => "\"0x2a\"".to_string(),
            "eth_gasPrice" => "\"0x3b9aca00\"".to_string(),
            "eth_estimateGas" => "\"0x5208\"".to_string(),
            "eth_sendTransaction" if self.reject_sends => {
                return Err((4001, "User rejected the request."))
            }
            "eth_sendTransaction" => Self::tx_hash(),
            "eth_getTransactionByHash" => self.transaction(n),
            "eth_getTransactionReceipt" => self.receipt(n),
            _ => return Err((-32601, "method not found")),
        };

        Ok(res)
    }

    fn reply(&self, body: &str) -> String {
        let req: JsonValue = body.parse().unwrap();
        let id = match &req["id"] {
            JsonValue::Number(n) => *n as u64,
            _ => 0,
        };
        let JsonValue::String(method) = &req["method"] else { panic!("no method in {body}") };

        match self.answer(method) {
            Ok(result) => format!("{{\"jsonrpc\":\"2.0\",\"id\":{id},\"result\":{result}}}"),
            Err((code, message)) => format!(
                "{{\"jsonrpc\":\"2.0\",\"id\":{id},\"error\":{{\"code\":{code},\"message\":\"{message}\"}}}}"
            ),
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> io::Result<String> {
    let mut buf = vec![];
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into())
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else { continue };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < end + 4 + len {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into())
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        return Ok(String::from_utf8_lossy(&buf[end + 4..end + 4 + len]).into_owned())
    }
}

async fn serve(node: Arc<Node>, mut stream: TcpStream) -> io::Result<()> {
    let body = read_request(&mut stream).await?;

    if node.hang {
        futures::future::pending::<()>().await;
    }

    let (status, body) = if node.broken {
        ("500 Internal Server Error", "node is down".to_string())
    } else {
        ("200 OK", node.reply(&body))
    };

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

/// Serve `node` on a local port until the test process exits.
fn spawn_node(node: Arc<Node>) -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap()).parse().unwrap();

    thread::spawn(move || {
        smol::block_on(async move {
            let listener = TcpListener::try_from(listener).unwrap();
            while let Ok((stream, _)) = listener.accept().await {
                smol::spawn(serve(node.clone(), stream)).detach();
            }
        })
    });

    url
}

fn gateway(node: &Arc<Node>) -> EthGateway {
    EthGateway::new(
        spawn_node(node.clone()),
        Duration::from_millis(500),
        Duration::from_millis(10),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn wallet_and_reads() {
    let node = Arc::new(Node::default());
    let gw = gateway(&node);

    assert_eq!(gw.chain_id().await.unwrap(), 11155111);

    // No wallet behind the node, so its own accounts are used
    let accounts = gw.request_accounts().await.unwrap();
    assert_eq!(accounts, vec![ACCOUNT.parse::<Address>().unwrap()]);
    assert_eq!(node.calls("eth_requestAccounts"), 1);
    assert_eq!(node.calls("eth_accounts"), 1);

    let balance = gw.balance(DAO).await.unwrap();
    assert_eq!(balance, U256::from(1_500_000_000_000_000_000u64));

    let contract = DaoContract::new(&gw, DAO, NFT);
    assert_eq!(contract.num_proposals().await.unwrap(), 3);
}

#[tokio::test]
async fn confirmation_waits_for_block() {
    let node = Arc::new(Node::default());
    let gw = gateway(&node);
    let from: Address = ACCOUNT.parse().unwrap();

    let tx = gw.write(from, DAO, "withdrawEther", Bytes::from(vec![0x7e, 0x5c, 0x26, 0x03])).await;
    let tx = tx.unwrap();
    assert_eq!(tx, TxHash::repeat_byte(0xab));

    // The first receipt has no block number and must not end the wait
    let receipt = gw.await_confirmation(tx).await.unwrap();
    assert_eq!(receipt.block_number, Some(U64::from(0x2a)));
    assert_eq!(receipt.status, Some(U64::from(1)));
    assert!(node.calls("eth_getTransactionReceipt") >= 2);
}

#[tokio::test]
async fn failed_transactions() {
    let tx = TxHash::repeat_byte(0xab);

    let node = Arc::new(Node { reverted: true, ..Default::default() });
    let res = gateway(&node).await_confirmation(tx).await;
    assert!(matches!(res, Err(DaoError::Reverted(h)) if h == tx));

    let node = Arc::new(Node { dropped: true, ..Default::default() });
    let res = gateway(&node).await_confirmation(tx).await;
    assert!(matches!(res, Err(DaoError::Dropped(h)) if h == tx));

    let node = Arc::new(Node { never_mined: true, ..Default::default() });
    let gw = EthGateway::new(
        spawn_node(node.clone()),
        Duration::from_millis(500),
        Duration::from_millis(10),
        Duration::from_millis(300),
    );
    let res = gw.await_confirmation(tx).await;
    assert!(matches!(res, Err(DaoError::ConfirmationTimeout(h)) if h == tx));
}

#[tokio::test]
async fn rejected_send_is_cancelled() {
    let node = Arc::new(Node { reject_sends: true, ..Default::default() });
    let gw = gateway(&node);
    let from: Address = ACCOUNT.parse().unwrap();

    let err = gw.write(from, DAO, "withdrawEther", Bytes::default()).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(node.calls("eth_sendTransaction"), 1);
}

#[tokio::test]
async fn node_failures() {
    let node = Arc::new(Node { broken: true, ..Default::default() });
    let contract_gw = gateway(&node);
    let contract = DaoContract::new(&contract_gw, DAO, NFT);
    let err = contract.num_proposals().await.unwrap_err();
    assert!(matches!(
        &err,
        DaoError::Read { function, source: Error::ProviderError(_) } if function == "numProposals"
    ));

    let node = Arc::new(Node { hang: true, ..Default::default() });
    let err = gateway(&node).chain_id().await.unwrap_err();
    assert!(matches!(
        &err,
        DaoError::Read { function, source: Error::TimeoutError } if function == "eth_chainId"
    ));
}
