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

use std::{process::exit, str::FromStr, time::Duration};

use ethers::types::{Address, TransactionReceipt};
use log::{info, warn};
use serde::Deserialize;
use structopt::StructOpt;
use structopt_toml::StructOptToml;
use url::Url;

use devsdao::{
    cli_desc,
    util::{
        cli::{init_logger, parse_args_with_config},
        time::Timestamp,
    },
    Error, Result,
};

use daoctl::{
    cli_util::{outcome_message, render_overview, render_tab},
    controller::{Controller, FetchSettings},
    error::{DaoError, DaoResult},
    gateway::EthGateway,
    interactive::interactive,
    proposal::{FetchPolicy, Vote},
    view::Tab,
};

const CONFIG_FILE: &str = "daoctl_config.toml";
const CONFIG_FILE_CONTENTS: &str = include_str!("../daoctl_config.toml");

#[derive(Clone, Debug, Deserialize, StructOpt, StructOptToml)]
#[serde(default)]
#[structopt(name = "daoctl", about = cli_desc!())]
struct Args {
    #[structopt(short, parse(from_occurrences))]
    /// Increase verbosity (-vvv supported)
    verbose: u8,

    #[structopt(short, long)]
    /// Configuration file to use
    config: Option<String>,

    #[structopt(short, long, default_value = "http://127.0.0.1:8545")]
    /// Ethereum node JSON-RPC endpoint
    endpoint: Url,

    #[structopt(long, default_value = "0x0000000000000000000000000000000000000000")]
    /// CryptoDevs DAO contract address
    dao_address: String,

    #[structopt(long, default_value = "0x0000000000000000000000000000000000000000")]
    /// CryptoDevs NFT contract address
    nft_address: String,

    #[structopt(short, long)]
    /// Account to act as (default: first account the node exposes)
    account: Option<String>,

    #[structopt(long, default_value = "11155111")]
    /// Expected chain ID, 0 to accept any
    chain_id: u64,

    #[structopt(long, default_value = "30")]
    /// Seconds a JSON-RPC request may take
    rpc_timeout: u64,

    #[structopt(long, default_value = "2000")]
    /// Milliseconds between transaction receipt polls
    poll_interval: u64,

    #[structopt(long, default_value = "300")]
    /// Seconds to wait for a transaction to be mined
    confirmation_timeout: u64,

    #[structopt(long, default_value = "abort")]
    /// Proposal fetch failure policy: abort or partial
    fetch_policy: String,

    #[structopt(long, default_value = "1")]
    /// Number of proposals read concurrently
    fetch_concurrency: usize,

    #[structopt(long, default_value = "~/.local/share/devsdao/daoctl_history")]
    /// Interactive shell history file
    history_file: String,

    #[structopt(long)]
    /// Set log file output
    log: Option<String>,

    #[structopt(subcommand)]
    command: Option<Subcmd>,
}

#[derive(Clone, Debug, Deserialize, StructOpt)]
enum Subcmd {
    /// Show NFT balance, treasury balance and number of proposals
    Info,

    /// List all proposals with the actions they offer
    Proposals,

    /// Create a proposal to purchase a fake NFT
    Create {
        /// Fake NFT token ID to purchase
        nft_token_id: String,
    },

    /// Vote on a proposal
    Vote {
        /// Proposal ID
        proposal_id: u64,

        /// yay or nay
        vote: String,
    },

    /// Execute a proposal whose deadline has passed
    Execute {
        /// Proposal ID
        proposal_id: u64,
    },

    /// Withdraw the DAO treasury (owner only)
    Withdraw,

    /// Start an interactive shell
    Interactive,
}

fn parse_address(s: &str, what: &str) -> DaoResult<Address> {
    match Address::from_str(s) {
        Ok(a) => Ok(a),
        Err(e) => Err(DaoError::InvalidInput(format!("{what}: {e}"))),
    }
}

async fn realmain(args: Args) -> DaoResult<()> {
    let dao_address = parse_address(&args.dao_address, "dao_address")?;
    let nft_address = parse_address(&args.nft_address, "nft_address")?;
    if dao_address.is_zero() || nft_address.is_zero() {
        warn!(target: "daoctl", "Contract addresses are not configured, calls will fail");
    }

    let account = match &args.account {
        Some(a) => Some(parse_address(a, "account")?),
        None => None,
    };
    let chain_id = if args.chain_id == 0 { None } else { Some(args.chain_id) };

    let fetch = FetchSettings {
        policy: FetchPolicy::from_str(&args.fetch_policy)?,
        concurrency: args.fetch_concurrency,
    };

    info!(target: "daoctl", "Connecting to {}", args.endpoint);
    let gateway = EthGateway::new(
        args.endpoint.clone(),
        Duration::from_secs(args.rpc_timeout),
        Duration::from_millis(args.poll_interval),
        Duration::from_secs(args.confirmation_timeout),
    );

    let mut ctl = Controller::new(gateway, dao_address, nft_address, fetch);
    ctl.connect(account, chain_id).await?;

    match args.command.unwrap_or(Subcmd::Info) {
        Subcmd::Info => {
            let overview = ctl.overview().await?;
            print!("{}", render_overview(&overview, ctl.session()));
        }

        Subcmd::Proposals => {
            ctl.select_tab(Tab::ViewProposals).await?;
            println!("{}", render_tab(&ctl.ui, false, None, Timestamp::current_time()?));
        }

        Subcmd::Create { nft_token_id } => {
            ctl.ui.form_input = nft_token_id;
            report(ctl.create_proposal().await)?;
        }

        Subcmd::Vote { proposal_id, vote } => {
            let vote = match Vote::from_str(&vote) {
                Ok(v) => v,
                Err(e) => return Err(DaoError::InvalidInput(e.to_string())),
            };
            report(ctl.vote(proposal_id, vote).await)?;
        }

        Subcmd::Execute { proposal_id } => report(ctl.execute(proposal_id).await)?,

        Subcmd::Withdraw => report(ctl.withdraw().await)?,

        Subcmd::Interactive => {
            let history_file = args.history_file.clone();
            interactive(&mut ctl, &history_file).await
        }
    }

    Ok(())
}

/// Print the outcome of an action. Only genuine failures are errors.
fn report(res: DaoResult<TransactionReceipt>) -> DaoResult<()> {
    match res {
        Ok(_) => {
            println!("{}", outcome_message(&res));
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            println!("{}", outcome_message(&Err(e)));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn main() -> Result<()> {
    // First pass only to find out where the config file is
    let args = match Args::from_args_with_toml("") {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed parsing arguments: {e}");
            return Err(Error::ConfigInvalid)
        }
    };

    let args: Args = parse_args_with_config(args.config, CONFIG_FILE, CONFIG_FILE_CONTENTS)?;
    init_logger(args.verbose, args.log.as_deref())?;

    // The HTTP transport needs a tokio reactor
    let rt = tokio::runtime::Runtime::new()?;
    if let Err(e) = rt.block_on(realmain(args)) {
        eprintln!("{}", outcome_message(&Err(e)));
        exit(1);
    }

    Ok(())
}
