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

use ethers::{
    types::{TransactionReceipt, U256},
    utils::{format_ether, to_checksum},
};
use prettytable::{format, row, Table};

use devsdao::util::time::{fmt_duration, Timestamp};

use crate::{
    controller::{Overview, UiState},
    error::{DaoError, DaoResult},
    proposal::{Controls, Proposal, Vote},
    session::Session,
    view::Tab,
};

pub const LOADING: &str = "Loading... Waiting for transaction...";
pub const NO_PROPOSALS: &str = "No proposals have been created";
pub const NOT_A_MEMBER: &str =
    "You do not own any Crypto Devs NFTs\nYou cannot create or vote on proposals";
pub const CONNECT_PROMPT: &str =
    "Wallet not connected. Check the node endpoint and that it exposes an account.";

/// Auxiliary function to format a wei amount in ETH, without trailing zeros.
pub fn format_eth(wei: U256) -> String {
    let eth = format_ether(wei);
    if !eth.contains('.') {
        return eth
    }
    eth.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Auxiliary function to describe how an action ended.
pub fn outcome_message(res: &DaoResult<TransactionReceipt>) -> String {
    match res {
        Ok(r) => format!(
            "Transaction {:?} confirmed in block {}",
            r.transaction_hash,
            r.block_number.unwrap_or_default()
        ),
        Err(e) if e.is_cancelled() => format!("Cancelled: {e}"),
        Err(DaoError::NotConnected) => CONNECT_PROMPT.to_string(),
        Err(e) => format!("Error: {e}"),
    }
}

/// Auxiliary function to render the label of a proposal's controls.
pub fn controls_label(controls: &Controls) -> String {
    match controls {
        Controls::Vote => format!("Vote {} | Vote {}", Vote::Yay, Vote::Nay),
        Controls::Execute(outcome) => format!("Execute Proposal ({outcome})"),
        Controls::None => "Proposal Executed".to_string(),
    }
}

/// Auxiliary function to render the welcome screen.
pub fn render_overview(overview: &Overview, session: &Session) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);

    if let Some(address) = session.address() {
        table.add_row(row!["Account", to_checksum(&address, None)]);
    }
    table.add_row(row!["Your CryptoDevs NFT Balance", overview.nft_balance]);
    table.add_row(row![
        "Treasury Balance",
        format!("{} ETH", format_eth(overview.treasury_wei))
    ]);
    table.add_row(row!["Total Number of Proposals", overview.num_proposals]);
    table.add_row(row!["DAO Owner", to_checksum(&overview.owner, None)]);

    let mut out = format!("Welcome to the DAO!\n{table}");
    if overview.can_withdraw(session) {
        out.push_str("You own this DAO: `withdraw` sends the treasury to your account\n");
    }
    out
}

/// Auxiliary function to render the proposal list as seen at `now`.
pub fn render_proposals(proposals: &[Proposal], now: Timestamp) -> String {
    if proposals.is_empty() {
        return NO_PROPOSALS.to_string()
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row![
        "Proposal ID",
        "Fake NFT to purchase",
        "Deadline",
        "Yay Votes",
        "Nay Votes",
        "Executed?",
        "Actions"
    ]);

    for p in proposals {
        let deadline = match p.controls(now) {
            Controls::Vote => {
                format!("{} (in {})", p.deadline, fmt_duration(p.deadline.remaining(now)))
            }
            _ => p.deadline.to_string(),
        };
        table.add_row(row![
            p.id,
            p.nft_token_id,
            deadline,
            p.yay_votes,
            p.nay_votes,
            p.executed,
            controls_label(&p.controls(now))
        ]);
    }

    table.to_string()
}

/// Auxiliary function to render the currently selected tab.
pub fn render_tab(
    ui: &UiState,
    loading: bool,
    overview: Option<&Overview>,
    now: Timestamp,
) -> String {
    match ui.tab {
        Tab::Unselected => String::new(),
        _ if loading => LOADING.to_string(),
        Tab::CreateProposal => match overview {
            Some(o) if !o.is_member() => NOT_A_MEMBER.to_string(),
            _ => format!(
                "Fake NFT Token ID to purchase: {}\nUse `input <token-id>` then `create`",
                if ui.form_input.is_empty() { "0" } else { ui.form_input.as_str() }
            ),
        },
        Tab::ViewProposals => {
            let mut out = render_proposals(&ui.proposals, ui.fetched_at.unwrap_or(now));
            if !ui.failed_proposals.is_empty() {
                out.push_str("\nCould not read proposals:");
                for (id, e) in &ui.failed_proposals {
                    out.push_str(&format!("\n  {id}: {e}"));
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use ethers::types::{TxHash, U64};

    use super::*;
    use crate::tests::{proposal_tokens, ALICE};

    fn proposal(id: u64, deadline: u64, yay: u32, nay: u32, executed: bool) -> Proposal {
        Proposal::from_tokens(id, proposal_tokens(id + 100, deadline, yay, nay, executed)).unwrap()
    }

    #[test]
    fn empty_list() {
        assert_eq!(render_proposals(&[], Timestamp::from_secs(0)), NO_PROPOSALS);

        let ui = UiState { tab: Tab::ViewProposals, ..Default::default() };
        assert_eq!(render_tab(&ui, false, None, Timestamp::from_secs(0)), NO_PROPOSALS);
        assert_eq!(render_tab(&ui, true, None, Timestamp::from_secs(0)), LOADING);
    }

    #[test]
    fn proposal_controls() {
        let now = Timestamp::from_secs(1000);
        let list = [
            proposal(0, 5000, 1, 0, false),
            proposal(1, 10, 4, 1, false),
            proposal(2, 10, 1, 4, true),
        ];
        let out = render_proposals(&list, now);

        let lines: Vec<&str> = out.lines().filter(|l| !l.trim().is_empty()).collect();
        assert!(lines[0].contains("Proposal ID"));
        let row = |id: &str| lines.iter().find(|l| l.trim_start().starts_with(id)).unwrap();
        assert!(row("0").contains("Vote YAY | Vote NAY"));
        assert!(!row("0").contains("Execute"));
        assert!(row("1").contains("Execute Proposal (YAY)"));
        assert!(!row("1").contains("Vote YAY"));
        assert!(row("2").contains("Proposal Executed"));
    }

    #[test]
    fn create_tab_for_non_members() {
        let overview = Overview {
            owner: ALICE,
            treasury_wei: U256::zero(),
            num_proposals: 0,
            nft_balance: U256::zero(),
        };
        let ui = UiState { tab: Tab::CreateProposal, ..Default::default() };
        let now = Timestamp::from_secs(0);
        assert_eq!(render_tab(&ui, false, Some(&overview), now), NOT_A_MEMBER);

        let overview = Overview { nft_balance: U256::one(), ..overview };
        assert!(render_tab(&ui, false, Some(&overview), now).contains("input <token-id>"));
    }

    #[test]
    fn outcomes() {
        let receipt = TransactionReceipt {
            transaction_hash: TxHash::repeat_byte(0xab),
            block_number: Some(U64::from(9)),
            status: Some(U64::from(1)),
            ..Default::default()
        };
        assert!(outcome_message(&Ok(receipt)).ends_with("confirmed in block 9"));
        assert!(outcome_message(&Err(DaoError::UserRejected)).starts_with("Cancelled"));
        assert_eq!(outcome_message(&Err(DaoError::NotConnected)), CONNECT_PROMPT);
        assert!(outcome_message(&Err(DaoError::ActionInProgress)).starts_with("Error"));
    }

    #[test]
    fn ether_amounts() {
        assert_eq!(format_eth(U256::zero()), "0");
        assert_eq!(format_eth(U256::from(1_500_000_000_000_000_000u64)), "1.5");
        assert_eq!(format_eth(U256::from(10_000_000_000_000_000_000u128)), "10");
        assert_eq!(format_eth(U256::one()), "0.000000000000000001");
    }

    #[test]
    fn overview_in_ether() {
        let overview = Overview {
            owner: ALICE,
            treasury_wei: U256::from(1_500_000_000_000_000_000u64),
            num_proposals: 3,
            nft_balance: U256::from(2),
        };
        let out = render_overview(&overview, &Session::disconnected());
        assert!(out.contains("1.5 ETH"));
        assert!(out.contains("Total Number of Proposals"));
        assert!(!out.contains("withdraw"));
    }
}
