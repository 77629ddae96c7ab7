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

use std::io::ErrorKind;

use libc::{fcntl, F_GETFL, F_SETFL, O_NONBLOCK};
use linenoise_rs::{
    linenoise_history_add, linenoise_history_load, linenoise_history_save,
    linenoise_set_completion_callback, linenoise_set_hints_callback, LinenoiseState,
};

use devsdao::{cli_desc, system::msleep, util::path::expand_path, util::time::Timestamp};

use crate::{
    cli_util::{outcome_message, render_overview, render_tab, CONNECT_PROMPT},
    controller::Controller,
    error::DaoError,
    gateway::{ContractGateway, WalletProvider},
    proposal::Vote,
    view::Tab,
};

const COMMANDS: [&str; 9] =
    ["help", "info", "tab", "input", "create", "vote", "execute", "withdraw", "exit"];

/// Auxiliary function to print the help message.
fn help() {
    println!("{}", cli_desc!());
    println!("Commands:");
    println!("\thelp: Prints the help message");
    println!("\tinfo: Show NFT balance, treasury balance and number of proposals");
    println!("\ttab: Select a tab: create, view or none. Selecting view refetches proposals");
    println!("\tinput: Set the fake NFT token ID to purchase in a new proposal");
    println!("\tcreate: Create a proposal for the NFT token ID set with `input`");
    println!("\tvote: Vote yay or nay on a proposal");
    println!("\texecute: Execute a proposal whose deadline has passed");
    println!("\twithdraw: Withdraw the DAO treasury (owner only)");
    println!("\texit: Leave the shell");
}

/// Auxiliary function to define the interactive shell completions.
fn completion(buf: &str, lc: &mut Vec<String>) {
    if let Some(rest) = buf.strip_prefix("tab ") {
        for tab in ["create", "view", "none"] {
            if tab.starts_with(rest) {
                lc.push(format!("tab {tab}"));
            }
        }
        return
    }

    for cmd in COMMANDS {
        if cmd.starts_with(buf) {
            lc.push(cmd.to_string());
        }
    }
}

/// Auxiliary function to define the interactive shell hints.
fn hints(buf: &str) -> Option<(String, i32, bool)> {
    match buf {
        "tab " => Some(("{create|view|none}".to_string(), 35, false)), // 35 = magenta
        "input " => Some(("{token-id}".to_string(), 35, false)),
        "vote " => Some(("{proposal-id} {yay|nay}".to_string(), 35, false)),
        "execute " => Some(("{proposal-id}".to_string(), 35, false)),
        _ => None,
    }
}

/// Auxiliary function to start the interactive shell over `ctl`.
/// Only sane/linenoise terminals are suported.
pub async fn interactive<G>(ctl: &mut Controller<G>, history_path: &str)
where
    G: ContractGateway + WalletProvider,
{
    // Expand the history file path
    let history_path = match expand_path(history_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error while expanding history file path: {e}");
            return
        }
    };
    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let history_file = history_path.to_string_lossy().to_string();

    linenoise_set_completion_callback(completion);
    linenoise_set_hints_callback(hints);
    let _ = linenoise_history_load(&history_file);

    println!("Welcome to Crypto Devs! Type `help` for the list of commands.");

    loop {
        // Grab input or end if Ctrl-D or Ctrl-C was pressed
        let Some(line) = listen_for_line().await else { break };

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue
        }

        linenoise_history_add(&line);

        match parts[0] {
            "help" => help(),
            "info" => handle_info(ctl).await,
            "tab" => handle_tab(ctl, &parts).await,
            "input" => handle_input(ctl, &parts),
            "create" => println!("{}", outcome_message(&ctl.create_proposal().await)),
            "vote" => handle_vote(ctl, &parts).await,
            "execute" => handle_execute(ctl, &parts).await,
            "withdraw" => println!("{}", outcome_message(&ctl.withdraw().await)),
            "exit" | "quit" => break,
            _ => println!("Unrecognized command: {}", parts[0]),
        }
    }

    let _ = linenoise_history_save(&history_file);
}

/// Auxiliary function to read a line, yielding to the executor while
/// stdin has nothing for us.
async fn listen_for_line() -> Option<String> {
    let mut state = match LinenoiseState::edit_start(-1, -1, "daoctl> ") {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error while generating linenoise state: {e}");
            return None
        }
    };

    // Set stdin to non-blocking mode
    let fd = state.get_fd();
    unsafe {
        let flags = fcntl(fd, F_GETFL, 0);
        fcntl(fd, F_SETFL, flags | O_NONBLOCK);
    }

    let line = loop {
        match state.edit_feed() {
            Ok(line) => break line,
            Err(e) if e.kind() == ErrorKind::Interrupted => break None,
            Err(e) if e.kind() == ErrorKind::WouldBlock => msleep(10).await,
            Err(e) => {
                eprintln!("Error while reading linenoise feed: {e}");
                break None
            }
        }
    };

    // Restore blocking mode
    unsafe {
        let flags = fcntl(fd, F_GETFL, 0);
        fcntl(fd, F_SETFL, flags & !O_NONBLOCK);
    }

    let _ = state.edit_stop();
    line
}

fn print_error(e: &DaoError) {
    match e {
        DaoError::NotConnected => println!("{CONNECT_PROMPT}"),
        e => println!("Error: {e}"),
    }
}

/// Auxiliary function to define the info command handling.
async fn handle_info<G: ContractGateway + WalletProvider>(ctl: &Controller<G>) {
    match ctl.overview().await {
        Ok(overview) => print!("{}", render_overview(&overview, ctl.session())),
        Err(e) => print_error(&e),
    }
}

/// Auxiliary function to define the tab command handling.
async fn handle_tab<G: ContractGateway + WalletProvider>(ctl: &mut Controller<G>, parts: &[&str]) {
    if parts.len() != 2 {
        println!("Malformed `tab` command");
        println!("Usage: tab {{create|view|none}}");
        return
    }

    let tab: Tab = match parts[1].parse() {
        Ok(t) => t,
        Err(e) => {
            println!("{e}");
            return
        }
    };

    if let Err(e) = ctl.select_tab(tab).await {
        print_error(&e);
        return
    }

    // The create tab depends on whether we hold any NFTs
    let overview = match tab {
        Tab::CreateProposal => ctl.overview().await.ok(),
        _ => None,
    };

    let now = match Timestamp::current_time() {
        Ok(t) => t,
        Err(e) => {
            println!("Error: {e}");
            return
        }
    };

    println!("{}", render_tab(&ctl.ui, ctl.is_loading(), overview.as_ref(), now));
}

/// Auxiliary function to define the input command handling.
fn handle_input<G: ContractGateway + WalletProvider>(ctl: &mut Controller<G>, parts: &[&str]) {
    if parts.len() != 2 {
        println!("Malformed `input` command");
        println!("Usage: input {{token-id}}");
        return
    }

    ctl.ui.form_input = parts[1].to_string();
    println!("Fake NFT Token ID to purchase: {}", parts[1]);
}

/// Auxiliary function to define the vote command handling.
async fn handle_vote<G: ContractGateway + WalletProvider>(ctl: &Controller<G>, parts: &[&str]) {
    if parts.len() != 3 {
        println!("Malformed `vote` command");
        println!("Usage: vote {{proposal-id}} {{yay|nay}}");
        return
    }

    let (Ok(id), Ok(vote)) = (parts[1].parse::<u64>(), parts[2].parse::<Vote>()) else {
        println!("Malformed `vote` command");
        println!("Usage: vote {{proposal-id}} {{yay|nay}}");
        return
    };

    println!("{}", outcome_message(&ctl.vote(id, vote).await));
}

/// Auxiliary function to define the execute command handling.
async fn handle_execute<G: ContractGateway + WalletProvider>(ctl: &Controller<G>, parts: &[&str]) {
    let id = match parts {
        [_, id] => id.parse::<u64>().ok(),
        _ => None,
    };

    let Some(id) = id else {
        println!("Malformed `execute` command");
        println!("Usage: execute {{proposal-id}}");
        return
    };

    println!("{}", outcome_message(&ctl.execute(id).await));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions() {
        let mut lc = vec![];
        completion("e", &mut lc);
        assert_eq!(lc, vec!["execute", "exit"]);

        let mut lc = vec![];
        completion("tab v", &mut lc);
        assert_eq!(lc, vec!["tab view"]);

        assert!(hints("vote ").is_some());
        assert!(hints("info").is_none());
    }
}
