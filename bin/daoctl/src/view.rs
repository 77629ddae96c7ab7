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

//! Tab/View state machine. Transitions are pure, side effects are
//! returned as [`Command`]s for the caller to run.
use std::{fmt, str::FromStr};

use devsdao::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Unselected,
    CreateProposal,
    ViewProposals,
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unselected => write!(f, "none"),
            Self::CreateProposal => write!(f, "Create Proposal"),
            Self::ViewProposals => write!(f, "View Proposals"),
        }
    }
}

impl FromStr for Tab {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Self::CreateProposal),
            "view" => Ok(Self::ViewProposals),
            "none" => Ok(Self::Unselected),
            _ => Err(Error::ParseFailed("Tab must be one of create/view/none")),
        }
    }
}

/// User input that drives the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// A tab was clicked
    Select(Tab),
}

/// Side effect requested by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Rebuild the proposal list from contract storage
    FetchProposals,
}

/// Compute the next tab and the command to run on entering it.
/// Every entry into `ViewProposals`, including re-selecting it, refetches.
pub fn transition(_state: Tab, event: Event) -> (Tab, Option<Command>) {
    match event {
        Event::Select(Tab::ViewProposals) => (Tab::ViewProposals, Some(Command::FetchProposals)),
        Event::Select(tab) => (tab, None),
    }
}
