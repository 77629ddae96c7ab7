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

//! Proposal View Model: the read-through projection of the DAO's
//! proposals, and the sequence of reads that builds it.
use std::{fmt, str::FromStr};

use ethers::{abi::Token, types::U256};
use futures::future::join_all;
use log::{debug, error, warn};

use devsdao::{util::time::Timestamp, Error, Result};

use crate::{
    contract::DaoContract,
    error::{DaoError, DaoResult},
};

/// A vote choice, encoded as the contract's `Vote` enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vote {
    Yay,
    Nay,
}

impl Vote {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Yay => 0,
            Self::Nay => 1,
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yay => write!(f, "YAY"),
            Self::Nay => write!(f, "NAY"),
        }
    }
}

impl FromStr for Vote {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yay" | "yes" | "y" => Ok(Self::Yay),
            "nay" | "no" | "n" => Ok(Self::Nay),
            _ => Err(Error::ParseFailed("Vote must be one of yay/nay")),
        }
    }
}

/// Controls a proposal offers, given the time it is looked at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Controls {
    /// Voting is open: YAY and NAY.
    Vote,
    /// Deadline passed: execute, with the outcome it would have.
    Execute(Vote),
    /// Already executed, nothing left to do.
    None,
}

/// A DAO proposal as stored by the contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub id: u64,
    /// The NFT the DAO would purchase
    pub nft_token_id: U256,
    pub deadline: Timestamp,
    pub yay_votes: U256,
    pub nay_votes: U256,
    pub executed: bool,
}

impl Proposal {
    /// Parse the `(nftTokenId, deadline, yayVotes, nayVotes, executed)`
    /// tuple returned by `proposals(id)`.
    pub fn from_tokens(id: u64, tokens: Vec<Token>) -> Result<Self> {
        let [nft_token_id, deadline, yay_votes, nay_votes, executed]: [Token; 5] =
            match tokens.try_into() {
                Ok(v) => v,
                Err(_) => return Err(Error::AbiError("proposal tuple must have 5 fields".into())),
            };

        let uint = |t: Token, what: &str| {
            t.into_uint().ok_or_else(|| Error::AbiError(format!("proposal {what} is not a uint")))
        };

        let deadline = uint(deadline, "deadline")?;
        if deadline > U256::from(u64::MAX) {
            return Err(Error::AbiError(format!("proposal deadline {deadline} out of range")))
        }

        let Some(executed) = executed.into_bool() else {
            return Err(Error::AbiError("proposal executed flag is not a bool".into()))
        };

        Ok(Self {
            id,
            nft_token_id: uint(nft_token_id, "nftTokenId")?,
            deadline: Timestamp::from_secs(deadline.as_u64()),
            yay_votes: uint(yay_votes, "yayVotes")?,
            nay_votes: uint(nay_votes, "nayVotes")?,
            executed,
        })
    }

    /// Outcome if executed now. Ties go to NAY.
    pub fn outcome(&self) -> Vote {
        if self.yay_votes > self.nay_votes {
            Vote::Yay
        } else {
            Vote::Nay
        }
    }

    pub fn controls(&self, now: Timestamp) -> Controls {
        if self.executed {
            Controls::None
        } else if self.deadline > now {
            Controls::Vote
        } else {
            Controls::Execute(self.outcome())
        }
    }
}

/// What to do when reading one of the proposals fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Stop at the first failed read. Later proposals are not attempted,
    /// so reads are issued one at a time.
    #[default]
    AbortOnFirstFailure,
    /// Attempt every proposal and report the ones that failed.
    CollectPartial,
}

impl FromStr for FetchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort" => Ok(Self::AbortOnFirstFailure),
            "partial" => Ok(Self::CollectPartial),
            _ => Err(Error::ParseFailed("Fetch policy must be one of abort/partial")),
        }
    }
}

/// Result of a fetch sequence.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Successfully read proposals, ordered by ID
    pub proposals: Vec<Proposal>,
    /// Proposals that could not be read, ordered by ID
    pub failures: Vec<(u64, DaoError)>,
}

/// Read proposals `0..count`, at most `concurrency` at a time. Reads are
/// issued in increasing ID order and the result is always ordered by ID.
/// Concurrency only applies to [`FetchPolicy::CollectPartial`].
pub async fn fetch_all_proposals(
    contract: &DaoContract<'_>,
    count: u64,
    policy: FetchPolicy,
    concurrency: usize,
) -> DaoResult<FetchReport> {
    let concurrency = match policy {
        FetchPolicy::AbortOnFirstFailure => 1,
        FetchPolicy::CollectPartial => concurrency.max(1) as u64,
    };
    let mut report = FetchReport::default();
    debug!(target: "daoctl::proposal", "Fetching {count} proposals, {concurrency} at a time");

    let mut start = 0;
    while start < count {
        let end = count.min(start + concurrency);
        let results = join_all((start..end).map(|id| contract.proposal(id))).await;

        for (id, result) in (start..end).zip(results) {
            match result {
                Ok(proposal) => report.proposals.push(proposal),
                Err(e) if policy == FetchPolicy::AbortOnFirstFailure => {
                    error!(target: "daoctl::proposal", "Reading proposal {id} failed: {e}");
                    return Err(e)
                }
                Err(e) => {
                    warn!(target: "daoctl::proposal", "Skipping proposal {id}: {e}");
                    report.failures.push((id, e));
                }
            }
        }

        start = end;
    }

    Ok(report)
}
