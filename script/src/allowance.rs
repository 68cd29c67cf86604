//! Allowance sequencing ahead of a confidential transfer that draws from a
//! public token balance.
//!
//! ```text
//! MintPending -> TokenApprovalPending -> NoteApprovalPending -> Ready
//! ```
//!
//! Each step is one transaction from the payer. The sequencer moves on only
//! after the step's receipt is confirmed; a failed step leaves it at that
//! state with nothing rolled back.

use std::collections::HashSet;
use std::fmt;

use alloy::primitives::{Address, U256};
use confidential_transfer_lib::TransferRequest;
use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::account::Account;
use crate::config::{AllowanceConfig, Contracts, NoteApproval};
use crate::contracts;
use crate::gateway::{ProofId, ProofResult};
use crate::ledger::{LedgerClient, Receipt};
use crate::submit::{ContractCall, SubmitError, Submitter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AllowanceState {
    MintPending,
    TokenApprovalPending,
    NoteApprovalPending,
    Ready,
}

impl AllowanceState {
    pub fn next(self) -> Self {
        match self {
            AllowanceState::MintPending => AllowanceState::TokenApprovalPending,
            AllowanceState::TokenApprovalPending => AllowanceState::NoteApprovalPending,
            AllowanceState::NoteApprovalPending | AllowanceState::Ready => AllowanceState::Ready,
        }
    }
}

impl fmt::Display for AllowanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AllowanceState::MintPending => "mint pending",
            AllowanceState::TokenApprovalPending => "token approval pending",
            AllowanceState::NoteApprovalPending => "note approval pending",
            AllowanceState::Ready => "ready",
        })
    }
}

#[derive(Debug, Error)]
#[error("allowance step failed at {state}: {source}")]
pub struct AllowanceError {
    pub state: AllowanceState,
    #[source]
    pub source: SubmitError,
}

/// Two sequences for one payer would race on its nonce.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("payer {0} appears in more than one allowance job")]
pub struct DuplicatePayer(pub Address);

/// Amounts and targets of every step, fixed once the proof id is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowancePlan {
    /// Public owner of the request; signs every step
    pub payer: Address,
    pub token: Address,
    pub note_registry: Address,
    pub mint_amount: Option<U256>,
    pub token_allowance: U256,
    pub proof_id: ProofId,
    pub note_allowance: U256,
    /// `|k_public|` when the request draws from the public balance
    pub value: Option<U256>,
}

impl AllowancePlan {
    pub fn for_request(
        request: &TransferRequest,
        proof: &ProofResult,
        contracts: &Contracts,
        config: &AllowanceConfig,
    ) -> Self {
        let value = request.public_deposit().map(U256::from);
        let deposit = value.unwrap_or(U256::ZERO);
        let plan = AllowancePlan {
            payer: Address::from(request.public_owner()),
            token: contracts.token,
            note_registry: contracts.note_registry,
            mint_amount: config.mint_amount,
            token_allowance: config.token_allowance.unwrap_or(deposit),
            proof_id: proof.proof_id,
            note_allowance: match config.note_approval {
                NoteApproval::TransferValue => deposit,
                NoteApproval::Fixed(amount) => amount,
            },
            value,
        };
        if plan.is_underfunded() {
            warn!(
                payer = %plan.payer,
                value = %deposit,
                token_allowance = %plan.token_allowance,
                note_allowance = %plan.note_allowance,
                "allowances are below the transfer value; the transfer will likely revert"
            );
        }
        plan
    }

    /// Nothing to approve unless value is drawn from a public balance.
    pub fn initial_state(&self) -> AllowanceState {
        match (self.value, self.mint_amount) {
            (None, _) => AllowanceState::Ready,
            (Some(_), Some(_)) => AllowanceState::MintPending,
            (Some(_), None) => AllowanceState::TokenApprovalPending,
        }
    }

    pub fn is_underfunded(&self) -> bool {
        self.value
            .is_some_and(|v| self.token_allowance < v || self.note_allowance < v)
    }

    /// The transaction that completes `state`, if it has one.
    pub fn call_for(&self, state: AllowanceState) -> Option<ContractCall> {
        match state {
            AllowanceState::MintPending => self
                .mint_amount
                .map(|amount| contracts::mint(self.token, self.payer, amount)),
            AllowanceState::TokenApprovalPending => Some(contracts::approve(
                self.token,
                self.note_registry,
                self.token_allowance,
            )),
            AllowanceState::NoteApprovalPending => Some(contracts::public_approve(
                self.note_registry,
                self.proof_id,
                self.note_allowance,
            )),
            AllowanceState::Ready => None,
        }
    }
}

pub struct AllowanceSequencer<'a, L> {
    submitter: &'a Submitter<L>,
    plan: &'a AllowancePlan,
    state: AllowanceState,
}

impl<'a, L: LedgerClient> AllowanceSequencer<'a, L> {
    pub fn new(submitter: &'a Submitter<L>, plan: &'a AllowancePlan) -> Self {
        Self::resume(submitter, plan, plan.initial_state())
    }

    /// Re-enter at `state`. Never earlier than the plan's first step, so a
    /// plan without mint cannot be resumed into minting.
    pub fn resume(
        submitter: &'a Submitter<L>,
        plan: &'a AllowancePlan,
        state: AllowanceState,
    ) -> Self {
        AllowanceSequencer {
            submitter,
            plan,
            state: state.max(plan.initial_state()),
        }
    }

    pub fn state(&self) -> AllowanceState {
        self.state
    }

    /// Submit the current step and wait for it. `Ok(None)` once `Ready`.
    pub async fn advance(&mut self, payer: &Account) -> Result<Option<Receipt>, AllowanceError> {
        let state = self.state;
        let Some(call) = self.plan.call_for(state) else {
            self.state = state.next();
            return Ok(None);
        };
        let receipt = self
            .submitter
            .submit(payer, call)
            .await
            .map_err(|source| AllowanceError { state, source })?;
        self.state = state.next();
        info!(
            payer = %payer.address(),
            from = %state,
            to = %self.state,
            "allowance step confirmed"
        );
        Ok(Some(receipt))
    }

    /// Advance until `Ready`, returning every step's receipt.
    pub async fn run(&mut self, payer: &Account) -> Result<Vec<Receipt>, AllowanceError> {
        let mut receipts = Vec::new();
        while self.state != AllowanceState::Ready {
            if let Some(receipt) = self.advance(payer).await? {
                receipts.push(receipt);
            }
        }
        Ok(receipts)
    }
}

/// Run independent accounts' sequences concurrently. Steps of one account
/// stay strictly ordered. Nothing is submitted if a payer appears twice.
pub async fn approve_all<L: LedgerClient>(
    submitter: &Submitter<L>,
    jobs: &[(&Account, &AllowancePlan)],
) -> Result<Vec<Result<Vec<Receipt>, AllowanceError>>, DuplicatePayer> {
    let mut payers = HashSet::with_capacity(jobs.len());
    if let Some((payer, _)) = jobs.iter().find(|(payer, _)| !payers.insert(payer.address())) {
        return Err(DuplicatePayer(payer.address()));
    }

    let runs = jobs.iter().map(|(payer, plan)| async move {
        AllowanceSequencer::new(submitter, plan).run(payer).await
    });
    Ok(join_all(runs).await)
}
