//! The orchestrator: one canonical path from "send value" to a confirmed
//! `confidentialTransfer`.
//!
//! ```text
//! view -> select -> build request -> prove -> allowance plan   (prepare_*)
//!      -> allowance steps -> confidentialTransfer(proofData)    (execute)
//! ```

use confidential_transfer_lib::{
    mint_in, private_transfer, redeem_out, select_notes, NotePublicKey, NoteFactory, Parties,
    RequestError, SelectError, TransferRequest,
};
use thiserror::Error;
use tracing::info;

use crate::account::Account;
use crate::allowance::{AllowanceError, AllowancePlan, AllowanceSequencer, AllowanceState};
use crate::config::{AllowanceConfig, Contracts};
use crate::contracts;
use crate::gateway::{prove, GatewayError, ProofGateway, ProofResult};
use crate::ledger::{LedgerClient, Receipt};
use crate::submit::{SubmitError, Submitter};
use crate::view::{NoteLedgerView, ViewError};

/// Failure classes callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InsufficientBalance,
    ZeroValue,
    UnbalancedRequest,
    MalformedRequest,
    NoteConstruction,
    ProofGateway,
    NoteView,
    SubmissionError,
    ConfirmationError,
    ConfirmationTimeout,
    AllowanceStepFailed,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Selection(#[from] SelectError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    NoteView(#[from] ViewError),
    #[error("allowance step failed at {state}: {source}")]
    AllowanceStepFailed {
        state: AllowanceState,
        #[source]
        source: SubmitError,
    },
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl From<AllowanceError> for TransferError {
    fn from(err: AllowanceError) -> Self {
        TransferError::AllowanceStepFailed {
            state: err.state,
            source: err.source,
        }
    }
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Selection(SelectError::ZeroValue) => ErrorKind::ZeroValue,
            TransferError::Selection(SelectError::InsufficientBalance { .. }) => {
                ErrorKind::InsufficientBalance
            }
            TransferError::Request(err) | TransferError::Gateway(GatewayError::Request(err)) => {
                request_kind(err)
            }
            TransferError::Gateway(_) => ErrorKind::ProofGateway,
            TransferError::NoteView(_) => ErrorKind::NoteView,
            TransferError::AllowanceStepFailed { .. } => ErrorKind::AllowanceStepFailed,
            TransferError::Submit(err) => submit_kind(err),
        }
    }

    /// Allowance state a retry should resume from, if an allowance step failed.
    pub fn failed_state(&self) -> Option<AllowanceState> {
        match self {
            TransferError::AllowanceStepFailed { state, .. } => Some(*state),
            _ => None,
        }
    }
}

fn request_kind(err: &RequestError) -> ErrorKind {
    match err {
        RequestError::Malformed(_) => ErrorKind::MalformedRequest,
        RequestError::Unbalanced { .. } => ErrorKind::UnbalancedRequest,
        RequestError::NoteConstruction(_) => ErrorKind::NoteConstruction,
    }
}

fn submit_kind(err: &SubmitError) -> ErrorKind {
    match err {
        SubmitError::ChainId(_)
        | SubmitError::Sequence { .. }
        | SubmitError::Signing { .. }
        | SubmitError::Submission { .. } => ErrorKind::SubmissionError,
        SubmitError::Reverted { .. } | SubmitError::Confirmation { .. } => {
            ErrorKind::ConfirmationError
        }
        SubmitError::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
    }
}

/// Everything needed to put a request on-ledger. Keep it to resume after an
/// allowance failure: the proof id the note approval names is bound to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedTransfer {
    pub request: TransferRequest,
    pub proof: ProofResult,
    pub plan: AllowancePlan,
}

pub struct Orchestrator<L, G, V, F> {
    submitter: Submitter<L>,
    gateway: G,
    view: V,
    factory: F,
    contracts: Contracts,
    allowance: AllowanceConfig,
}

impl<L, G, V, F> Orchestrator<L, G, V, F>
where
    L: LedgerClient,
    G: ProofGateway,
    V: NoteLedgerView,
    F: NoteFactory,
{
    pub fn new(
        submitter: Submitter<L>,
        gateway: G,
        view: V,
        factory: F,
        contracts: Contracts,
        allowance: AllowanceConfig,
    ) -> Self {
        Orchestrator {
            submitter,
            gateway,
            view,
            factory,
            contracts,
            allowance,
        }
    }

    pub fn submitter(&self) -> &Submitter<L> {
        &self.submitter
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Private transfer of `value` from `sender`'s notes to `recipient`.
    pub async fn prepare_transfer(
        &self,
        sender: &Account,
        recipient: &NotePublicKey,
        value: u64,
    ) -> Result<PreparedTransfer, TransferError> {
        let notes = self.view.spendable_notes(sender).await?;
        let selection = select_notes(&notes, value)?;
        info!(
            owner = %sender.address(),
            value,
            inputs = selection.notes.len(),
            change = selection.remainder,
            "selected notes"
        );
        let request = private_transfer(
            &self.factory,
            &selection,
            vec![*sender.public_key(); selection.notes.len()],
            sender.public_key(),
            recipient,
            value,
            self.parties(sender),
        )?;
        self.prepare(request).await
    }

    /// One new note per value, paid for from `sender`'s token balance.
    pub async fn prepare_mint_in(
        &self,
        sender: &Account,
        values: &[u64],
    ) -> Result<PreparedTransfer, TransferError> {
        let request = mint_in(&self.factory, sender.public_key(), values, self.parties(sender))?;
        self.prepare(request).await
    }

    /// Release `value` from `sender`'s notes to its token balance.
    pub async fn prepare_redeem(
        &self,
        sender: &Account,
        value: u64,
    ) -> Result<PreparedTransfer, TransferError> {
        let notes = self.view.spendable_notes(sender).await?;
        let selection = select_notes(&notes, value)?;
        let request = redeem_out(
            &self.factory,
            &selection,
            vec![*sender.public_key(); selection.notes.len()],
            sender.public_key(),
            value,
            self.parties(sender),
        )?;
        self.prepare(request).await
    }

    /// Run the allowance steps from `from`, then submit the proof.
    pub async fn execute(
        &self,
        sender: &Account,
        prepared: &PreparedTransfer,
        from: AllowanceState,
    ) -> Result<Receipt, TransferError> {
        AllowanceSequencer::resume(&self.submitter, &prepared.plan, from)
            .run(sender)
            .await?;

        let call =
            contracts::confidential_transfer(self.contracts.zk_asset, &prepared.proof.proof_data);
        let receipt = self.submitter.submit(sender, call).await?;
        info!(
            proof_id = %prepared.proof.proof_id,
            tx_hash = %receipt.tx_hash,
            inputs = prepared.request.input_notes().len(),
            outputs = prepared.request.output_notes().len(),
            "confidential transfer confirmed"
        );
        Ok(receipt)
    }

    pub async fn confidential_transfer(
        &self,
        sender: &Account,
        recipient: &NotePublicKey,
        value: u64,
    ) -> Result<Receipt, TransferError> {
        let prepared = self.prepare_transfer(sender, recipient, value).await?;
        self.execute(sender, &prepared, prepared.plan.initial_state()).await
    }

    pub async fn mint_in(
        &self,
        sender: &Account,
        values: &[u64],
    ) -> Result<Receipt, TransferError> {
        let prepared = self.prepare_mint_in(sender, values).await?;
        self.execute(sender, &prepared, prepared.plan.initial_state()).await
    }

    pub async fn redeem(&self, sender: &Account, value: u64) -> Result<Receipt, TransferError> {
        let prepared = self.prepare_redeem(sender, value).await?;
        self.execute(sender, &prepared, prepared.plan.initial_state()).await
    }

    async fn prepare(&self, request: TransferRequest) -> Result<PreparedTransfer, TransferError> {
        let proof = prove(&self.gateway, &request).await?;
        let plan = AllowancePlan::for_request(&request, &proof, &self.contracts, &self.allowance);
        Ok(PreparedTransfer {
            request,
            proof,
            plan,
        })
    }

    fn parties(&self, sender: &Account) -> Parties {
        Parties {
            sender: sender.address().into_array(),
            public_owner: sender.address().into_array(),
            validator: self.contracts.join_split.into_array(),
        }
    }
}
