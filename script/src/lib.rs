//! Client-side orchestration of confidential transfers.
//!
//! Stages, each consuming the previous stage's value:
//!   view      - reconstruct the account's spendable notes from ledger events
//!   select    - pick notes covering the amount (confidential-transfer-lib)
//!   request   - build the balanced join-split request (confidential-transfer-lib)
//!   gateway   - obtain the proof payload and proof id
//!   allowance - mint / approve ERC20 / approve note spend, one confirmed tx at a time
//!   submit    - nonce assignment, local signing, broadcast, confirmation wait

pub mod account;
pub mod allowance;
pub mod config;
pub mod contracts;
pub mod gateway;
pub mod ledger;
pub mod notes;
pub mod submit;
pub mod transfer;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use account::{Account, AccountKey, KeyError};
pub use allowance::{
    approve_all, AllowanceError, AllowancePlan, AllowanceSequencer, AllowanceState, DuplicatePayer,
};
pub use config::{AllowanceConfig, ClientConfig, Contracts, NoteApproval, SubmitterConfig};
pub use gateway::{prove, GatewayError, LocalGateway, ProofGateway, ProofId, ProofResult};
pub use ledger::{LedgerClient, LedgerError, Receipt, RpcLedger, SignedTransaction};
pub use notes::LocalNotes;
pub use submit::{ContractCall, SubmitError, Submitter};
pub use transfer::{ErrorKind, Orchestrator, PreparedTransfer, TransferError};
pub use view::{EventNoteView, NoteDecoder, NoteLedgerView, ViewError};
