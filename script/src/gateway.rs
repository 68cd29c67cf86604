//! Proof gateway seam.
//!
//! Proof construction belongs to an external library; the orchestrator only
//! needs the opaque proof bytes and the id the note registry approves.

use alloy::primitives::{keccak256, Bytes, B256};
use confidential_transfer_lib::{RequestError, TransferRequest};
use thiserror::Error;
use tracing::debug;

/// Hash of proof output 0, the handle `publicApprove` refers to.
pub type ProofId = B256;

/// Encoded outputs of a join-split proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedOutput(pub Bytes);

/// One output of a proof (notes in, notes out, public value).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofOutput(pub Bytes);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinSplitProof {
    pub proof_data: Bytes,
    pub expected_output: ExpectedOutput,
}

/// Opaque proof plus its id. Never modified after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofResult {
    pub proof_data: Bytes,
    pub proof_id: ProofId,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("proof construction failed: {0}")]
    Construction(String),
    #[error("proof has no output at index {index}")]
    MissingOutput { index: usize },
}

#[allow(async_fn_in_trait)]
pub trait ProofGateway {
    async fn build_join_split(
        &self,
        request: &TransferRequest,
    ) -> Result<JoinSplitProof, GatewayError>;

    fn proof_output(
        &self,
        expected: &ExpectedOutput,
        index: usize,
    ) -> Result<ProofOutput, GatewayError>;

    fn hash_proof_output(&self, output: &ProofOutput) -> ProofId;
}

/// Re-check `request`, build its proof and derive the id from output 0.
pub async fn prove<G: ProofGateway>(
    gateway: &G,
    request: &TransferRequest,
) -> Result<ProofResult, GatewayError> {
    request.check()?;
    let proof = gateway.build_join_split(request).await?;
    let output = gateway.proof_output(&proof.expected_output, 0)?;
    let proof_id = gateway.hash_proof_output(&output);
    debug!(%proof_id, proof_len = proof.proof_data.len(), "join-split proof built");
    Ok(ProofResult {
        proof_data: proof.proof_data,
        proof_id,
    })
}

/// Deterministic stand-in for a real prover. ZkAsset contracts deployed
/// against a development validator accept its proof data.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalGateway;

impl ProofGateway for LocalGateway {
    async fn build_join_split(
        &self,
        request: &TransferRequest,
    ) -> Result<JoinSplitProof, GatewayError> {
        let proof_data =
            serde_json::to_vec(request).map_err(|e| GatewayError::Construction(e.to_string()))?;
        let expected = keccak256(&proof_data);
        Ok(JoinSplitProof {
            proof_data: proof_data.into(),
            expected_output: ExpectedOutput(Bytes::copy_from_slice(expected.as_slice())),
        })
    }

    fn proof_output(
        &self,
        expected: &ExpectedOutput,
        index: usize,
    ) -> Result<ProofOutput, GatewayError> {
        // A join-split proof has a single output.
        if index != 0 {
            return Err(GatewayError::MissingOutput { index });
        }
        let mut preimage = expected.0.to_vec();
        preimage.extend_from_slice(&(index as u64).to_be_bytes());
        Ok(ProofOutput(Bytes::copy_from_slice(keccak256(&preimage).as_slice())))
    }

    fn hash_proof_output(&self, output: &ProofOutput) -> ProofId {
        keccak256(&output.0)
    }
}
