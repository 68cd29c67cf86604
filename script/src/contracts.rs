//! Contract bindings (inline, no ABI files needed) and calldata for every
//! step of the protocol.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::gateway::ProofId;
use crate::submit::ContractCall;

sol! {
    #[sol(rpc)]
    interface IERC20Mintable {
        function mint(address to, uint256 amount) external;
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }

    #[sol(rpc)]
    interface INoteRegistry {
        function publicApprove(bytes32 proofHash, uint256 value) external;
    }

    #[sol(rpc)]
    interface IZkAsset {
        function confidentialTransfer(bytes calldata proofData) external;
        function noteRegistry() external view returns (address);

        event CreateNote(address indexed owner, bytes32 indexed noteHash, bytes metadata);
        event DestroyNote(address indexed owner, bytes32 indexed noteHash, bytes metadata);
    }
}

pub fn mint(token: Address, to: Address, amount: U256) -> ContractCall {
    ContractCall::new(
        "mint",
        token,
        IERC20Mintable::mintCall { to, amount }.abi_encode(),
    )
}

pub fn approve(token: Address, spender: Address, amount: U256) -> ContractCall {
    ContractCall::new(
        "approve",
        token,
        IERC20Mintable::approveCall { spender, amount }.abi_encode(),
    )
}

pub fn public_approve(registry: Address, proof_id: ProofId, value: U256) -> ContractCall {
    ContractCall::new(
        "publicApprove",
        registry,
        INoteRegistry::publicApproveCall {
            proofHash: proof_id,
            value,
        }
        .abi_encode(),
    )
}

pub fn confidential_transfer(zk_asset: Address, proof_data: &Bytes) -> ContractCall {
    ContractCall::new(
        "confidentialTransfer",
        zk_asset,
        IZkAsset::confidentialTransferCall {
            proofData: proof_data.clone(),
        }
        .abi_encode(),
    )
}
