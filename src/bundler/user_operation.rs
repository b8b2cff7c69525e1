//! ERC-4337 v0.7 user operations.
//!
//! The bundler speaks the unpacked form over JSON-RPC; the EntryPoint
//! hashes and validates the packed form. `pack` and `hash` bridge the two.

use alloy::primitives::{keccak256, Address, Bytes, B256, U128, U256};
use alloy::sol;
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::bundler::types::{GasEstimate, SponsorResult};

sol! {
    /// On-chain form of a v0.7 user operation, as `EntryPoint.handleOps` takes it.
    #[derive(Debug, PartialEq, Eq)]
    struct PackedUserOperation {
        address sender;
        uint256 nonce;
        bytes initCode;
        bytes callData;
        bytes32 accountGasLimits;
        uint256 preVerificationGas;
        bytes32 gasFees;
        bytes paymasterAndData;
        bytes signature;
    }
}

/// v0.7 user operation in the unpacked JSON-RPC form.
///
/// Factory and paymaster groups are either fully present or absent; absent
/// groups are omitted from the JSON rather than sent as zero values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: U128,
    pub verification_gas_limit: U128,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U128,
    pub max_priority_fee_per_gas: U128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

impl UserOperation {
    /// Start an operation for `sender` with everything but call data zeroed.
    pub fn new(sender: Address, nonce: U256, call_data: Bytes) -> Self {
        Self {
            sender,
            nonce,
            call_data,
            ..Default::default()
        }
    }

    /// Attach the factory that deploys `sender` on first use.
    pub fn with_factory(mut self, factory: Address, factory_data: Bytes) -> Self {
        self.factory = Some(factory);
        self.factory_data = Some(factory_data);
        self
    }

    /// Set the fee caps quoted by the bundler.
    pub fn with_fees(mut self, max_fee_per_gas: U128, max_priority_fee_per_gas: U128) -> Self {
        self.max_fee_per_gas = max_fee_per_gas;
        self.max_priority_fee_per_gas = max_priority_fee_per_gas;
        self
    }

    /// Copy limits from `eth_estimateUserOperationGas`.
    pub fn apply_gas_estimate(&mut self, estimate: &GasEstimate) {
        self.pre_verification_gas = estimate.pre_verification_gas;
        self.verification_gas_limit = estimate.verification_gas_limit;
        self.call_gas_limit = estimate.call_gas_limit;
        if self.paymaster.is_some() {
            if let Some(limit) = estimate.paymaster_verification_gas_limit {
                self.paymaster_verification_gas_limit = Some(limit);
            }
            if let Some(limit) = estimate.paymaster_post_op_gas_limit {
                self.paymaster_post_op_gas_limit = Some(limit);
            }
        }
    }

    /// Copy the paymaster fields and limits returned by a sponsorship call.
    pub fn apply_sponsorship(&mut self, sponsor: &SponsorResult) {
        self.paymaster = Some(sponsor.paymaster);
        self.paymaster_data = Some(sponsor.paymaster_data.clone());
        self.paymaster_verification_gas_limit = Some(sponsor.paymaster_verification_gas_limit);
        self.paymaster_post_op_gas_limit = Some(sponsor.paymaster_post_op_gas_limit);
        self.pre_verification_gas = sponsor.pre_verification_gas;
        self.verification_gas_limit = sponsor.verification_gas_limit;
        self.call_gas_limit = sponsor.call_gas_limit;
    }

    /// `factory || factoryData`, or empty when the account already exists.
    pub fn init_code(&self) -> Bytes {
        match self.factory {
            Some(factory) => {
                let mut init_code = factory.to_vec();
                if let Some(data) = &self.factory_data {
                    init_code.extend_from_slice(data);
                }
                init_code.into()
            }
            None => Bytes::new(),
        }
    }

    /// `paymaster || verificationGas || postOpGas || paymasterData`, or empty.
    pub fn paymaster_and_data(&self) -> Bytes {
        match self.paymaster {
            Some(paymaster) => {
                let mut out = paymaster.to_vec();
                out.extend_from_slice(
                    &self
                        .paymaster_verification_gas_limit
                        .unwrap_or_default()
                        .to_be_bytes::<16>(),
                );
                out.extend_from_slice(
                    &self.paymaster_post_op_gas_limit.unwrap_or_default().to_be_bytes::<16>(),
                );
                if let Some(data) = &self.paymaster_data {
                    out.extend_from_slice(data);
                }
                out.into()
            }
            None => Bytes::new(),
        }
    }

    /// Convert to the on-chain packed layout.
    pub fn pack(&self) -> PackedUserOperation {
        PackedUserOperation {
            sender: self.sender,
            nonce: self.nonce,
            initCode: self.init_code(),
            callData: self.call_data.clone(),
            accountGasLimits: concat_128(self.verification_gas_limit, self.call_gas_limit),
            preVerificationGas: self.pre_verification_gas,
            gasFees: concat_128(self.max_priority_fee_per_gas, self.max_fee_per_gas),
            paymasterAndData: self.paymaster_and_data(),
            signature: self.signature.clone(),
        }
    }

    /// The hash the EntryPoint computes in `getUserOpHash`.
    ///
    /// The signature is excluded, so the operation can be hashed, signed, and
    /// then have the signature attached without changing the hash.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        let packed = self.pack();
        let inner = (
            packed.sender,
            packed.nonce,
            keccak256(&packed.initCode),
            keccak256(&packed.callData),
            packed.accountGasLimits,
            packed.preVerificationGas,
            packed.gasFees,
            keccak256(&packed.paymasterAndData),
        )
            .abi_encode();

        keccak256((keccak256(inner), entry_point, U256::from(chain_id)).abi_encode())
    }
}

/// Two 128-bit values in one word, `high` in the upper half.
fn concat_128(high: U128, low: U128) -> B256 {
    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&high.to_be_bytes::<16>());
    word[16..].copy_from_slice(&low.to_be_bytes::<16>());
    B256::from(word)
}
