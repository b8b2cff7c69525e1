//! SimpleAccount v0.7 and EntryPoint ABIs.

use alloy::primitives::{bytes, Bytes};
use alloy::sol;

sol! {
    interface SimpleAccountFactory {
        function createAccount(address owner, uint256 salt) external returns (address ret);
        function getAddress(address owner, uint256 salt) external view returns (address);
    }

    interface SimpleAccount {
        function execute(address dest, uint256 value, bytes calldata func) external;
    }

    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }
}

/// Stub signature SimpleAccount accepts during simulation.
///
/// Recovers to some address without reverting, so estimation charges the
/// same ecrecover cost as a real signature.
pub fn dummy_signature() -> Bytes {
    bytes!("fffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolCall;

    #[test]
    fn test_selectors() {
        assert_eq!(SimpleAccount::executeCall::SELECTOR, [0xb6, 0x1d, 0x27, 0xf6]);
        assert_eq!(SimpleAccountFactory::createAccountCall::SELECTOR, [0x5f, 0xbf, 0xb9, 0xcf]);
        assert_eq!(SimpleAccountFactory::getAddressCall::SELECTOR, [0x8c, 0xb8, 0x4e, 0x18]);
        assert_eq!(IEntryPoint::getNonceCall::SELECTOR, [0x35, 0x56, 0x7e, 0x1a]);
    }

    #[test]
    fn test_dummy_signature_shape() {
        let sig = dummy_signature();
        assert_eq!(sig.len(), 65);
        assert_eq!(sig[64], 0x1c);
    }
}
