//! MagicSpend contract ABIs.
//!
//! Only the entry points this crate reads or encodes are declared.

use alloy::sol;

sol! {
    /// One asset line of an allowance.
    #[derive(Debug, PartialEq, Eq)]
    struct AllowanceAsset {
        address token;
        uint128 amount;
        uint128 chainId;
    }

    /// Spending allowance granted by a staker to the paymaster operator.
    #[derive(Debug, PartialEq, Eq)]
    struct Allowance {
        address account;
        AllowanceAsset[] assets;
        uint48 validUntil;
        uint48 validAfter;
        uint48 salt;
        address operator;
    }

    /// Operator-signed release of funds to a recipient.
    #[derive(Debug, PartialEq, Eq)]
    struct Withdrawal {
        address token;
        uint128 amount;
        uint128 chainId;
        address recipient;
        uint48 validUntil;
        uint48 validAfter;
        uint48 salt;
    }

    interface MagicSpendStakeManager {
        function getAllowanceHash(Allowance calldata allowance) external view returns (bytes32);
    }

    interface MagicSpendWithdrawalManager {
        function withdraw(Withdrawal calldata withdrawal, bytes calldata signature) external;
    }
}
