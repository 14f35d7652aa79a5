// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use alloy::sol;
use alloy_primitives::{Address, address};

/// Currency sentinel for claim conditions priced in the chain's native token.
pub(crate) const NATIVE_TOKEN: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IDropERC721 {
        struct ClaimCondition {
            uint256 startTimestamp;
            uint256 maxClaimableSupply;
            uint256 supplyClaimed;
            uint256 quantityLimitPerWallet;
            bytes32 merkleRoot;
            uint256 pricePerToken;
            address currency;
            string metadata;
        }

        struct AllowlistProof {
            bytes32[] proof;
            uint256 quantityLimitPerWallet;
            uint256 pricePerToken;
            address currency;
        }

        function name() external view returns (string memory);

        function getActiveClaimConditionId() external view returns (uint256);

        function getClaimConditionById(uint256 conditionId)
            external
            view
            returns (ClaimCondition memory condition);

        function getSupplyClaimedByWallet(uint256 conditionId, address claimer)
            external
            view
            returns (uint256 supplyClaimedByWallet);

        function nextTokenIdToClaim() external view returns (uint256);

        function nextTokenIdToMint() external view returns (uint256);

        function claim(
            address receiver,
            uint256 quantity,
            address currency,
            uint256 pricePerToken,
            AllowlistProof calldata allowlistProof,
            bytes memory data
        ) external payable;
    }
}
