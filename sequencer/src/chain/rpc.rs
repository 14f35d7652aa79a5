// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, Bytes, U256};
use tracing::{debug, info};

use super::drop_erc721::{IDropERC721, NATIVE_TOKEN};
use super::{ChainConfig, ChainError, ChainReader, ChainWriter, ClaimReceipt};

type DropContract = IDropERC721::IDropERC721Instance<DynProvider>;

/// Refuses to talk to a node serving a different chain than configured.
async fn ensure_chain_id(provider: &impl Provider, expected: u64) -> Result<(), ChainError> {
    let actual = provider
        .get_chain_id()
        .await
        .map_err(ChainError::transport)?;
    if actual != expected {
        return Err(ChainError::ChainMismatch { expected, actual });
    }
    Ok(())
}

async fn active_claim_condition(
    contract: &DropContract,
) -> Result<(U256, IDropERC721::ClaimCondition), ChainError> {
    let condition_id = contract
        .getActiveClaimConditionId()
        .call()
        .await
        .map_err(ChainError::contract)?;
    let condition = contract
        .getClaimConditionById(condition_id)
        .call()
        .await
        .map_err(ChainError::contract)?;
    Ok((condition_id, condition))
}

/// Claim value in native token; zero when the condition is priced in an ERC-20.
fn claim_value(condition: &IDropERC721::ClaimCondition, quantity: u64) -> Result<U256, ChainError> {
    if condition.currency != NATIVE_TOKEN {
        return Ok(U256::ZERO);
    }
    condition
        .pricePerToken
        .checked_mul(U256::from(quantity))
        .ok_or_else(|| ChainError::contract(format!("claim value overflows for {quantity} tokens")))
}

/// Empty proof for public claim conditions: limits and price come from the condition.
fn public_allowlist_proof() -> IDropERC721::AllowlistProof {
    IDropERC721::AllowlistProof {
        proof: Vec::new(),
        quantityLimitPerWallet: U256::ZERO,
        pricePerToken: U256::MAX,
        currency: Address::ZERO,
    }
}

pub struct RpcChainReader {
    contract: DropContract,
}

impl RpcChainReader {
    pub async fn connect(config: &ChainConfig) -> Result<Self, ChainError> {
        let provider = ProviderBuilder::new()
            .connect(config.rpc_url.as_str())
            .await
            .map_err(ChainError::transport)?;
        ensure_chain_id(&provider, config.chain_id).await?;
        info!(
            chain_id = config.chain_id,
            contract = %config.contract_address,
            "chain reader connected"
        );
        Ok(Self {
            contract: IDropERC721::new(config.contract_address, provider.erased()),
        })
    }
}

impl ChainReader for RpcChainReader {
    async fn claim_condition_price(&self) -> Result<U256, ChainError> {
        let (_, condition) = active_claim_condition(&self.contract).await?;
        Ok(condition.pricePerToken)
    }

    async fn active_claim_condition_id(&self) -> Result<U256, ChainError> {
        self.contract
            .getActiveClaimConditionId()
            .call()
            .await
            .map_err(ChainError::contract)
    }

    async fn supply_claimed_by_wallet(
        &self,
        condition_id: U256,
        wallet: Address,
    ) -> Result<u64, ChainError> {
        let claimed = self
            .contract
            .getSupplyClaimedByWallet(condition_id, wallet)
            .call()
            .await
            .map_err(ChainError::contract)?;
        u64::try_from(claimed).map_err(|_| ChainError::OutOfRange {
            what: "supply claimed by wallet",
            value: claimed,
        })
    }

    async fn total_claimed_supply(&self) -> Result<U256, ChainError> {
        self.contract
            .nextTokenIdToClaim()
            .call()
            .await
            .map_err(ChainError::contract)
    }

    async fn next_token_id_to_mint(&self) -> Result<U256, ChainError> {
        self.contract
            .nextTokenIdToMint()
            .call()
            .await
            .map_err(ChainError::contract)
    }

    async fn contract_name(&self) -> Result<String, ChainError> {
        self.contract
            .name()
            .call()
            .await
            .map_err(ChainError::contract)
    }
}

pub struct RpcChainWriter {
    contract: DropContract,
    signer_address: Address,
}

impl RpcChainWriter {
    pub async fn connect(config: &ChainConfig, signer: PrivateKeySigner) -> Result<Self, ChainError> {
        let signer_address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect(config.rpc_url.as_str())
            .await
            .map_err(ChainError::transport)?;
        ensure_chain_id(&provider, config.chain_id).await?;
        info!(signer = %signer_address, "chain writer connected");
        Ok(Self {
            contract: IDropERC721::new(config.contract_address, provider.erased()),
            signer_address,
        })
    }

    pub fn signer_address(&self) -> Address {
        self.signer_address
    }
}

impl ChainWriter for RpcChainWriter {
    async fn claim(&self, recipient: Address, quantity: u64) -> Result<ClaimReceipt, ChainError> {
        let (condition_id, condition) = active_claim_condition(&self.contract).await?;
        let value = claim_value(&condition, quantity)?;
        debug!(
            %condition_id,
            price_per_token = %condition.pricePerToken,
            currency = %condition.currency,
            %value,
            "building claim"
        );

        let pending = self
            .contract
            .claim(
                recipient,
                U256::from(quantity),
                condition.currency,
                condition.pricePerToken,
                public_allowlist_proof(),
                Bytes::new(),
            )
            .value(value)
            .send()
            .await
            .map_err(ChainError::contract)?;
        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, %recipient, quantity, "claim transaction sent");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(ChainError::transport)?;
        if !receipt.status() {
            return Err(ChainError::Reverted { tx_hash });
        }
        Ok(ClaimReceipt {
            tx_hash,
            block_number: receipt.block_number(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{IDropERC721, NATIVE_TOKEN, claim_value, public_allowlist_proof};
    use alloy_primitives::{Address, B256, U256};

    fn condition(currency: Address, price: U256) -> IDropERC721::ClaimCondition {
        IDropERC721::ClaimCondition {
            startTimestamp: U256::ZERO,
            maxClaimableSupply: U256::from(1_000_u64),
            supplyClaimed: U256::ZERO,
            quantityLimitPerWallet: U256::from(6_u64),
            merkleRoot: B256::ZERO,
            pricePerToken: price,
            currency,
            metadata: String::new(),
        }
    }

    #[test]
    fn native_claim_pays_price_times_quantity() {
        let value = claim_value(&condition(NATIVE_TOKEN, U256::from(25_u64)), 3).expect("value");
        assert_eq!(value, U256::from(75_u64));
    }

    #[test]
    fn erc20_claim_sends_no_native_value() {
        let token = Address::from_slice(&[0x42; 20]);
        let value = claim_value(&condition(token, U256::from(25_u64)), 3).expect("value");
        assert_eq!(value, U256::ZERO);
    }

    #[test]
    fn overflowing_claim_value_is_an_error() {
        assert!(claim_value(&condition(NATIVE_TOKEN, U256::MAX), 2).is_err());
    }

    #[test]
    fn public_proof_defers_to_condition() {
        let proof = public_allowlist_proof();
        assert!(proof.proof.is_empty());
        assert_eq!(proof.quantityLimitPerWallet, U256::ZERO);
        assert_eq!(proof.pricePerToken, U256::MAX);
        assert_eq!(proof.currency, Address::ZERO);
    }
}
