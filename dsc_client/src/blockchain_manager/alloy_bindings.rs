use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::Provider,
};
use async_trait::async_trait;
use dsc_contracts::{
    DSCEngine::{self, DSCEngineInstance},
    DecentralizedStableCoin::{self, DecentralizedStableCoinInstance},
    WrappedNative::{self, WrappedNativeInstance},
};

use super::bindings::{AccountInformation, BindingError, ContractBindings, PendingTransaction};
use crate::config::LocalConfig;

/// `ContractBindings` over an alloy provider.
///
/// Reads go through plain `eth_call`s; writes are signed by the provider's
/// wallet for the `from` account and handed back as `PendingTransaction`s.
pub struct AlloyContractBindings<P: Provider<Ethereum>> {
    provider: P,
    chain_id: u64,
    engine: DSCEngineInstance<(), P>,
    stablecoin: DecentralizedStableCoinInstance<(), P>,
    collateral_token: WrappedNativeInstance<(), P>,
}

impl<P: Provider<Ethereum> + Clone> AlloyContractBindings<P> {
    pub fn new(provider: P, local_config: &LocalConfig) -> Self {
        Self {
            engine: DSCEngine::new(local_config.dsc_engine_address, provider.clone()),
            stablecoin: DecentralizedStableCoin::new(local_config.dsc_address, provider.clone()),
            collateral_token: WrappedNative::new(
                local_config.collateral_token_address,
                provider.clone(),
            ),
            chain_id: local_config.chain_id,
            provider,
        }
    }
}

#[async_trait]
impl<P> ContractBindings for AlloyContractBindings<P>
where
    P: Provider<Ethereum> + Clone + 'static,
{
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn engine_address(&self) -> Address {
        *self.engine.address()
    }

    fn collateral_token(&self) -> Address {
        *self.collateral_token.address()
    }

    async fn native_balance(&self, account: Address) -> Result<U256, BindingError> {
        self.provider
            .get_balance(account)
            .await
            .map_err(BindingError::from_transport)
    }

    async fn collateral_token_balance(&self, account: Address) -> Result<U256, BindingError> {
        Ok(self
            .collateral_token
            .balanceOf(account)
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn stablecoin_balance(&self, account: Address) -> Result<U256, BindingError> {
        Ok(self
            .stablecoin
            .balanceOf(account)
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn collateral_balance_of_user(
        &self,
        account: Address,
        token: Address,
    ) -> Result<U256, BindingError> {
        Ok(self
            .engine
            .getCollateralBalanceOfUser(account, token)
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn account_collateral_value(&self, account: Address) -> Result<U256, BindingError> {
        Ok(self
            .engine
            .getAccountCollateralValue(account)
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn health_factor(&self, account: Address) -> Result<U256, BindingError> {
        Ok(self
            .engine
            .getHealthFactor(account)
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn account_information(
        &self,
        account: Address,
    ) -> Result<AccountInformation, BindingError> {
        let information = self
            .engine
            .getAccountInformation(account)
            .call()
            .await
            .map_err(BindingError::from_contract)?;

        Ok(AccountInformation {
            total_dsc_minted: information.totalDscMinted,
            collateral_value_in_usd: information.collateralValueInUsd,
        })
    }

    async fn usd_value(&self, token: Address, amount: U256) -> Result<U256, BindingError> {
        Ok(self
            .engine
            .getUsdValue(token, amount)
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn token_amount_from_usd(
        &self,
        token: Address,
        usd_amount: U256,
    ) -> Result<U256, BindingError> {
        Ok(self
            .engine
            .getTokenAmountFromUsd(token, usd_amount)
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn liquidation_bonus(&self) -> Result<U256, BindingError> {
        Ok(self
            .engine
            .getLiquidationBonus()
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn liquidation_precision(&self) -> Result<U256, BindingError> {
        Ok(self
            .engine
            .getLiquidationPrecision()
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn min_health_factor(&self) -> Result<U256, BindingError> {
        Ok(self
            .engine
            .getMinHealthFactor()
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn collateral_tokens(&self) -> Result<Vec<Address>, BindingError> {
        Ok(self
            .engine
            .getCollateralTokens()
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn collateral_allowance(&self, owner: Address) -> Result<U256, BindingError> {
        Ok(self
            .collateral_token
            .allowance(owner, self.engine_address())
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn stablecoin_allowance(&self, owner: Address) -> Result<U256, BindingError> {
        Ok(self
            .stablecoin
            .allowance(owner, self.engine_address())
            .call()
            .await
            .map_err(BindingError::from_contract)?
            ._0)
    }

    async fn approve_collateral(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .collateral_token
            .approve(self.engine_address(), amount)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn approve_stablecoin(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .stablecoin
            .approve(self.engine_address(), amount)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn deposit_collateral(
        &self,
        from: Address,
        token: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .engine
            .depositCollateral(token, amount)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn deposit_collateral_and_mint_dsc(
        &self,
        from: Address,
        token: Address,
        amount_collateral: U256,
        amount_dsc: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .engine
            .depositCollateralAndMintDsc(token, amount_collateral, amount_dsc)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn mint_dsc(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .engine
            .mintDsc(amount)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn burn_dsc(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .engine
            .burnDsc(amount)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn redeem_collateral(
        &self,
        from: Address,
        token: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .engine
            .redeemCollateral(token, amount)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn redeem_collateral_for_dsc(
        &self,
        from: Address,
        token: Address,
        amount_collateral: U256,
        amount_dsc: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .engine
            .redeemCollateralForDsc(token, amount_collateral, amount_dsc)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn liquidate(
        &self,
        from: Address,
        collateral: Address,
        user: Address,
        debt_to_cover: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .engine
            .liquidate(collateral, user, debt_to_cover)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn wrap_native(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .collateral_token
            .deposit()
            .from(from)
            .value(amount)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }

    async fn unwrap_token(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        let pending = self
            .collateral_token
            .withdraw(amount)
            .from(from)
            .send()
            .await
            .map_err(BindingError::from_contract)?;
        Ok(PendingTransaction::from_alloy(pending))
    }
}
