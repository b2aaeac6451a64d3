use std::future::Future;

use alloy::primitives::{Address, TxHash, U256};
use tracing::{debug, error, info, instrument, warn};

use super::{
    snapshot::{LiquidationPreview, PositionReport},
    status::{OperationKind, OperationReceipt, StatusStage},
    AccountStateCache,
};
use crate::{
    blockchain_manager::{BindingError, PendingTransaction},
    errors::CacheError,
    utils::{constants::TOKEN_DECIMALS, math_helper::parse_amount},
};

/// Which token the engine pulls from the account
#[derive(Debug, Clone, Copy)]
enum Spend {
    Collateral,
    Stablecoin,
}

impl AccountStateCache {
    #[instrument("DEPOSIT_COLLATERAL", skip_all)]
    pub async fn deposit_collateral(&self, amount: &str) -> Result<OperationReceipt, CacheError> {
        let operation = OperationKind::DepositCollateral;
        let outcome = async {
            let amount = parse_amount(amount, TOKEN_DECIMALS)?;
            let account = self.require_account().await?;
            let token = self.bindings().collateral_token();

            let mut transactions = Vec::new();
            self.ensure_allowance(
                operation,
                Spend::Collateral,
                account,
                amount,
                "Approving WETH for DSCEngine...",
                &mut transactions,
            )
            .await?;
            self.submit(
                operation,
                "Depositing collateral...",
                self.bindings().deposit_collateral(account, token, amount),
                &mut transactions,
            )
            .await?;
            Ok::<_, CacheError>(transactions)
        }
        .await;

        self.complete(operation, outcome, "Success! Collateral deposited.")
            .await
    }

    #[instrument("DEPOSIT_AND_MINT", skip_all)]
    pub async fn deposit_collateral_and_mint_dsc(
        &self,
        collateral_amount: &str,
        dsc_amount: &str,
    ) -> Result<OperationReceipt, CacheError> {
        let operation = OperationKind::DepositCollateralAndMintDsc;
        let outcome = async {
            let collateral_amount = parse_amount(collateral_amount, TOKEN_DECIMALS)?;
            let dsc_amount = parse_amount(dsc_amount, TOKEN_DECIMALS)?;
            let account = self.require_account().await?;
            let token = self.bindings().collateral_token();

            let mut transactions = Vec::new();
            self.ensure_allowance(
                operation,
                Spend::Collateral,
                account,
                collateral_amount,
                "Approving WETH for DSCEngine...",
                &mut transactions,
            )
            .await?;
            self.submit(
                operation,
                "Depositing collateral and minting DSC...",
                self.bindings().deposit_collateral_and_mint_dsc(
                    account,
                    token,
                    collateral_amount,
                    dsc_amount,
                ),
                &mut transactions,
            )
            .await?;
            Ok::<_, CacheError>(transactions)
        }
        .await;

        self.complete(operation, outcome, "Success! Deposited WETH and minted DSC.")
            .await
    }

    #[instrument("MINT_DSC", skip_all)]
    pub async fn mint_dsc(&self, amount: &str) -> Result<OperationReceipt, CacheError> {
        let operation = OperationKind::MintDsc;
        let outcome = async {
            let amount = parse_amount(amount, TOKEN_DECIMALS)?;
            let account = self.require_account().await?;

            let mut transactions = Vec::new();
            self.submit(
                operation,
                "Minting DSC...",
                self.bindings().mint_dsc(account, amount),
                &mut transactions,
            )
            .await?;
            Ok::<_, CacheError>(transactions)
        }
        .await;

        self.complete(operation, outcome, "DSC minted successfully!")
            .await
    }

    #[instrument("BURN_DSC", skip_all)]
    pub async fn burn_dsc(&self, amount: &str) -> Result<OperationReceipt, CacheError> {
        let operation = OperationKind::BurnDsc;
        let outcome = async {
            let amount = parse_amount(amount, TOKEN_DECIMALS)?;
            let account = self.require_account().await?;

            let mut transactions = Vec::new();
            self.ensure_allowance(
                operation,
                Spend::Stablecoin,
                account,
                amount,
                "Approving DSC for DSCEngine...",
                &mut transactions,
            )
            .await?;
            self.submit(
                operation,
                "Burning DSC...",
                self.bindings().burn_dsc(account, amount),
                &mut transactions,
            )
            .await?;
            Ok::<_, CacheError>(transactions)
        }
        .await;

        self.complete(operation, outcome, "DSC burned successfully!")
            .await
    }

    #[instrument("REDEEM_COLLATERAL", skip_all)]
    pub async fn redeem_collateral(&self, amount: &str) -> Result<OperationReceipt, CacheError> {
        let operation = OperationKind::RedeemCollateral;
        let outcome = async {
            let amount = parse_amount(amount, TOKEN_DECIMALS)?;
            let account = self.require_account().await?;
            let token = self.bindings().collateral_token();

            let mut transactions = Vec::new();
            self.submit(
                operation,
                "Withdrawing collateral...",
                self.bindings().redeem_collateral(account, token, amount),
                &mut transactions,
            )
            .await?;
            Ok::<_, CacheError>(transactions)
        }
        .await;

        self.complete(operation, outcome, "Collateral redeemed successfully!")
            .await
    }

    /// Burns `dsc_amount` and withdraws `collateral_amount` in one engine call.
    #[instrument("REDEEM_FOR_DSC", skip_all)]
    pub async fn redeem_collateral_for_dsc(
        &self,
        collateral_amount: &str,
        dsc_amount: &str,
    ) -> Result<OperationReceipt, CacheError> {
        let operation = OperationKind::RedeemCollateralForDsc;
        let outcome = async {
            let collateral_amount = parse_amount(collateral_amount, TOKEN_DECIMALS)?;
            let dsc_amount = parse_amount(dsc_amount, TOKEN_DECIMALS)?;
            let account = self.require_account().await?;
            let token = self.bindings().collateral_token();

            let mut transactions = Vec::new();
            self.ensure_allowance(
                operation,
                Spend::Stablecoin,
                account,
                dsc_amount,
                "Approving DSCEngine to burn DSC...",
                &mut transactions,
            )
            .await?;
            self.submit(
                operation,
                "Redeeming collateral for DSC...",
                self.bindings()
                    .redeem_collateral_for_dsc(account, token, collateral_amount, dsc_amount),
                &mut transactions,
            )
            .await?;
            Ok::<_, CacheError>(transactions)
        }
        .await;

        self.complete(operation, outcome, "Success! Collateral redeemed for DSC.")
            .await
    }

    /// Covers `debt_to_cover` of `user`'s debt in exchange for their `collateral_token`.
    /// The engine rejects healthy positions.
    #[instrument("LIQUIDATE", skip_all, fields(user = %user))]
    pub async fn liquidate(
        &self,
        collateral_token: Address,
        user: Address,
        debt_to_cover: &str,
    ) -> Result<OperationReceipt, CacheError> {
        let operation = OperationKind::Liquidate;
        let outcome = async {
            let debt_to_cover = parse_amount(debt_to_cover, TOKEN_DECIMALS)?;
            let account = self.require_account().await?;

            let mut transactions = Vec::new();
            self.ensure_allowance(
                operation,
                Spend::Stablecoin,
                account,
                debt_to_cover,
                "Approving DSC for liquidation...",
                &mut transactions,
            )
            .await?;
            self.submit(
                operation,
                "Executing liquidation...",
                self.bindings()
                    .liquidate(account, collateral_token, user, debt_to_cover),
                &mut transactions,
            )
            .await?;
            Ok::<_, CacheError>(transactions)
        }
        .await;

        self.complete(operation, outcome, "Liquidation successful!")
            .await
    }

    #[instrument("WRAP_NATIVE", skip_all)]
    pub async fn wrap_native(&self, amount: &str) -> Result<OperationReceipt, CacheError> {
        let operation = OperationKind::WrapNative;
        let outcome = async {
            let amount = parse_amount(amount, TOKEN_DECIMALS)?;
            let account = self.require_account().await?;

            let mut transactions = Vec::new();
            self.submit(
                operation,
                "Wrapping ETH to WETH...",
                self.bindings().wrap_native(account, amount),
                &mut transactions,
            )
            .await?;
            Ok::<_, CacheError>(transactions)
        }
        .await;

        self.complete(operation, outcome, "Successfully converted ETH to WETH.")
            .await
    }

    #[instrument("UNWRAP_TOKEN", skip_all)]
    pub async fn unwrap_token(&self, amount: &str) -> Result<OperationReceipt, CacheError> {
        let operation = OperationKind::UnwrapToken;
        let outcome = async {
            let amount = parse_amount(amount, TOKEN_DECIMALS)?;
            let account = self.require_account().await?;

            let mut transactions = Vec::new();
            self.submit(
                operation,
                "Unwrapping WETH to ETH...",
                self.bindings().unwrap_token(account, amount),
                &mut transactions,
            )
            .await?;
            Ok::<_, CacheError>(transactions)
        }
        .await;

        self.complete(operation, outcome, "Successfully converted WETH to ETH.")
            .await
    }

    /// Reads the engine's view of any account. Works without a connected wallet.
    #[instrument("CHECK_POSITION", skip_all, fields(user = %user))]
    pub async fn check_position(&self, user: Address) -> Result<PositionReport, CacheError> {
        let bindings = self.bindings();
        let (health_factor, min_health_factor, information) = futures::try_join!(
            bindings.health_factor(user),
            bindings.min_health_factor(),
            bindings.account_information(user),
        )
        .map_err(CacheError::read_failure)?;

        Ok(PositionReport {
            address: user,
            health_factor,
            min_health_factor,
            total_dsc_minted: information.total_dsc_minted,
            collateral_value_usd: information.collateral_value_in_usd,
            liquidatable: health_factor < min_health_factor,
        })
    }

    /// Collateral paid out for covering `debt_to_cover` DSC, bonus included.
    pub async fn liquidation_preview(
        &self,
        collateral_token: Address,
        debt_to_cover: &str,
    ) -> Result<LiquidationPreview, CacheError> {
        let debt_to_cover = parse_amount(debt_to_cover, TOKEN_DECIMALS)?;

        let bindings = self.bindings();
        let (base_collateral, bonus, precision) = futures::try_join!(
            bindings.token_amount_from_usd(collateral_token, debt_to_cover),
            bindings.liquidation_bonus(),
            bindings.liquidation_precision(),
        )
        .map_err(CacheError::read_failure)?;

        let bonus_collateral = base_collateral
            .saturating_mul(bonus)
            .checked_div(precision)
            .ok_or_else(|| CacheError::ReadFailure("liquidation precision is zero".to_string()))?;

        let total_collateral = base_collateral.saturating_add(bonus_collateral);
        let total_collateral_value_usd = bindings
            .usd_value(collateral_token, total_collateral)
            .await
            .map_err(CacheError::read_failure)?;

        Ok(LiquidationPreview {
            collateral_token,
            debt_to_cover,
            base_collateral,
            bonus_collateral,
            total_collateral,
            total_collateral_value_usd,
        })
    }

    pub async fn collateral_tokens(&self) -> Result<Vec<Address>, CacheError> {
        self.bindings()
            .collateral_tokens()
            .await
            .map_err(CacheError::read_failure)
    }

    async fn require_account(&self) -> Result<Address, CacheError> {
        self.connection()
            .await
            .address()
            .ok_or(CacheError::NotConnected)
    }

    /// Submits an approval only when the engine's current allowance is short of `amount`
    async fn ensure_allowance(
        &self,
        operation: OperationKind,
        spend: Spend,
        account: Address,
        amount: U256,
        status: &str,
        transactions: &mut Vec<TxHash>,
    ) -> Result<(), CacheError> {
        let bindings = self.bindings();
        let allowance = match spend {
            Spend::Collateral => bindings.collateral_allowance(account).await,
            Spend::Stablecoin => bindings.stablecoin_allowance(account).await,
        }
        .map_err(CacheError::read_failure)?;

        if allowance >= amount {
            debug!("{:?} allowance {} covers {}", spend, allowance, amount);
            return Ok(());
        }

        let approval = match spend {
            Spend::Collateral => bindings.approve_collateral(account, amount),
            Spend::Stablecoin => bindings.approve_stablecoin(account, amount),
        };
        self.submit(operation, status, approval, transactions).await
    }

    /// Sends one transaction and waits for it to be mined
    async fn submit<F>(
        &self,
        operation: OperationKind,
        status: &str,
        submission: F,
        transactions: &mut Vec<TxHash>,
    ) -> Result<(), CacheError>
    where
        F: Future<Output = Result<PendingTransaction, BindingError>>,
    {
        self.report(operation, StatusStage::InProgress, status);

        let pending = submission.await.map_err(CacheError::from_transaction)?;
        info!("{} transaction sent: {}", operation, pending.tx_hash());

        let tx_hash = pending.confirm().await.map_err(CacheError::from_transaction)?;
        debug!("{} transaction confirmed: {}", operation, tx_hash);

        transactions.push(tx_hash);
        Ok(())
    }

    /// Refreshes once after success and reports the outcome
    async fn complete(
        &self,
        operation: OperationKind,
        outcome: Result<Vec<TxHash>, CacheError>,
        success: &str,
    ) -> Result<OperationReceipt, CacheError> {
        let transactions = match outcome {
            Ok(transactions) => transactions,
            Err(e) => {
                match &e {
                    CacheError::Validation(_) | CacheError::NotConnected => {
                        warn!("{} not sent: {}", operation, e)
                    }
                    _ => error!("{} failed: {}", operation, e),
                }
                self.report(operation, StatusStage::Failed, e.status_message());
                return Err(e);
            }
        };

        let (snapshot, refresh_error) = match self.refresh().await {
            Ok(snapshot) => (snapshot, None),
            Err(e) => {
                warn!("{} confirmed but refresh failed: {}", operation, e);
                (self.snapshot(), Some(e))
            }
        };

        info!(
            "{} confirmed in {} transaction(s)",
            operation,
            transactions.len()
        );
        self.report(operation, StatusStage::Success, success);

        Ok(OperationReceipt {
            operation,
            transactions,
            status: success.to_string(),
            snapshot,
            refresh_error,
        })
    }
}
