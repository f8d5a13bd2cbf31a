//! Order execution
//!
//! Sequences approvals and the router call for a signed order. Three paths:
//! - full sale: approve the payment token, then `executeFullSaleOrder`
//! - full sale with auto-liquidate: approvals for payment and every debt
//!   token, then one `multicall` of purchase, repays and withdrawals
//! - partial sale: approve the repay token, then `excutePartialSellOrder`
//!
//! Transactions are never resubmitted automatically.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use debtx_backend::OrderRecord;
use debtx_core::fixed_point::apply_basis_points;
use debtx_core::{ChainConfig, Error, ExecutionConfig, OrderError, OrderStatus, TxError, TxStage};
use evm_tx::contracts::{FullSellOrder, PartialSellOrder};
use evm_tx::{
    approve, poll_until, wait_for_receipt, AccountData, ChainRpc, ContractCall, ContractReader,
    PollOutcome, RetryPolicy, RouterCalls, RpcError, TxReceipt,
};
use futures::future::try_join_all;

use crate::calculator::{base_to_token_amount, quote_full_sale};
use crate::constants::order::{INTEREST_RATE_STABLE, INTEREST_RATE_VARIABLE};
use crate::lifecycle::{evaluate, now_secs, receipt_error};
use crate::order::Order;
use crate::phase::{PhaseReporter, TxPhase};

/// Caller choices for one execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Repay all debt and withdraw all collateral in the same transaction
    pub auto_liquidate: bool,
    /// Floor passed to `executeFullSaleOrder`
    pub min_profit: U256,
    /// Run the sync countdown after the transaction is mined
    pub wait_for_sync: bool,
}

/// Reserves a position touches. Balances are always read fresh from chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionAssets {
    pub debt_assets: Vec<Address>,
    pub collateral_assets: Vec<Address>,
}

#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub order: Order,
    /// Backend status; the router cannot see off-chain cancellations
    pub status: OrderStatus,
    /// Only used by auto-liquidate
    pub position: PositionAssets,
}

impl ExecuteRequest {
    pub fn new(order: Order, status: OrderStatus) -> Self {
        Self {
            order,
            status,
            position: PositionAssets::default(),
        }
    }

    /// Order and status of a stored record
    pub fn from_record(record: &OrderRecord) -> Result<Self, Error> {
        Ok(Self::new(Order::from_record(record)?, record.status))
    }

    pub fn with_position(mut self, position: PositionAssets) -> Self {
        self.position = position;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Repayment {
    asset: Address,
    amount: U256,
    rate_mode: u8,
}

/// Fresh repay and withdraw legs of an auto-liquidate batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LiquidationPlan {
    repayments: Vec<Repayment>,
    withdrawals: Vec<Address>,
}

pub struct OrderExecutor {
    rpc: Arc<dyn ChainRpc>,
    router: RouterCalls,
    pool: Address,
    oracle: Address,
    config: ExecutionConfig,
    phases: PhaseReporter,
}

impl OrderExecutor {
    pub fn new(rpc: Arc<dyn ChainRpc>, chain: &ChainConfig, config: ExecutionConfig) -> Self {
        Self {
            rpc,
            router: RouterCalls::new(chain.router_address),
            pool: chain.pool_address,
            oracle: chain.oracle_address,
            config,
            phases: PhaseReporter::new(),
        }
    }

    pub fn phases(&self) -> &PhaseReporter {
        &self.phases
    }

    fn reader(&self) -> ContractReader<'_, dyn ChainRpc> {
        ContractReader::new(self.rpc.as_ref(), self.config.rpc_timeout())
    }

    /// Execute a signed order. Returns the hash of the settling transaction.
    pub async fn execute(
        &self,
        request: &ExecuteRequest,
        options: &ExecuteOptions,
    ) -> Result<B256, Error> {
        self.phases.reset();

        let result = match &request.order {
            Order::Full(order) => {
                self.execute_full(order, request.status, &request.position, options)
                    .await
            }
            Order::Partial(order) => self.execute_partial(order, request.status, options).await,
        };

        match &result {
            Ok(tx_hash) => {
                tracing::info!(debt = %request.order.debt(), tx_hash = %tx_hash, "Order executed")
            }
            Err(e) => {
                self.phases.set(TxPhase::Failed {
                    stage: e.stage().unwrap_or(TxStage::Execution),
                    message: e.to_string(),
                });
                tracing::warn!(debt = %request.order.debt(), error = %e, "Order execution failed");
            }
        }
        result
    }

    async fn execute_full(
        &self,
        order: &FullSellOrder,
        status: OrderStatus,
        position: &PositionAssets,
        options: &ExecuteOptions,
    ) -> Result<B256, Error> {
        let wrapped = Order::Full(order.clone());
        let account = self.preflight(&wrapped, status).await?;

        let quote = quote_full_sale(&account, wrapped.bonus_bps());
        let reader = self.reader();
        let (price, decimals) = futures::try_join!(
            reader.asset_price(self.oracle, order.token),
            reader.decimals(order.token),
        )
        .map_err(|e| Error::tx(TxStage::Execution, e.to_tx_error()))?;
        let payment = base_to_token_amount(
            quote.payment_base,
            price,
            decimals,
            &order.token.to_string(),
        )?;
        let payment = self.with_buffer(payment);
        tracing::debug!(
            debt = %order.title.debt,
            payment_base = %quote.payment_base,
            payment = %payment,
            "Full sale quote"
        );

        let execute = self
            .router
            .execute_full_sale(order.clone(), options.min_profit);

        let call = if options.auto_liquidate {
            let plan = self.liquidation_plan(order.title.debt, position).await?;

            let mut required: BTreeMap<Address, U256> = BTreeMap::new();
            required.insert(order.token, payment);
            for repayment in &plan.repayments {
                let entry = required.entry(repayment.asset).or_default();
                *entry = entry.saturating_add(repayment.amount);
            }
            self.ensure_allowances(&required).await?;

            let mut calls = Vec::with_capacity(1 + plan.repayments.len() + plan.withdrawals.len());
            calls.push(execute);
            for repayment in &plan.repayments {
                calls.push(self.router.repay(
                    order.title.debt,
                    repayment.asset,
                    repayment.amount,
                    repayment.rate_mode,
                ));
            }
            for asset in &plan.withdrawals {
                calls.push(self.router.withdraw(
                    order.title.debt,
                    *asset,
                    U256::MAX,
                    self.rpc.sender(),
                ));
            }
            self.router.multicall(calls)
        } else {
            self.ensure_allowance(order.token, payment).await?;
            execute
        };

        self.submit(call, options).await
    }

    async fn execute_partial(
        &self,
        order: &PartialSellOrder,
        status: OrderStatus,
        options: &ExecuteOptions,
    ) -> Result<B256, Error> {
        self.preflight(&Order::Partial(order.clone()), status).await?;
        self.ensure_allowance(order.repayToken, order.repayAmount)
            .await?;
        self.submit(self.router.execute_partial_sale(order.clone()), options)
            .await
    }

    /// Signature present, order well-formed, and executable right now
    async fn preflight(&self, order: &Order, status: OrderStatus) -> Result<AccountData, Error> {
        order.validate()?;
        if !order.is_signed() {
            return Err(OrderError::SignatureInvalid {
                reason: "order is not signed".to_string(),
            }
            .into());
        }

        let account = self
            .reader()
            .account_data(self.pool, order.debt())
            .await
            .map_err(|e| Error::tx(TxStage::Execution, e.to_tx_error()))?;

        let verdict = evaluate(
            status,
            order.title(),
            account.health_factor,
            now_secs(),
        );
        if !verdict.is_executable() {
            return Err(OrderError::invalid_order(verdict.reason()).into());
        }
        Ok(account)
    }

    /// Add the configured buffer for interest accrued before inclusion
    fn with_buffer(&self, amount: U256) -> U256 {
        amount.saturating_add(apply_basis_points(amount, self.config.allowance_buffer_bps))
    }

    async fn liquidation_plan(
        &self,
        debt: Address,
        position: &PositionAssets,
    ) -> Result<LiquidationPlan, Error> {
        let reader = self.reader();
        let read_err = |e: RpcError| Error::tx(TxStage::Execution, e.to_tx_error());

        let debt_legs = try_join_all(position.debt_assets.iter().map(|asset| {
            let reader = &reader;
            async move {
                let tokens = reader.reserve_tokens(self.pool, *asset).await?;
                let (variable, stable) = futures::try_join!(
                    reader.balance_of(tokens.variable_debt_token, debt),
                    reader.balance_of(tokens.stable_debt_token, debt),
                )?;
                Ok::<_, RpcError>((*asset, variable, stable))
            }
        }))
        .await
        .map_err(read_err)?;

        let collateral_legs = try_join_all(position.collateral_assets.iter().map(|asset| {
            let reader = &reader;
            async move {
                let tokens = reader.reserve_tokens(self.pool, *asset).await?;
                let balance = reader.balance_of(tokens.a_token, debt).await?;
                Ok::<_, RpcError>((*asset, balance))
            }
        }))
        .await
        .map_err(read_err)?;

        let mut plan = LiquidationPlan::default();
        for (asset, variable, stable) in debt_legs {
            for (balance, rate_mode) in [
                (variable, INTEREST_RATE_VARIABLE),
                (stable, INTEREST_RATE_STABLE),
            ] {
                if !balance.is_zero() {
                    plan.repayments.push(Repayment {
                        asset,
                        amount: self.with_buffer(balance),
                        rate_mode,
                    });
                }
            }
        }
        plan.withdrawals = collateral_legs
            .into_iter()
            .filter(|(_, balance)| !balance.is_zero())
            .map(|(asset, _)| asset)
            .collect();

        tracing::debug!(
            debt = %debt,
            repayments = plan.repayments.len(),
            withdrawals = plan.withdrawals.len(),
            "Auto-liquidate plan"
        );
        Ok(plan)
    }

    async fn ensure_allowance(&self, token: Address, required: U256) -> Result<(), Error> {
        let mut required_map = BTreeMap::new();
        required_map.insert(token, required);
        self.ensure_allowances(&required_map).await
    }

    /// Read every allowance concurrently, then approve shortfalls one by one
    async fn ensure_allowances(&self, required: &BTreeMap<Address, U256>) -> Result<(), Error> {
        let reader = self.reader();
        let owner = self.rpc.sender();
        let spender = self.router.address();

        let current = try_join_all(
            required
                .keys()
                .map(|token| reader.allowance(*token, owner, spender)),
        )
        .await
        .map_err(|e| Error::tx(TxStage::Approval, e.to_tx_error()))?;

        for ((token, needed), current) in required.iter().zip(current) {
            if current >= *needed {
                continue;
            }
            tracing::info!(
                token = %token,
                required = %needed,
                current = %current,
                "Approving router"
            );
            self.approve_and_confirm(*token, *needed).await?;
        }
        Ok(())
    }

    async fn approve_and_confirm(&self, token: Address, amount: U256) -> Result<(), Error> {
        let spender = self.router.address();
        let approval_err = |e: RpcError| {
            let source = match e.to_tx_error() {
                TxError::UserRejected => TxError::UserRejected,
                _ => TxError::ApprovalFailed {
                    token: token.to_string(),
                    reason: e.to_string(),
                },
            };
            Error::tx(TxStage::Approval, source)
        };

        let tx_hash = self
            .rpc
            .send_transaction(approve(token, spender, amount))
            .await
            .map_err(approval_err)?;
        self.phases.set(TxPhase::Submitted { tx_hash });

        let receipt = self.receipt(tx_hash, TxStage::Approval).await?;
        if !receipt.succeeded() {
            return Err(Error::tx(
                TxStage::Approval,
                TxError::ApprovalFailed {
                    token: token.to_string(),
                    reason: format!("approval {} reverted", tx_hash),
                },
            ));
        }

        // The node serving reads can lag behind the one that mined the approval
        let reader = self.reader();
        let owner = self.rpc.sender();
        let policy = RetryPolicy::new(
            self.config.approval_poll_attempts,
            self.config.approval_poll_interval(),
        );
        let outcome = poll_until(policy, |_| {
            let reader = &reader;
            async move {
                let current = reader.allowance(token, owner, spender).await?;
                Ok::<_, RpcError>((current >= amount).then_some(current))
            }
        })
        .await;

        match outcome {
            Ok(PollOutcome::Ready { attempts, .. }) => {
                tracing::debug!(token = %token, attempts, "Allowance confirmed")
            }
            Ok(PollOutcome::Exhausted { attempts }) => tracing::warn!(
                token = %token,
                attempts,
                "Allowance not visible after approval, continuing"
            ),
            Err(e) => tracing::warn!(
                token = %token,
                error = %e,
                "Allowance confirmation failed, continuing"
            ),
        }
        Ok(())
    }

    async fn receipt(&self, tx_hash: B256, stage: TxStage) -> Result<TxReceipt, Error> {
        self.phases.set(TxPhase::WaitingForReceipt { tx_hash });
        wait_for_receipt(
            self.rpc.as_ref(),
            tx_hash,
            self.config.receipt_timeout(),
            self.config.receipt_poll_interval(),
        )
        .await
        .map_err(|e| receipt_error(e, tx_hash, stage, self.config.receipt_timeout_secs))
    }

    async fn submit(&self, call: ContractCall, options: &ExecuteOptions) -> Result<B256, Error> {
        let tx_hash = self
            .rpc
            .send_transaction(call)
            .await
            .map_err(|e| Error::tx(TxStage::Execution, e.to_tx_error()))?;
        self.phases.set(TxPhase::Submitted { tx_hash });
        tracing::info!(tx_hash = %tx_hash, "Execution submitted");

        let receipt = self.receipt(tx_hash, TxStage::Execution).await?;
        if !receipt.succeeded() {
            return Err(Error::tx(
                TxStage::Execution,
                TxError::ExecutionReverted {
                    reason: format!("transaction {} reverted", tx_hash),
                },
            ));
        }

        if options.wait_for_sync {
            self.phases
                .sync_countdown(tx_hash, self.config.sync_countdown_secs)
                .await;
        } else {
            self.phases.set(TxPhase::Success { tx_hash });
        }
        Ok(tx_hash)
    }
}
