//! Debt trading protocol constants

/// Health factor presentation bands and fallbacks
pub mod health {
    /// `hf >= 2.0` is safe
    pub const SAFE_THRESHOLD: f64 = 2.0;
    /// `hf >= 1.5` is a warning
    pub const WARNING_THRESHOLD: f64 = 1.5;
    /// `hf >= 1.1` is at risk, below is critical
    pub const DANGER_THRESHOLD: f64 = 1.1;
    /// Pool liquidations start below 1.0
    pub const LIQUIDATION_THRESHOLD: f64 = 1.0;

    /// Stand-in for an infinite health factor when a position has no debt.
    /// 2^53 - 1, the largest integer an f64 holds exactly.
    pub const NO_DEBT_HEALTH_FACTOR: f64 = 9_007_199_254_740_991.0;

    /// Liquidation threshold assumed for assets with no per-asset data (85%)
    pub const DEFAULT_LIQUIDATION_THRESHOLD_BPS: u64 = 8_500;
}

/// Order encoding
pub mod order {
    pub const INTEREST_RATE_STABLE: u8 = 1;
    pub const INTEREST_RATE_VARIABLE: u8 = 2;

    /// Type strings hashed into the order typehashes
    pub const TITLE_TYPE: &str = "OrderTitle(address debt,uint256 debtNonce,uint256 startTime,uint256 endTime,uint256 triggerHF)";
    pub const FULL_SELL_ORDER_TYPE: &str = "FullSellOrder(uint256 chainId,address contract,OrderTitle title,address token,uint256 bonus)";
    pub const PARTIAL_SELL_ORDER_TYPE: &str = "PartialSellOrder(uint256 chainId,address contract,OrderTitle title,uint256 interestRateMode,address[] collateralOut,uint256[] percents,address repayToken,uint256 repayAmount,uint256 bonus)";

    /// Prefix of the off-chain cancellation message
    pub const CANCEL_MESSAGE_PREFIX: &str = "Cancel order ";
}

/// Transaction flow timing
pub mod execution {
    /// Countdown while the backend indexer catches up after a mined transaction
    pub const SYNC_COUNTDOWN_SECS: u64 = 10;
    /// Allowance confirmation polls after an approval is mined
    pub const APPROVAL_POLL_ATTEMPTS: u32 = 20;
    pub const APPROVAL_POLL_INTERVAL_SECS: u64 = 3;
    pub const RECEIPT_TIMEOUT_SECS: u64 = 60;
    pub const RPC_TIMEOUT_SECS: u64 = 10;
}
