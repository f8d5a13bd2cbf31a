//! Compile-time ABI definitions for the debt router, lending pool and ERC-20
//! tokens via Alloy `sol!`.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

// ---------------------------------------------------------------------------
// Order structs (router verification layout)
// ---------------------------------------------------------------------------

sol! {
    /// Identity and validity window shared by both order kinds.
    #[derive(Debug, PartialEq, Eq)]
    struct OrderTitle {
        address debt;
        uint256 debtNonce;
        uint256 startTime;
        uint256 endTime;
        uint256 triggerHF;
    }

    /// Sale of 100% ownership of a debt position.
    #[derive(Debug, PartialEq, Eq)]
    struct FullSellOrder {
        OrderTitle title;
        address token;
        uint256 bonus;
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    /// Partial repayment plus proportional collateral withdrawal right.
    #[derive(Debug, PartialEq, Eq)]
    struct PartialSellOrder {
        OrderTitle title;
        uint256 interestRateMode;
        address[] collateralOut;
        uint256[] percents;
        address repayToken;
        uint256 repayAmount;
        uint256 bonus;
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    /// Debt router: position factory, pool proxy calls and order settlement.
    interface IDebtRouter {
        function createDebt() external returns (address debt);
        function predictDebtAddress(address owner) external view returns (address debt);
        function userNonces(address owner) external view returns (uint256 nonce);

        function callSupply(address debt, address asset, uint256 amount) external;
        function callBorrow(address debt, address asset, uint256 amount, uint256 interestRateMode) external;
        function callRepay(address debt, address asset, uint256 amount, uint256 interestRateMode) external;
        function callWithdraw(address debt, address asset, uint256 amount, address to) external;

        function multicall(bytes[] calldata data) external returns (bytes[] memory results);

        function executeFullSaleOrder(FullSellOrder calldata order, uint256 minProfit) external;
        /// Deployed name carries the typo; the selector depends on it.
        function excutePartialSellOrder(PartialSellOrder calldata order) external;

        function cancelOrder(OrderTitle calldata title) external;
        function cancelDebtCurrentOrders(address debt) external;
    }
}

// ---------------------------------------------------------------------------
// ERC-20
// ---------------------------------------------------------------------------

sol! {
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

// ---------------------------------------------------------------------------
// Aave V3 Pool and Oracle
// ---------------------------------------------------------------------------

sol! {
    interface IPool {
        /// Aggregated position data, base currency amounts in 8 decimals.
        function getUserAccountData(address user) external view returns (
            uint256 totalCollateralBase,
            uint256 totalDebtBase,
            uint256 availableBorrowsBase,
            uint256 currentLiquidationThreshold,
            uint256 ltv,
            uint256 healthFactor
        );

        /// Flat reserve data (15 fields) including aToken and debt token addresses.
        function getReserveData(address asset) external view returns (
            uint256 configuration,
            uint128 liquidityIndex,
            uint128 currentLiquidityRate,
            uint128 variableBorrowIndex,
            uint128 currentVariableBorrowRate,
            uint128 currentStableBorrowRate,
            uint40 lastUpdateTimestamp,
            uint16 id,
            address aTokenAddress,
            address stableDebtTokenAddress,
            address variableDebtTokenAddress,
            address interestRateStrategyAddress,
            uint128 accruedToTreasury,
            uint128 unbacked,
            uint128 isolationModeTotalDebt
        );
    }

    interface IPriceOracle {
        /// Asset price in base currency (USD, 8 decimals).
        function getAssetPrice(address asset) external view returns (uint256 price);
    }
}
