//! Calldata builders
//!
//! Pure encoding of router and token calls. Nothing here touches the network,
//! so the exact byte layout of every submitted transaction is testable.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use crate::contracts::{FullSellOrder, IDebtRouter, IERC20, OrderTitle, PartialSellOrder};

/// A call to be submitted to a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub input: Bytes,
}

impl ContractCall {
    pub fn new(to: Address, input: impl Into<Bytes>) -> Self {
        Self {
            to,
            input: input.into(),
        }
    }

    /// First four bytes of the calldata
    pub fn selector(&self) -> [u8; 4] {
        let mut selector = [0u8; 4];
        let n = self.input.len().min(4);
        selector[..n].copy_from_slice(&self.input[..n]);
        selector
    }
}

/// ERC-20 `approve(spender, amount)`
pub fn approve(token: Address, spender: Address, amount: U256) -> ContractCall {
    let call = IERC20::approveCall { spender, amount };
    ContractCall::new(token, call.abi_encode())
}

/// Router-bound calldata builder
#[derive(Debug, Clone, Copy)]
pub struct RouterCalls {
    router: Address,
}

impl RouterCalls {
    pub fn new(router: Address) -> Self {
        Self { router }
    }

    pub fn address(&self) -> Address {
        self.router
    }

    pub fn create_debt(&self) -> ContractCall {
        ContractCall::new(self.router, IDebtRouter::createDebtCall {}.abi_encode())
    }

    pub fn supply(&self, debt: Address, asset: Address, amount: U256) -> ContractCall {
        let call = IDebtRouter::callSupplyCall {
            debt,
            asset,
            amount,
        };
        ContractCall::new(self.router, call.abi_encode())
    }

    pub fn borrow(
        &self,
        debt: Address,
        asset: Address,
        amount: U256,
        interest_rate_mode: u8,
    ) -> ContractCall {
        let call = IDebtRouter::callBorrowCall {
            debt,
            asset,
            amount,
            interestRateMode: U256::from(interest_rate_mode),
        };
        ContractCall::new(self.router, call.abi_encode())
    }

    pub fn repay(
        &self,
        debt: Address,
        asset: Address,
        amount: U256,
        interest_rate_mode: u8,
    ) -> ContractCall {
        let call = IDebtRouter::callRepayCall {
            debt,
            asset,
            amount,
            interestRateMode: U256::from(interest_rate_mode),
        };
        ContractCall::new(self.router, call.abi_encode())
    }

    pub fn withdraw(&self, debt: Address, asset: Address, amount: U256, to: Address) -> ContractCall {
        let call = IDebtRouter::callWithdrawCall {
            debt,
            asset,
            amount,
            to,
        };
        ContractCall::new(self.router, call.abi_encode())
    }

    pub fn execute_full_sale(&self, order: FullSellOrder, min_profit: U256) -> ContractCall {
        let call = IDebtRouter::executeFullSaleOrderCall {
            order,
            minProfit: min_profit,
        };
        ContractCall::new(self.router, call.abi_encode())
    }

    pub fn execute_partial_sale(&self, order: PartialSellOrder) -> ContractCall {
        let call = IDebtRouter::excutePartialSellOrderCall { order };
        ContractCall::new(self.router, call.abi_encode())
    }

    pub fn cancel_order(&self, title: OrderTitle) -> ContractCall {
        let call = IDebtRouter::cancelOrderCall { title };
        ContractCall::new(self.router, call.abi_encode())
    }

    pub fn cancel_debt_orders(&self, debt: Address) -> ContractCall {
        let call = IDebtRouter::cancelDebtCurrentOrdersCall { debt };
        ContractCall::new(self.router, call.abi_encode())
    }

    /// Batch router calls into one `multicall(bytes[])`.
    /// Every inner call must target the router itself.
    pub fn multicall(&self, calls: Vec<ContractCall>) -> ContractCall {
        debug_assert!(calls.iter().all(|c| c.to == self.router));
        let data = calls.into_iter().map(|c| c.input).collect();
        let call = IDebtRouter::multicallCall { data };
        ContractCall::new(self.router, call.abi_encode())
    }
}
