//! Order data model
//!
//! `Order` is the tagged union of the two sell order kinds, wrapping the ABI
//! structs the router verifies. Drafts carry human-readable inputs and are
//! validated and converted to on-chain units before anything is hashed.

use alloy::primitives::{Address, B256, U256};
use debtx_backend::{
    CreateOrderRequest, FullSellOrderDto, OrderRecord, OrderTitleDto, PartialSellOrderDto,
};
use debtx_core::constants::{BASIS_POINTS, HEALTH_FACTOR_DECIMALS};
use debtx_core::fixed_point::{parse_units, to_fixed_point};
use debtx_core::{OrderError, OrderKind, UnixSeconds};
use evm_tx::contracts::{FullSellOrder, OrderTitle, PartialSellOrder};
use serde::{Deserialize, Serialize};

use crate::constants::order::{INTEREST_RATE_STABLE, INTEREST_RATE_VARIABLE};

/// `(v, r, s)` split of a 65-byte ECDSA signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl OrderSignature {
    pub fn is_empty(&self) -> bool {
        self.v == 0 && self.r.is_zero() && self.s.is_zero()
    }
}

/// A sell order, signed or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Full(FullSellOrder),
    Partial(PartialSellOrder),
}

impl Order {
    pub fn kind(&self) -> OrderKind {
        match self {
            Self::Full(_) => OrderKind::Full,
            Self::Partial(_) => OrderKind::Partial,
        }
    }

    pub fn title(&self) -> &OrderTitle {
        match self {
            Self::Full(o) => &o.title,
            Self::Partial(o) => &o.title,
        }
    }

    pub fn debt(&self) -> Address {
        self.title().debt
    }

    pub fn bonus_bps(&self) -> u64 {
        let bonus = match self {
            Self::Full(o) => o.bonus,
            Self::Partial(o) => o.bonus,
        };
        bonus.saturating_to()
    }

    pub fn signature(&self) -> OrderSignature {
        match self {
            Self::Full(o) => OrderSignature {
                v: o.v,
                r: o.r,
                s: o.s,
            },
            Self::Partial(o) => OrderSignature {
                v: o.v,
                r: o.r,
                s: o.s,
            },
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature().is_empty()
    }

    pub fn with_signature(mut self, sig: OrderSignature) -> Self {
        match &mut self {
            Self::Full(o) => {
                o.v = sig.v;
                o.r = sig.r;
                o.s = sig.s;
            }
            Self::Partial(o) => {
                o.v = sig.v;
                o.r = sig.r;
                o.s = sig.s;
            }
        }
        self
    }

    /// Re-check the structural invariants of an order received from elsewhere
    pub fn validate(&self) -> Result<(), OrderError> {
        validate_title(self.title())?;
        validate_bonus(self.bonus_bps_exact()?)?;
        if let Self::Partial(o) = self {
            let mode: u8 = o
                .interestRateMode
                .try_into()
                .map_err(|_| OrderError::invalid_order("interest rate mode out of range"))?;
            let percents = o
                .percents
                .iter()
                .map(|p| {
                    u64::try_from(*p).map_err(|_| OrderError::invalid_order("percent out of range"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            validate_partial_fields(mode, &o.collateralOut, &percents)?;
        }
        Ok(())
    }

    fn bonus_bps_exact(&self) -> Result<u64, OrderError> {
        let bonus = match self {
            Self::Full(o) => o.bonus,
            Self::Partial(o) => o.bonus,
        };
        u64::try_from(bonus).map_err(|_| OrderError::invalid_order("bonus out of range"))
    }

    /// Rebuild from a stored backend record
    pub fn from_record(record: &OrderRecord) -> Result<Self, OrderError> {
        match record.order_type {
            OrderKind::Full => record
                .full_sell_order
                .as_ref()
                .map(|dto| Self::Full(full_from_dto(dto)))
                .ok_or_else(|| OrderError::invalid_order(format!("order {} has no full order body", record.id))),
            OrderKind::Partial => record
                .partial_sell_order
                .as_ref()
                .map(|dto| Self::Partial(partial_from_dto(dto)))
                .ok_or_else(|| {
                    OrderError::invalid_order(format!("order {} has no partial order body", record.id))
                }),
        }
    }

    /// Body for `POST /api/orders`
    pub fn to_create_request(&self, seller: Address, chain_id: u64) -> CreateOrderRequest {
        let (full_sell_order, partial_sell_order) = match self {
            Self::Full(o) => (Some(full_to_dto(o)), None),
            Self::Partial(o) => (None, Some(partial_to_dto(o))),
        };
        CreateOrderRequest {
            order_type: self.kind(),
            chain_id,
            seller,
            full_sell_order,
            partial_sell_order,
        }
    }
}

/// Human-readable title inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleDraft {
    pub debt: Address,
    pub debt_nonce: U256,
    pub start_time: UnixSeconds,
    pub end_time: UnixSeconds,
    /// e.g. 1.5
    #[serde(rename = "triggerHF")]
    pub trigger_hf: f64,
}

impl TitleDraft {
    pub fn build(&self) -> Result<OrderTitle, OrderError> {
        let trigger = to_fixed_point(self.trigger_hf, HEALTH_FACTOR_DECIMALS, HEALTH_FACTOR_DECIMALS)?;
        let title = OrderTitle {
            debt: self.debt,
            debtNonce: self.debt_nonce,
            startTime: U256::from(self.start_time),
            endTime: U256::from(self.end_time),
            triggerHF: trigger,
        };
        validate_title(&title)?;
        Ok(title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullOrderDraft {
    pub title: TitleDraft,
    /// Payment token
    pub token: Address,
    pub bonus_bps: u64,
}

impl FullOrderDraft {
    pub fn build(&self) -> Result<Order, OrderError> {
        validate_bonus(self.bonus_bps)?;
        Ok(Order::Full(FullSellOrder {
            title: self.title.build()?,
            token: self.token,
            bonus: U256::from(self.bonus_bps),
            v: 0,
            r: B256::ZERO,
            s: B256::ZERO,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialOrderDraft {
    pub title: TitleDraft,
    /// 1 = stable, 2 = variable
    pub interest_rate_mode: u8,
    pub collateral_out: Vec<Address>,
    /// Basis points, parallel to `collateral_out`
    pub percents: Vec<u64>,
    pub repay_token: Address,
    /// Decimal string as typed, e.g. "100.5"
    pub repay_amount: String,
    /// Decimals of `repay_token`, not the health factor's 18
    pub repay_decimals: u8,
    pub bonus_bps: u64,
}

impl PartialOrderDraft {
    pub fn build(&self) -> Result<Order, OrderError> {
        validate_bonus(self.bonus_bps)?;
        validate_partial_fields(self.interest_rate_mode, &self.collateral_out, &self.percents)?;

        let repay_amount = parse_units(&self.repay_amount, self.repay_decimals)?;
        if repay_amount.is_zero() {
            return Err(OrderError::invalid_amount("repay amount must be positive"));
        }

        Ok(Order::Partial(PartialSellOrder {
            title: self.title.build()?,
            interestRateMode: U256::from(self.interest_rate_mode),
            collateralOut: self.collateral_out.clone(),
            percents: self.percents.iter().map(|p| U256::from(*p)).collect(),
            repayToken: self.repay_token,
            repayAmount: repay_amount,
            bonus: U256::from(self.bonus_bps),
            v: 0,
            r: B256::ZERO,
            s: B256::ZERO,
        }))
    }
}

/// Either draft kind, tagged by `orderType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "orderType", rename_all = "lowercase")]
pub enum OrderDraft {
    Full(FullOrderDraft),
    Partial(PartialOrderDraft),
}

impl OrderDraft {
    pub fn build(&self) -> Result<Order, OrderError> {
        match self {
            Self::Full(d) => d.build(),
            Self::Partial(d) => d.build(),
        }
    }
}

fn validate_title(title: &OrderTitle) -> Result<(), OrderError> {
    if title.startTime >= title.endTime {
        return Err(OrderError::invalid_order(format!(
            "start time {} must be before end time {}",
            title.startTime, title.endTime
        )));
    }
    if title.triggerHF.is_zero() {
        return Err(OrderError::invalid_order("trigger health factor must be positive"));
    }
    Ok(())
}

fn validate_bonus(bonus_bps: u64) -> Result<(), OrderError> {
    if bonus_bps > BASIS_POINTS {
        return Err(OrderError::invalid_order(format!(
            "bonus {} bp exceeds {} bp",
            bonus_bps, BASIS_POINTS
        )));
    }
    Ok(())
}

fn validate_partial_fields(
    interest_rate_mode: u8,
    collateral_out: &[Address],
    percents: &[u64],
) -> Result<(), OrderError> {
    if interest_rate_mode != INTEREST_RATE_STABLE && interest_rate_mode != INTEREST_RATE_VARIABLE {
        return Err(OrderError::invalid_order(format!(
            "interest rate mode must be 1 (stable) or 2 (variable), got {}",
            interest_rate_mode
        )));
    }
    if collateral_out.len() != percents.len() {
        return Err(OrderError::invalid_order(format!(
            "{} collateral tokens but {} percents",
            collateral_out.len(),
            percents.len()
        )));
    }
    let sum: u64 = percents.iter().fold(0u64, |acc, p| acc.saturating_add(*p));
    if sum != BASIS_POINTS {
        return Err(OrderError::invalid_order(format!(
            "percents sum to {} bp, expected {}",
            sum, BASIS_POINTS
        )));
    }
    Ok(())
}

fn title_from_dto(dto: &OrderTitleDto) -> OrderTitle {
    OrderTitle {
        debt: dto.debt,
        debtNonce: dto.debt_nonce,
        startTime: dto.start_time,
        endTime: dto.end_time,
        triggerHF: dto.trigger_hf,
    }
}

fn title_to_dto(title: &OrderTitle) -> OrderTitleDto {
    OrderTitleDto {
        debt: title.debt,
        debt_nonce: title.debtNonce,
        start_time: title.startTime,
        end_time: title.endTime,
        trigger_hf: title.triggerHF,
    }
}

fn full_from_dto(dto: &FullSellOrderDto) -> FullSellOrder {
    FullSellOrder {
        title: title_from_dto(&dto.title),
        token: dto.token,
        bonus: dto.bonus,
        v: dto.v,
        r: dto.r,
        s: dto.s,
    }
}

fn full_to_dto(order: &FullSellOrder) -> FullSellOrderDto {
    FullSellOrderDto {
        title: title_to_dto(&order.title),
        token: order.token,
        bonus: order.bonus,
        v: order.v,
        r: order.r,
        s: order.s,
    }
}

fn partial_from_dto(dto: &PartialSellOrderDto) -> PartialSellOrder {
    PartialSellOrder {
        title: title_from_dto(&dto.title),
        interestRateMode: dto.interest_rate_mode,
        collateralOut: dto.collateral_out.clone(),
        percents: dto.percents.clone(),
        repayToken: dto.repay_token,
        repayAmount: dto.repay_amount,
        bonus: dto.bonus,
        v: dto.v,
        r: dto.r,
        s: dto.s,
    }
}

fn partial_to_dto(order: &PartialSellOrder) -> PartialSellOrderDto {
    PartialSellOrderDto {
        title: title_to_dto(&order.title),
        interest_rate_mode: order.interestRateMode,
        collateral_out: order.collateralOut.clone(),
        percents: order.percents.clone(),
        repay_token: order.repayToken,
        repay_amount: order.repayAmount,
        bonus: order.bonus,
        v: order.v,
        r: order.r,
        s: order.s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debtx_core::OrderStatus;

    fn title() -> TitleDraft {
        TitleDraft {
            debt: Address::repeat_byte(0xaa),
            debt_nonce: U256::from(3u64),
            start_time: 1_700_000_000,
            end_time: 1_800_000_000,
            trigger_hf: 1.4,
        }
    }

    fn partial() -> PartialOrderDraft {
        PartialOrderDraft {
            title: title(),
            interest_rate_mode: 2,
            collateral_out: vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            percents: vec![6_000, 4_000],
            repay_token: Address::repeat_byte(3),
            repay_amount: "100.5".to_string(),
            repay_decimals: 6,
            bonus_bps: 150,
        }
    }

    #[test]
    fn test_trigger_converted_to_wad() {
        let t = title().build().unwrap();
        assert_eq!(t.triggerHF, U256::from(1_400_000_000_000_000_000u64));

        let t = TitleDraft {
            trigger_hf: 1.5,
            ..title()
        }
        .build()
        .unwrap();
        assert_eq!(t.triggerHF, U256::from(1_500_000_000_000_000_000u64));
    }

    #[test]
    fn test_title_invariants() {
        let bad_window = TitleDraft {
            end_time: 1_700_000_000,
            ..title()
        };
        assert!(matches!(bad_window.build(), Err(OrderError::InvalidOrder { .. })));

        let zero_trigger = TitleDraft {
            trigger_hf: 0.0,
            ..title()
        };
        assert!(zero_trigger.build().is_err());

        let negative = TitleDraft {
            trigger_hf: -1.0,
            ..title()
        };
        assert!(matches!(negative.build(), Err(OrderError::InvalidAmount { .. })));
    }

    #[test]
    fn test_repay_amount_uses_token_decimals() {
        let order = partial().build().unwrap();
        let Order::Partial(p) = &order else {
            panic!("expected partial order");
        };
        assert_eq!(p.repayAmount, U256::from(100_500_000u64));
        assert_ne!(p.repayAmount, U256::from(100_500_000_000_000_000_000u128));
        assert!(!order.is_signed());
    }

    #[test]
    fn test_percents_must_sum_to_10000() {
        let draft = PartialOrderDraft {
            percents: vec![6_000, 3_999],
            ..partial()
        };
        let err = draft.build().unwrap_err();
        assert!(err.to_string().contains("9999"));

        let mismatched = PartialOrderDraft {
            percents: vec![10_000],
            ..partial()
        };
        assert!(mismatched.build().is_err());
    }

    #[test]
    fn test_partial_field_checks() {
        let bad_mode = PartialOrderDraft {
            interest_rate_mode: 3,
            ..partial()
        };
        assert!(bad_mode.build().is_err());

        let zero_repay = PartialOrderDraft {
            repay_amount: "0".to_string(),
            ..partial()
        };
        assert!(matches!(zero_repay.build(), Err(OrderError::InvalidAmount { .. })));

        let garbage = PartialOrderDraft {
            repay_amount: "1,5".to_string(),
            ..partial()
        };
        assert!(matches!(garbage.build(), Err(OrderError::InvalidAmount { .. })));
    }

    #[test]
    fn test_bonus_bounded() {
        let draft = FullOrderDraft {
            title: title(),
            token: Address::repeat_byte(5),
            bonus_bps: 10_001,
        };
        assert!(draft.build().is_err());
    }

    #[test]
    fn test_signature_applied_and_record_roundtrip() {
        let order = FullOrderDraft {
            title: title(),
            token: Address::repeat_byte(5),
            bonus_bps: 200,
        }
        .build()
        .unwrap();
        let sig = OrderSignature {
            v: 28,
            r: B256::repeat_byte(0x11),
            s: B256::repeat_byte(0x22),
        };
        let signed = order.with_signature(sig);
        assert!(signed.is_signed());
        assert_eq!(signed.signature(), sig);
        assert_eq!(signed.bonus_bps(), 200);

        let seller = Address::repeat_byte(9);
        let request = signed.to_create_request(seller, 11_155_111);
        let record = OrderRecord {
            id: "o1".to_string(),
            order_type: request.order_type,
            status: OrderStatus::Active,
            seller,
            buyer: None,
            chain_id: Some(request.chain_id),
            full_sell_order: request.full_sell_order.clone(),
            partial_sell_order: None,
            health_factor: None,
            created_at: None,
            updated_at: None,
        };
        assert_eq!(Order::from_record(&record).unwrap(), signed);
        assert!(signed.validate().is_ok());
    }

    #[test]
    fn test_record_without_body_rejected() {
        let record = OrderRecord {
            id: "o2".to_string(),
            order_type: OrderKind::Partial,
            status: OrderStatus::Active,
            seller: Address::ZERO,
            buyer: None,
            chain_id: None,
            full_sell_order: None,
            partial_sell_order: None,
            health_factor: None,
            created_at: None,
            updated_at: None,
        };
        assert!(Order::from_record(&record).is_err());
    }

    #[test]
    fn test_draft_json_tagged_by_order_type() {
        let json = serde_json::json!({
            "orderType": "partial",
            "title": {
                "debt": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "debtNonce": "0x3",
                "startTime": 1700000000u64,
                "endTime": 1800000000u64,
                "triggerHF": 1.4
            },
            "interestRateMode": 2,
            "collateralOut": ["0x0101010101010101010101010101010101010101"],
            "percents": [10000],
            "repayToken": "0x0303030303030303030303030303030303030303",
            "repayAmount": "100.5",
            "repayDecimals": 6,
            "bonusBps": 150
        });
        let draft: OrderDraft = serde_json::from_value(json).unwrap();
        let order = draft.build().unwrap();
        assert_eq!(order.kind(), OrderKind::Partial);
        assert_eq!(order.title().debtNonce, U256::from(3u64));
    }
}
