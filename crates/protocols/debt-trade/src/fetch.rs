//! Market state fetching from the backend
//!
//! Orders and positions come from the backend; health factors are always
//! recomputed locally from current balances and prices, never taken from the
//! backend's cached value.

use std::collections::HashMap;

use alloy::primitives::Address;
use debtx_backend::{BackendClient, OrderQuery, OrderRecord, PositionSnapshot};
use debtx_core::{Error, HealthBands, UnixSeconds};
use futures::future::join_all;

use crate::calculator::{compute_health_factor, health_status, is_liquidatable};
use crate::lifecycle::{evaluate, now_secs};
use crate::order::Order;
use crate::state::{
    HealthReport, MarketOrder, MarketResponse, PositionAsset, PositionHealth, PriceBook,
};

/// Fetch prices and thresholds. A failing source is logged and left empty;
/// the health calculator then flags the affected symbols.
pub async fn fetch_price_book(backend: &BackendClient) -> PriceBook {
    let (prices, thresholds) = futures::join!(
        backend.prices(None, None, None),
        backend.liquidation_thresholds(None, None, None),
    );

    let prices = prices.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to fetch prices");
        Vec::new()
    });
    let thresholds = thresholds.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to fetch liquidation thresholds");
        Vec::new()
    });

    PriceBook::from_backend(&prices, &thresholds)
}

/// Health of a position snapshot against a price book
pub fn position_health(
    snapshot: &PositionSnapshot,
    book: &PriceBook,
    bands: &HealthBands,
) -> PositionHealth {
    let collaterals: Vec<PositionAsset> = snapshot.collaterals.iter().map(Into::into).collect();
    let debts: Vec<PositionAsset> = snapshot.debts.iter().map(Into::into).collect();
    let report = compute_health_factor(
        &collaterals,
        &debts,
        |s| book.price(s),
        |s| book.threshold(s),
    );

    PositionHealth {
        debt_address: snapshot.address,
        status: health_status(report.health_factor, bands),
        liquidatable: is_liquidatable(report.health_factor, bands),
        report,
    }
}

pub async fn fetch_position_health(
    backend: &BackendClient,
    debt_address: Address,
    bands: &HealthBands,
) -> Result<PositionHealth, Error> {
    let (book, snapshot) = futures::join!(fetch_price_book(backend), backend.position(debt_address));
    Ok(position_health(&snapshot?, &book, bands))
}

/// Attach live health and executability to a stored order
pub fn market_order(
    record: OrderRecord,
    report: Option<HealthReport>,
    bands: &HealthBands,
    now: UnixSeconds,
) -> MarketOrder {
    let order = match Order::from_record(&record) {
        Ok(order) => order,
        Err(e) => {
            return MarketOrder {
                record,
                health: report,
                health_status: None,
                executability: None,
                executable: false,
                reason: e.to_string(),
            }
        }
    };

    let Some(report) = report else {
        return MarketOrder {
            record,
            health: None,
            health_status: None,
            executability: None,
            executable: false,
            reason: "Position data unavailable".to_string(),
        };
    };

    let verdict = evaluate(record.status, order.title(), report.health_factor_wad(), now);
    // Unpriced assets count as zero in the health factor
    let (executable, reason) = if verdict.is_executable() && report.price_unavailable() {
        (
            false,
            format!(
                "Price unavailable for {}; health factor cannot be confirmed",
                report.missing_prices.join(", ")
            ),
        )
    } else {
        (verdict.is_executable(), verdict.reason())
    };
    MarketOrder {
        health_status: Some(health_status(report.health_factor, bands)),
        executable,
        reason,
        executability: Some(verdict),
        health: Some(report),
        record,
    }
}

/// List orders with recomputed health. Positions are fetched concurrently;
/// a position that fails to load leaves its orders non-executable.
pub async fn fetch_market(
    backend: &BackendClient,
    query: &OrderQuery,
    bands: &HealthBands,
) -> Result<MarketResponse, Error> {
    let (page, book) = futures::join!(backend.list_orders(query), fetch_price_book(backend));
    let page = page?;

    let mut debts: Vec<Address> = page
        .orders
        .iter()
        .filter_map(OrderRecord::debt_address)
        .collect();
    debts.sort();
    debts.dedup();

    let snapshots = join_all(debts.iter().map(|debt| backend.position(*debt))).await;

    let mut reports: HashMap<Address, HealthReport> = HashMap::new();
    for (debt, snapshot) in debts.iter().zip(snapshots) {
        match snapshot {
            Ok(snapshot) => {
                reports.insert(*debt, position_health(&snapshot, &book, bands).report);
            }
            Err(e) => {
                tracing::warn!(debt = %debt, error = %e, "Failed to fetch position");
            }
        }
    }

    let price_unavailable = book.is_empty() || reports.values().any(HealthReport::price_unavailable);
    let now = now_secs();
    let orders = page
        .orders
        .into_iter()
        .map(|record| {
            let report = record.debt_address().and_then(|d| reports.get(&d).cloned());
            market_order(record, report, bands, now)
        })
        .collect();

    Ok(MarketResponse {
        orders,
        total: page.total,
        price_unavailable,
    })
}

pub async fn fetch_order(
    backend: &BackendClient,
    id: &str,
    bands: &HealthBands,
) -> Result<MarketOrder, Error> {
    let record = backend.get_order(id).await?;

    let report = match record.debt_address() {
        Some(debt) => match fetch_position_health(backend, debt, bands).await {
            Ok(health) => Some(health.report),
            Err(e) => {
                tracing::warn!(order_id = %id, error = %e, "Failed to fetch position");
                None
            }
        },
        None => None,
    };

    Ok(market_order(record, report, bands, now_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use debtx_backend::PositionLine;
    use debtx_core::BackendConfig;

    use crate::lifecycle::Executability;
    use crate::state::HealthStatus;

    fn line(symbol: &str, raw: u64, decimals: u8) -> PositionLine {
        PositionLine {
            token: Address::ZERO,
            symbol: symbol.to_string(),
            decimals,
            balance: U256::from(raw),
            balance_usd: None,
        }
    }

    fn record(status: &str, trigger: &str) -> OrderRecord {
        serde_json::from_value(serde_json::json!({
            "id": "ord-1",
            "orderType": "full",
            "status": status,
            "seller": "0x00000000000000000000000000000000000000a1",
            "fullSellOrder": {
                "title": {
                    "debt": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                    "debtNonce": "1",
                    "startTime": "0",
                    "endTime": "4000000000",
                    "triggerHF": trigger
                },
                "token": "0x94a9d9ac8a22534e3faca9f4e7f2e2cf85d5e4c8",
                "bonus": "200",
                "v": 27,
                "r": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "s": "0x2222222222222222222222222222222222222222222222222222222222222222"
            }
        }))
        .unwrap()
    }

    fn report(hf: f64) -> HealthReport {
        HealthReport {
            health_factor: hf,
            total_collateral_usd: 0.0,
            total_debt_usd: 0.0,
            weighted_avg_threshold: 0.0,
            missing_prices: vec![],
            missing_thresholds: vec![],
        }
    }

    #[test]
    fn test_position_health_from_snapshot() {
        let snapshot = PositionSnapshot {
            address: Address::repeat_byte(0xaa),
            owner: Address::repeat_byte(0x01),
            nonce: U256::ZERO,
            collaterals: vec![line("WETH", 1_000_000_000_000_000_000, 18)],
            debts: vec![line("USDC", 1_000_000_000, 6)],
            health_factor: Some(99.0),
        };
        let mut book = PriceBook::new();
        book.set_price("WETH", 2450.0);
        book.set_price("USDC", 1.0);
        book.set_threshold("WETH", 0.85);

        let health = position_health(&snapshot, &book, &HealthBands::default());
        assert!((health.report.health_factor - 2.0825).abs() < 1e-9);
        assert_eq!(health.status, HealthStatus::Safe);
        assert!(!health.liquidatable);
        assert_eq!(health.debt_address, snapshot.address);
    }

    #[test]
    fn test_market_order_executable() {
        let bands = HealthBands::default();
        let order = market_order(
            record("ACTIVE", "1400000000000000000"),
            Some(report(1.2)),
            &bands,
            1_700_000_000,
        );
        assert!(order.executable);
        assert_eq!(order.health_status, Some(HealthStatus::Danger));
        assert!(order.reason.starts_with("Executable"));
    }

    #[test]
    fn test_market_order_not_executable() {
        let bands = HealthBands::default();

        let high = market_order(
            record("ACTIVE", "1400000000000000000"),
            Some(report(1.6)),
            &bands,
            1_700_000_000,
        );
        assert!(!high.executable);
        assert_eq!(high.health_status, Some(HealthStatus::Warning));

        let cancelled = market_order(
            record("CANCELLED", "1400000000000000000"),
            Some(report(1.2)),
            &bands,
            1_700_000_000,
        );
        assert!(!cancelled.executable);
        assert_eq!(cancelled.reason, "Order is CANCELLED, not ACTIVE");

        let unknown = market_order(record("ACTIVE", "1400000000000000000"), None, &bands, 0);
        assert!(!unknown.executable);
        assert!(unknown.executability.is_none());
    }

    #[test]
    fn test_unpriced_asset_blocks_executable() {
        let mut degraded = report(1.2);
        degraded.missing_prices = vec!["WBTC".to_string()];
        let order = market_order(
            record("ACTIVE", "1400000000000000000"),
            Some(degraded),
            &HealthBands::default(),
            1_700_000_000,
        );
        assert!(!order.executable);
        assert!(order.reason.contains("WBTC"));
        assert!(order
            .executability
            .as_ref()
            .is_some_and(Executability::is_executable));
    }

    #[tokio::test]
    async fn test_price_book_degrades_when_backend_down() {
        let backend = BackendClient::new(&BackendConfig {
            url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
        })
        .unwrap();
        let book = fetch_price_book(&backend).await;
        assert!(book.is_empty());
    }
}
