//! End-to-end settlement coverage over an in-memory store: the position
//! lifecycle, the pending matcher, stop-loss/take-profit handling, the
//! rigged outcome engine, and admin actions.

use std::sync::{Arc, Mutex};

use trademill::services::TradeClosedEmail;
use trademill::{
    AssetType, CloseReason, Direction, EmailSink, OpenPositionRequest, OrderKind, OutcomeEngine,
    OutcomeQuota, PortfolioLedger, PositionStatus, PriceCache, PushHub, SettlementEngine,
    SqliteStore, TradingError,
};

struct CapturingSink {
    sent: Mutex<Vec<(String, TradeClosedEmail)>>,
}

impl CapturingSink {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl EmailSink for CapturingSink {
    fn send_trade_closed(&self, to_email: &str, _first_name: &str, summary: &TradeClosedEmail) {
        self.sent
            .lock()
            .unwrap()
            .push((to_email.to_string(), summary.clone()));
    }
}

struct Harness {
    store: Arc<SqliteStore>,
    prices: Arc<PriceCache>,
    push: Arc<PushHub>,
    emails: Arc<CapturingSink>,
    engine: SettlementEngine,
}

fn harness(default_balance: f64) -> Harness {
    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let prices = Arc::new(PriceCache::new());
    let push = Arc::new(PushHub::new());
    let emails = Arc::new(CapturingSink::new());

    let ledger = PortfolioLedger::new(store.clone(), default_balance);
    let outcome = OutcomeEngine::with_seed(store.clone(), 7);
    let engine = SettlementEngine::new(
        store.clone(),
        prices.clone(),
        ledger,
        outcome,
        push.clone(),
        emails.clone(),
    );

    Harness {
        store,
        prices,
        push,
        emails,
        engine,
    }
}

fn market_buy(user_id: &str, symbol: &str, amount: f64) -> OpenPositionRequest {
    OpenPositionRequest {
        user_id: user_id.to_string(),
        symbol: symbol.to_string(),
        name: symbol.to_uppercase(),
        asset_type: AssetType::Crypto,
        direction: Direction::Buy,
        order: OrderKind::Market,
        volume: amount / 50.0,
        amount,
        stop_loss: None,
        take_profit: None,
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn market_open_debits_and_close_credits() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 50.0);

        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        assert_eq!(pos.status, PositionStatus::Open);
        assert_eq!(pos.entry_price, Some(50.0));
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 800.0);

        h.prices.set_price("btc", 55.0);
        let closed = h.engine.manual_close(&pos.id).unwrap();
        assert_eq!(closed.status, PositionStatus::Closed);
        assert_eq!(closed.realized_pnl, Some(20.0));
        assert_eq!(closed.close_reason, Some(CloseReason::Manual));

        let portfolio = h.engine.get_portfolio("user-1").unwrap();
        assert_eq!(portfolio.balance, 1020.0);
        assert_eq!(portfolio.total_profit, 20.0);
        assert!((portfolio.total_profit_percent - 20.0 / 1020.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn market_open_requires_price_and_balance() {
        let h = harness(100.0);
        let err = h.engine.open_position(market_buy("user-1", "btc", 50.0)).unwrap_err();
        assert!(matches!(err, TradingError::PriceUnavailable(_)));

        h.prices.set_price("btc", 50.0);
        let err = h.engine.open_position(market_buy("user-1", "btc", 500.0)).unwrap_err();
        assert!(matches!(
            err,
            TradingError::InsufficientBalance { needed, available }
                if needed == 500.0 && available == 100.0
        ));
        // failed open leaves the balance alone
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 100.0);
    }

    #[test]
    fn close_settles_exactly_once() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 50.0);
        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();

        h.prices.set_price("btc", 55.0);
        h.engine.manual_close(&pos.id).unwrap();
        let err = h.engine.manual_close(&pos.id).unwrap_err();
        assert!(matches!(err, TradingError::PositionNotOpen(_)));

        // the losing close must not credit a second time
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 1020.0);

        // nor may a later monitor pass touch it
        h.engine.monitor_open_positions().unwrap();
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 1020.0);
    }

    #[test]
    fn close_of_unknown_position_is_not_found() {
        let h = harness(1000.0);
        let err = h.engine.manual_close("nope").unwrap_err();
        assert!(matches!(err, TradingError::PositionNotFound(_)));
    }

    #[test]
    fn close_notifies_push_and_email() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 50.0);
        h.store
            .upsert_user_contact(&trademill::services::UserContact {
                user_id: "user-1".to_string(),
                email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
            })
            .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        h.push.register("user-1", tx);

        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        let opened = rx.try_recv().unwrap();
        assert!(opened.contains("position_opened"));

        h.prices.set_price("btc", 55.0);
        h.engine.manual_close(&pos.id).unwrap();
        let closed = rx.try_recv().unwrap();
        assert!(closed.contains("position_closed"));
        assert!(closed.contains("20.0"));

        let sent = h.emails.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ada@example.com");
        assert_eq!(sent[0].1.volume, "4.00000000");
        assert_eq!(sent[0].1.realized_pnl, "20.00");
        assert_eq!(sent[0].1.close_reason, "manual");
    }

    #[test]
    fn close_without_contact_skips_email() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 50.0);
        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        h.engine.manual_close(&pos.id).unwrap();
        assert!(h.emails.sent.lock().unwrap().is_empty());
    }
}

mod matching {
    use super::*;

    fn limit_buy(user_id: &str, trigger: f64, amount: f64) -> OpenPositionRequest {
        OpenPositionRequest {
            order: OrderKind::Limit {
                trigger_price: trigger,
            },
            ..market_buy(user_id, "btc", amount)
        }
    }

    #[test]
    fn pending_order_waits_for_trigger() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 105.0);

        let pos = h.engine.open_position(limit_buy("user-1", 100.0, 200.0)).unwrap();
        assert_eq!(pos.status, PositionStatus::Pending);
        assert_eq!(pos.entry_price, None);
        // no debit until the order opens
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 1000.0);

        // 101 > trigger, must not fire
        h.prices.set_price("btc", 101.0);
        assert_eq!(h.engine.match_pending_orders().unwrap(), 0);
        assert_eq!(h.engine.get_position(&pos.id).unwrap().status, PositionStatus::Pending);

        // exactly at the trigger it fires, entry is the observed price
        h.prices.set_price("btc", 100.0);
        assert_eq!(h.engine.match_pending_orders().unwrap(), 1);
        let opened = h.engine.get_position(&pos.id).unwrap();
        assert_eq!(opened.status, PositionStatus::Open);
        assert_eq!(opened.entry_price, Some(100.0));
        assert!(opened.opened_at.is_some());
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 800.0);
    }

    #[test]
    fn trigger_pushes_the_opened_position() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 105.0);
        let pos = h.engine.open_position(limit_buy("user-1", 100.0, 200.0)).unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        h.push.register("user-1", tx);

        h.prices.set_price("btc", 99.0);
        assert_eq!(h.engine.match_pending_orders().unwrap(), 1);

        let msg = rx.try_recv().unwrap();
        assert!(msg.contains("position_opened"));
        assert!(msg.contains(&pos.id));
    }

    #[test]
    fn matcher_skips_symbols_without_prices() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 50.0);
        let pos = h
            .engine
            .open_position(OpenPositionRequest {
                symbol: "doge".to_string(),
                order: OrderKind::Limit { trigger_price: 0.1 },
                ..market_buy("user-1", "btc", 200.0)
            })
            .unwrap();

        assert_eq!(h.engine.match_pending_orders().unwrap(), 0);
        assert_eq!(h.engine.get_position(&pos.id).unwrap().status, PositionStatus::Pending);
    }

    #[test]
    fn cancel_is_ledger_neutral_and_pending_only() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 105.0);

        let pos = h.engine.open_position(limit_buy("user-1", 100.0, 200.0)).unwrap();
        let cancelled = h.engine.cancel_pending(&pos.id).unwrap();
        assert_eq!(cancelled.status, PositionStatus::Cancelled);
        assert_eq!(cancelled.close_reason, Some(CloseReason::Cancelled));
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 1000.0);

        // cancelled orders never trigger
        h.prices.set_price("btc", 90.0);
        assert_eq!(h.engine.match_pending_orders().unwrap(), 0);

        // open positions cannot be cancelled
        let open = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        let err = h.engine.cancel_pending(&open.id).unwrap_err();
        assert!(matches!(err, TradingError::PositionNotPending(_)));
        let err = h.engine.cancel_pending(&pos.id).unwrap_err();
        assert!(matches!(err, TradingError::PositionNotPending(_)));
    }
}

mod bounds {
    use super::*;

    fn open_with_bounds(
        h: &Harness,
        direction: Direction,
        entry: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> trademill::Position {
        h.prices.set_price("btc", entry);
        h.engine
            .open_position(OpenPositionRequest {
                direction,
                stop_loss,
                take_profit,
                ..market_buy("user-1", "btc", 200.0)
            })
            .unwrap()
    }

    #[test]
    fn monitor_marks_open_positions_to_market() {
        let h = harness(1000.0);
        let pos = open_with_bounds(&h, Direction::Buy, 50.0, None, None);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        h.push.register("user-1", tx);

        h.prices.set_price("btc", 52.0);
        h.engine.monitor_open_positions().unwrap();

        let updated = h.engine.get_position(&pos.id).unwrap();
        assert_eq!(updated.status, PositionStatus::Open);
        assert_eq!(updated.current_price, Some(52.0));
        assert_eq!(updated.unrealized_pnl, 8.0);

        let msg = rx.try_recv().unwrap();
        assert!(msg.contains("position_update"));
    }

    #[test]
    fn one_sweep_settles_some_positions_and_marks_the_rest() {
        let h = harness(10_000.0);
        h.prices.set_price("btc", 100.0);
        h.prices.set_price("eth", 100.0);

        let stopped = h
            .engine
            .open_position(OpenPositionRequest {
                stop_loss: Some(90.0),
                ..market_buy("user-1", "btc", 200.0)
            })
            .unwrap();
        let held = h
            .engine
            .open_position(OpenPositionRequest {
                symbol: "eth".to_string(),
                ..market_buy("user-1", "btc", 200.0)
            })
            .unwrap();

        h.prices.set_price("btc", 88.0);
        h.prices.set_price("eth", 104.0);
        h.engine.monitor_open_positions().unwrap();

        // the sweep keeps going after settling the first position
        assert_eq!(
            h.engine.get_position(&stopped.id).unwrap().status,
            PositionStatus::Closed
        );
        let held = h.engine.get_position(&held.id).unwrap();
        assert_eq!(held.status, PositionStatus::Open);
        assert_eq!(held.current_price, Some(104.0));
        assert_eq!(held.unrealized_pnl, 8.0);
    }

    #[test]
    fn stop_loss_closes_at_a_loss() {
        let h = harness(1000.0);
        let pos = open_with_bounds(&h, Direction::Buy, 100.0, Some(90.0), None);

        h.prices.set_price("btc", 88.0);
        h.engine.monitor_open_positions().unwrap();

        let closed = h.engine.get_position(&pos.id).unwrap();
        assert_eq!(closed.status, PositionStatus::Closed);
        assert_eq!(closed.close_reason, Some(CloseReason::StopLoss));
        // natural pnl is (88-100)/100*200 = -24
        assert_eq!(closed.realized_pnl, Some(-24.0));
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 976.0);
    }

    #[test]
    fn stop_loss_loses_even_when_natural_pnl_is_positive() {
        let h = harness(1000.0);
        // stop above entry: hit with the position in profit
        let pos = open_with_bounds(&h, Direction::Buy, 100.0, Some(105.0), None);

        h.prices.set_price("btc", 103.0);
        h.engine.monitor_open_positions().unwrap();

        let closed = h.engine.get_position(&pos.id).unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::StopLoss));
        // natural +6 flipped to a loss of the same magnitude
        assert_eq!(closed.realized_pnl, Some(-6.0));
    }

    #[test]
    fn take_profit_wins_even_when_natural_pnl_is_negative() {
        let h = harness(1000.0);
        // short with the take profit above entry: hit with the position down
        let pos = open_with_bounds(&h, Direction::Sell, 100.0, None, Some(103.0));

        // sell TP fires when price <= bound; natural pnl is (100-103)... price 103 exactly
        h.prices.set_price("btc", 103.0);
        h.engine.monitor_open_positions().unwrap();

        let closed = h.engine.get_position(&pos.id).unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::TakeProfit));
        // natural -6 flipped to a gain of the same magnitude
        assert_eq!(closed.realized_pnl, Some(6.0));
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 1006.0);
    }

    #[test]
    fn zero_pnl_bounds_use_margin_fractions() {
        let h = harness(1000.0);
        // stop loss exactly at the entry price: zero natural pnl
        let pos = open_with_bounds(&h, Direction::Buy, 100.0, Some(100.0), None);
        h.engine.monitor_open_positions().unwrap();
        let closed = h.engine.get_position(&pos.id).unwrap();
        assert_eq!(closed.realized_pnl, Some(-10.0)); // 5% of 200

        let pos = open_with_bounds(&h, Direction::Buy, 100.0, None, Some(100.0));
        h.engine.monitor_open_positions().unwrap();
        let closed = h.engine.get_position(&pos.id).unwrap();
        assert_eq!(closed.realized_pnl, Some(20.0)); // 10% of 200
    }

    #[test]
    fn stop_loss_checked_before_take_profit() {
        let h = harness(1000.0);
        // both bounds already satisfied at the entry price
        let pos = open_with_bounds(&h, Direction::Buy, 95.0, Some(100.0), Some(90.0));

        h.engine.monitor_open_positions().unwrap();
        let closed = h.engine.get_position(&pos.id).unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::StopLoss));
    }
}

mod rigged {
    use super::*;

    fn quota(total: i64, wins: i64, losses: i64, current_wins: i64, current_losses: i64) -> OutcomeQuota {
        OutcomeQuota {
            total_trades: total,
            win_trades: wins,
            loss_trades: losses,
            current_wins,
            current_losses,
            active: true,
            ..Default::default()
        }
    }

    #[test]
    fn exhausted_losses_force_a_win_on_manual_close() {
        let h = harness(1000.0);
        h.store.update_outcome_quota(&quota(10, 3, 7, 0, 7)).unwrap();

        h.prices.set_price("btc", 100.0);
        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        h.prices.set_price("btc", 90.0);
        let closed = h.engine.manual_close(&pos.id).unwrap();

        // natural -20 flipped to +20, balance credited accordingly
        assert_eq!(closed.realized_pnl, Some(20.0));
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 1020.0);
    }

    #[test]
    fn exhausted_wins_force_a_loss_on_manual_close() {
        let h = harness(1000.0);
        h.store.update_outcome_quota(&quota(10, 3, 7, 3, 0)).unwrap();

        h.prices.set_price("btc", 100.0);
        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        h.prices.set_price("btc", 110.0);
        let closed = h.engine.manual_close(&pos.id).unwrap();

        assert_eq!(closed.realized_pnl, Some(-20.0));
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 980.0);
    }

    #[test]
    fn full_cycle_lands_on_the_configured_ratio() {
        let h = harness(100_000.0);
        h.store.update_outcome_quota(&quota(10, 3, 7, 0, 0)).unwrap();
        h.prices.set_price("btc", 100.0);

        let mut wins = 0;
        let mut losses = 0;
        for _ in 0..10 {
            let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
            h.prices.set_price("btc", 110.0);
            let closed = h.engine.manual_close(&pos.id).unwrap();
            if closed.realized_pnl.unwrap() > 0.0 {
                wins += 1;
            } else {
                losses += 1;
            }
            h.prices.set_price("btc", 100.0);
        }
        assert_eq!((wins, losses), (3, 7));

        let quota = h.store.get_outcome_quota().unwrap();
        assert_eq!((quota.current_wins, quota.current_losses), (0, 0));
    }

    #[test]
    fn lost_close_race_does_not_consume_quota() {
        let h = harness(1000.0);
        h.store.update_outcome_quota(&quota(10, 3, 7, 0, 0)).unwrap();
        h.prices.set_price("btc", 100.0);
        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        h.prices.set_price("btc", 110.0);

        // a concurrent settlement already holds the close claim
        assert!(h.store.begin_close(&pos.id).unwrap());

        let err = h.engine.manual_close(&pos.id).unwrap_err();
        assert!(matches!(err, TradingError::PositionNotOpen(_)));

        // the losing close consumed no quota slot and moved no money
        let quota = h.store.get_outcome_quota().unwrap();
        assert_eq!(quota.current_wins + quota.current_losses, 0);
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 800.0);
    }

    #[test]
    fn settled_manual_closes_match_consumed_slots() {
        let h = harness(10_000.0);
        h.store.update_outcome_quota(&quota(10, 3, 7, 0, 0)).unwrap();
        h.prices.set_price("btc", 100.0);

        // interleave settled closes with closes that lose the claim
        let mut settled = 0;
        for i in 0..6 {
            let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
            h.prices.set_price("btc", 110.0);
            if i % 2 == 0 {
                assert!(h.store.begin_close(&pos.id).unwrap());
                assert!(h.engine.manual_close(&pos.id).is_err());
            } else {
                h.engine.manual_close(&pos.id).unwrap();
                settled += 1;
            }
            h.prices.set_price("btc", 100.0);
        }

        let quota = h.store.get_outcome_quota().unwrap();
        assert_eq!(quota.current_wins + quota.current_losses, settled);
    }

    #[test]
    fn bound_closes_do_not_consume_quota() {
        let h = harness(1000.0);
        h.store.update_outcome_quota(&quota(10, 3, 7, 0, 0)).unwrap();

        h.prices.set_price("btc", 100.0);
        h.engine
            .open_position(OpenPositionRequest {
                stop_loss: Some(90.0),
                ..market_buy("user-1", "btc", 200.0)
            })
            .unwrap();
        h.prices.set_price("btc", 89.0);
        h.engine.monitor_open_positions().unwrap();

        let quota = h.store.get_outcome_quota().unwrap();
        assert_eq!(quota.current_wins + quota.current_losses, 0);
    }
}

mod admin {
    use super::*;

    #[test]
    fn admin_opens_and_closes_for_a_user() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 50.0);

        let pos = h
            .engine
            .open_position_as_admin("admin-1", market_buy("user-1", "btc", 200.0))
            .unwrap();
        assert!(pos.opened_by_admin);
        assert_eq!(pos.admin_id.as_deref(), Some("admin-1"));
        assert_eq!(pos.user_id, "user-1");
        // margin comes out of the user's portfolio
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 800.0);

        h.prices.set_price("btc", 55.0);
        let closed = h.engine.admin_close(&pos.id, None).unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::AdminClose));
        assert_eq!(h.engine.get_portfolio("user-1").unwrap().balance, 1020.0);
    }

    #[test]
    fn admin_choose_mode_allows_dressed_bound_closes() {
        let h = harness(1000.0);
        h.store
            .update_outcome_quota(&OutcomeQuota {
                sl_tp_mode: trademill::SlTpMode::AdminChoose,
                ..Default::default()
            })
            .unwrap();

        h.prices.set_price("btc", 100.0);
        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        h.prices.set_price("btc", 110.0);

        // dressed as a stop loss: the position loses despite being up
        let closed = h
            .engine
            .admin_close(&pos.id, Some(CloseReason::StopLoss))
            .unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::StopLoss));
        assert_eq!(closed.realized_pnl, Some(-20.0));
    }

    #[test]
    fn dressed_close_requires_admin_choose_mode() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 100.0);
        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        h.prices.set_price("btc", 110.0);

        // default mode ignores the requested reason
        let closed = h
            .engine
            .admin_close(&pos.id, Some(CloseReason::StopLoss))
            .unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::AdminClose));
    }

    #[test]
    fn profit_overlay_is_added_on_top_of_engine_pnl() {
        let h = harness(1000.0);
        h.prices.set_price("btc", 50.0);
        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();

        let updated = h.engine.set_admin_profit(&pos.id, 50.0).unwrap();
        assert_eq!(updated.admin_profit, 50.0);

        h.prices.set_price("btc", 55.0);
        let closed = h.engine.manual_close(&pos.id).unwrap();
        // recorded pnl includes the overlay
        assert_eq!(closed.realized_pnl, Some(70.0));
        // the ledger moves by the engine pnl alone
        let portfolio = h.engine.get_portfolio("user-1").unwrap();
        assert_eq!(portfolio.balance, 1020.0);
        assert_eq!(portfolio.total_profit, 20.0);
    }

    #[test]
    fn overlay_rejects_missing_or_settled_positions() {
        let h = harness(1000.0);
        let err = h.engine.set_admin_profit("nope", 50.0).unwrap_err();
        assert!(matches!(err, TradingError::PositionNotFound(_)));

        h.prices.set_price("btc", 50.0);
        let pos = h.engine.open_position(market_buy("user-1", "btc", 200.0)).unwrap();
        h.engine.manual_close(&pos.id).unwrap();
        let err = h.engine.set_admin_profit(&pos.id, 50.0).unwrap_err();
        assert!(matches!(err, TradingError::PositionNotOpen(_)));
    }
}
