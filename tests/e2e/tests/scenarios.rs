//! End-to-end checks across the engine facade, the market pool and settings loading

use irs_e2e_tests::{
    all_scenarios, MarketFixture, MarketValidator, OracleHistoryScenario, ScenarioRunner,
    TestConfig, FIXTURE_START, OPERATOR,
};
use proptest::prelude::*;
use rust_decimal_macros::dec;
use std::sync::{Barrier, Mutex};
use test_log::test;
use vamm::{
    sqrt_price_at_tick, AccountId, AuthorizationGate, CallContext, Decimal, FixedRateIndex,
    GatedAction, MarketId, MarketKey, OpenGate, RateIndexSource, SwapParams, VammConfig, VammError,
    VammImmutableConfig, VammMutableConfig, VammPool, VammResult, MAX_TICK, MIN_TICK,
    SECONDS_IN_YEAR,
};

const MATURITY: u64 = FIXTURE_START + SECONDS_IN_YEAR;

fn pool_with_market(market_id: u64, tick: i32) -> (VammPool, MarketKey) {
    let pool = VammPool::new();
    let index = FixedRateIndex(Decimal::ONE);
    let ctx = CallContext::new(FIXTURE_START, OPERATOR, &OpenGate, &index);
    let config = VammConfig::new(
        VammImmutableConfig::new(MarketId::new(market_id), MATURITY, 60).unwrap(),
        VammMutableConfig::default(),
    )
    .unwrap();
    pool.create_market(&ctx, config, sqrt_price_at_tick(tick).unwrap())
        .unwrap();
    let key = (MarketId::new(market_id), MATURITY);
    pool.mint_or_burn(&ctx, key, AccountId::new(5), -600, 600, 1 << 45)
        .unwrap();
    (pool, key)
}

#[test]
fn test_all_scenarios_pass() {
    let runner = ScenarioRunner::new(TestConfig::default());
    let results = runner.run_all(&all_scenarios());

    assert_eq!(results.len(), 3);
    for result in &results {
        assert!(
            result.success,
            "{} failed: {:?} {:?}",
            result.scenario_name, result.error_message, result.validation_results
        );
        assert!(result.validation_results.iter().all(|v| v.passed));
    }
}

#[test]
fn test_oracle_history_with_larger_buffer() {
    let runner = ScenarioRunner::new(TestConfig::default());
    let result = runner.run(&OracleHistoryScenario::new(20));
    assert!(result.success, "{:?}", result.error_message);
}

#[test]
fn test_single_provider_takes_the_other_side_exactly() {
    // a power-of-two liquidity keeps the growth accumulators exact
    let mut market = MarketFixture::new(0, 60).unwrap();
    market.mint(3, -600, 600, 1 << 40).unwrap();

    market.advance(3_600);
    let result = market.swap_to(1_000_000, 540).unwrap();
    assert!(result.ticks_crossed.is_empty());
    assert_eq!(result.base_token_delta, -1_000_000);

    let filled = market
        .vamm
        .account_filled_balances(AccountId::new(3))
        .unwrap();
    assert_eq!(filled.base, -result.base_token_delta);
    assert_eq!(filled.quote, -result.quote_token_delta);
}

#[test]
fn test_crossing_down_conserves_base() {
    let (outer, inner) = (1u128 << 50, 1u128 << 49);
    let mut market = MarketFixture::new(0, 60).unwrap();
    market.mint(10, -1_200, 1_200, outer as i128).unwrap();
    market.mint(11, -600, 600, inner as i128).unwrap();

    market.advance(600);
    let result = market.swap_to(-(1 << 100), -900).unwrap();
    assert_eq!(result.ticks_crossed, vec![-600]);
    assert_eq!(result.liquidity, outer);
    assert_eq!(market.vamm.state().tick, result.tick);
    assert!(result.tick < -600 && result.tick >= -900);

    let providers: i128 = [10, 11]
        .into_iter()
        .map(|owner| {
            market
                .vamm
                .account_filled_balances(AccountId::new(owner))
                .unwrap()
                .base
        })
        .sum();
    assert!((providers + result.base_token_delta).abs() <= 4);

    for check in MarketValidator::validate(&market.vamm) {
        assert!(check.passed, "{}: {}", check.validator, check.message);
    }
}

#[test]
fn test_rejected_mint_leaves_no_trace() {
    let mut market = MarketFixture::new(0, 16_384).unwrap();
    let max = market.vamm.config().immutable.max_liquidity_per_tick;
    assert_eq!(max, u128::MAX / 9);

    market.mint(1, 0, 16_384, (max - 10) as i128).unwrap();
    let state_before = *market.vamm.state();

    let err = market.mint(2, -16_384, 16_384, 100).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VammError>(),
        Some(VammError::MaxLiquidityPerTickExceeded { tick: 16_384, .. })
    ));

    assert!(!market.vamm.ticks().is_initialized(-16_384));
    assert!(market.vamm.ticks().get(-16_384).is_none());
    assert_eq!(*market.vamm.state(), state_before);
    let unfilled = market.vamm.account_unfilled_bases(AccountId::new(2));
    assert_eq!(unfilled.unwrap(), Default::default());
    assert!(market.vamm.state().unlocked);
}

#[test]
fn test_markets_at_the_price_limits_validate() {
    for tick in [MIN_TICK, MAX_TICK] {
        let market = MarketFixture::new(tick, 1).unwrap();
        assert_eq!(market.vamm.state().tick, tick);
        for check in MarketValidator::validate(&market.vamm) {
            assert!(
                check.passed,
                "tick {tick} {}: {}",
                check.validator, check.message
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_price_impact_moves_twap_with_order_side(size in 1i128..1_000_000_000_000i128) {
        let mutable = VammMutableConfig {
            price_impact_phi: dec!(0.0001),
            price_impact_beta: dec!(0.5),
            ..VammMutableConfig::default()
        };
        let market = MarketFixture::with_mutable(-16_096, 60, mutable).unwrap();
        let now = market.now;

        let plain = market.vamm.twap(now, 0, size, false, false).unwrap();
        let buy = market.vamm.twap(now, 0, size, true, false).unwrap();
        let sell = market.vamm.twap(now, 0, -size, true, false).unwrap();

        prop_assert!(buy > plain);
        prop_assert!(sell < plain);
        prop_assert!(sell >= Decimal::ZERO);
    }
}

#[test]
fn test_busy_market_rejects_other_threads() {
    let (pool, key) = pool_with_market(1, 0);
    let holding = Barrier::new(2);
    let attempted = Barrier::new(2);

    std::thread::scope(|s| {
        s.spawn(|| {
            pool.with_market_mut(key.0, key.1, |vamm| {
                holding.wait();
                attempted.wait();
                Ok(vamm.state().tick)
            })
            .unwrap();
        });

        s.spawn(|| {
            holding.wait();
            let index = FixedRateIndex(Decimal::ONE);
            let ctx = CallContext::new(FIXTURE_START + 60, OPERATOR, &OpenGate, &index);
            let params = SwapParams::new(1_000, sqrt_price_at_tick(300).unwrap());
            let swap = pool.swap(&ctx, key, params);
            let read = pool.account_filled_balances(key, AccountId::new(5));
            attempted.wait();

            assert_eq!(
                swap.unwrap_err(),
                VammError::Locked {
                    market_id: key.0,
                    maturity: key.1,
                }
            );
            assert!(matches!(read, Err(VammError::Locked { .. })));
        });
    });

    // released once the holder returns
    let index = FixedRateIndex(Decimal::ONE);
    let ctx = CallContext::new(FIXTURE_START + 60, OPERATOR, &OpenGate, &index);
    let params = SwapParams::new(1_000, sqrt_price_at_tick(300).unwrap());
    let result = pool.swap(&ctx, key, params).unwrap();
    assert_eq!(result.base_token_delta, -1_000);
}

/// Rate source that trades on the market it is quoting for
struct ReentrantIndex<'a> {
    pool: &'a VammPool,
    key: MarketKey,
    observed: Mutex<Option<VammResult<()>>>,
}

impl RateIndexSource for ReentrantIndex<'_> {
    fn current_index(&self, _market_id: MarketId) -> anyhow::Result<Decimal> {
        let index = FixedRateIndex(Decimal::ONE);
        let ctx = CallContext::new(FIXTURE_START + 60, OPERATOR, &OpenGate, &index);
        let params = SwapParams::new(10, sqrt_price_at_tick(300)?);
        let nested = self.pool.swap(&ctx, self.key, params).map(|_| ());
        *self.observed.lock().unwrap() = Some(nested);
        Ok(Decimal::ONE)
    }
}

#[test]
fn test_reentrant_call_is_rejected() {
    let (pool, key) = pool_with_market(1, 0);
    let index = ReentrantIndex {
        pool: &pool,
        key,
        observed: Mutex::new(None),
    };
    let ctx = CallContext::new(FIXTURE_START + 60, OPERATOR, &OpenGate, &index);

    let params = SwapParams::new(1_000, sqrt_price_at_tick(300).unwrap());
    let outer = pool.swap(&ctx, key, params).unwrap();
    assert_eq!(outer.base_token_delta, -1_000);

    let nested = index.observed.lock().unwrap().take();
    assert!(matches!(nested, Some(Err(VammError::Locked { .. }))));

    // only the outer trade landed
    let lp = AccountId::new(5);
    let filled = pool.account_filled_balances(key, lp).unwrap();
    assert_eq!(filled.base, 1_000);
}

/// Blocks one account from trading and pauses one market
struct RestrictiveGate {
    blocked: AccountId,
    paused: MarketId,
}

impl AuthorizationGate for RestrictiveGate {
    fn is_authorized(&self, account: AccountId, action: GatedAction) -> bool {
        !(account == self.blocked && action == GatedAction::Swap)
    }

    fn is_paused(&self, market_id: MarketId) -> bool {
        market_id == self.paused
    }
}

#[test]
fn test_pool_applies_authorization_gate() {
    let (pool, open_key) = pool_with_market(1, 0);
    let index = FixedRateIndex(Decimal::ONE);
    let setup = CallContext::new(FIXTURE_START, OPERATOR, &OpenGate, &index);
    let config = VammConfig::new(
        VammImmutableConfig::new(MarketId::new(2), MATURITY, 60).unwrap(),
        VammMutableConfig::default(),
    )
    .unwrap();
    pool.create_market(&setup, config, sqrt_price_at_tick(0).unwrap())
        .unwrap();
    let paused_key = (MarketId::new(2), MATURITY);

    let gate = RestrictiveGate {
        blocked: AccountId::new(9),
        paused: MarketId::new(2),
    };
    let params = SwapParams::new(1_000, sqrt_price_at_tick(300).unwrap());

    let blocked = CallContext::new(FIXTURE_START + 60, AccountId::new(9), &gate, &index);
    assert_eq!(
        pool.swap(&blocked, open_key, params),
        Err(VammError::Unauthorized {
            account: AccountId::new(9),
            action: GatedAction::Swap,
        })
    );
    // other actions stay available to that account
    pool.mint_or_burn(&blocked, open_key, AccountId::new(9), -60, 60, 1 << 30)
        .unwrap();

    let trader = CallContext::new(FIXTURE_START + 60, AccountId::new(4), &gate, &index);
    assert!(pool.swap(&trader, open_key, params).is_ok());
    assert_eq!(
        pool.mint_or_burn(&trader, paused_key, AccountId::new(4), -60, 60, 1 << 30),
        Err(VammError::Paused {
            market_id: MarketId::new(2),
        })
    );
    // configuration is not blocked by a pause
    pool.set_mutable_config(&trader, paused_key, VammMutableConfig::default())
        .unwrap();
}

#[test]
fn test_markets_created_from_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vamm.toml");
    std::fs::write(
        &path,
        r#"
[global]
log_level = "debug"

[[markets]]
market_id = 7
maturity_timestamp = 1800000000
tick_spacing = 60
initial_tick = -16080
price_impact_phi = "0.0001"
price_impact_beta = "0.5"
spread = "0.001"
observation_cardinality_next = 12

[[markets]]
market_id = 8
maturity_timestamp = 1800000000
initial_tick = 120
min_tick = -6000
max_tick = 6000
"#,
    )
    .unwrap();

    let settings = config::VammSettings::load(Some(&path), None).unwrap();
    let pool = VammPool::new();
    let index = FixedRateIndex(Decimal::ONE);
    let ctx = CallContext::new(FIXTURE_START, OPERATOR, &OpenGate, &index);
    for market in &settings.markets {
        pool.create_from_settings(&ctx, market).unwrap();
    }

    assert_eq!(
        pool.market_keys(),
        vec![
            (MarketId::new(7), 1_800_000_000),
            (MarketId::new(8), 1_800_000_000),
        ]
    );

    let (tick, cardinality_next, spread) = pool
        .with_market(MarketId::new(7), 1_800_000_000, |vamm| {
            Ok((
                vamm.state().tick,
                vamm.state().observation_cardinality_next,
                vamm.config().mutable.spread,
            ))
        })
        .unwrap();
    assert_eq!(tick, -16_080);
    assert_eq!(cardinality_next, 12);
    assert_eq!(spread, dec!(0.001));

    let window = pool
        .with_market(MarketId::new(8), 1_800_000_000, |vamm| {
            let mutable = &vamm.config().mutable;
            Ok((mutable.min_tick, mutable.max_tick))
        })
        .unwrap();
    assert_eq!(window, (-6_000, 6_000));

    assert!(matches!(
        pool.create_from_settings(&ctx, &settings.markets[0]),
        Err(VammError::MarketAlreadyExists { .. })
    ));
}
