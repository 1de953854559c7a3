//! End-to-end market scenarios

use crate::fixtures::MarketFixture;
use crate::framework::{Scenario, ScenarioOutcome};
use anyhow::{ensure, Context, Result};
use rust_decimal_macros::dec;
use tracing::debug;
use vamm::{price_at_tick, AccountId, VammError, VammMath};

/// Uniform range around the opening price splits its notional by distance
/// of each boundary from the current tick
pub struct UniformRangeScenario {
    pub initial_tick: i32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub notional: u128,
}

impl Default for UniformRangeScenario {
    fn default() -> Self {
        Self {
            initial_tick: -32_191,
            tick_lower: -46_055,
            tick_upper: -30_285,
            notional: 50_000_000_000,
        }
    }
}

impl Scenario for UniformRangeScenario {
    fn name(&self) -> &str {
        "uniform_range"
    }

    fn description(&self) -> &str {
        "Mint a uniform range around the opening price and split its unfilled notional"
    }

    fn execute(&self) -> Result<ScenarioOutcome> {
        let mut market = MarketFixture::new(self.initial_tick, 1)?;
        let owner = 7;

        let (lower, upper) = (self.tick_lower, self.tick_upper);
        let liquidity = VammMath::liquidity_for_base(lower, upper, self.notional)?;
        let liquidity = i128::try_from(liquidity).context("liquidity does not fit i128")?;
        let executed = market.mint(owner, lower, upper, liquidity)?;

        let bases = market.vamm.account_unfilled_bases(AccountId::new(owner))?;
        let total = bases.long + bases.short;
        ensure!(
            total.abs_diff(self.notional) <= 2,
            "unfilled total {} differs from notional {}",
            total,
            self.notional
        );

        let short = VammMath::base_between_ticks(lower, self.initial_tick, liquidity)?;
        let long = VammMath::base_between_ticks(self.initial_tick, upper, liquidity)?;
        ensure!(
            bases.short as i128 == short,
            "short {} expected {}",
            bases.short,
            short
        );
        ensure!(
            bases.long as i128 == long,
            "long {} expected {}",
            bases.long,
            long
        );

        Ok(ScenarioOutcome {
            vamm: market.vamm,
            metrics: vec![
                ("liquidity".to_string(), liquidity.to_string()),
                ("executed_base".to_string(), executed.to_string()),
                ("unfilled_short".to_string(), bases.short.to_string()),
                ("unfilled_long".to_string(), bases.long.to_string()),
            ],
        })
    }
}

/// Two overlapping ranges; swaps push the price through the inner range's
/// upper boundary, then the outer one
pub struct OverlappingRangesScenario {
    pub outer_liquidity: u128,
    pub inner_liquidity: u128,
}

impl Default for OverlappingRangesScenario {
    fn default() -> Self {
        Self {
            outer_liquidity: 1 << 50,
            inner_liquidity: 1 << 49,
        }
    }
}

impl Scenario for OverlappingRangesScenario {
    fn name(&self) -> &str {
        "overlapping_ranges"
    }

    fn description(&self) -> &str {
        "Cross the boundaries of two overlapping ranges and check liquidity bookkeeping"
    }

    fn execute(&self) -> Result<ScenarioOutcome> {
        let (outer_owner, inner_owner) = (10, 11);
        let mut market = MarketFixture::new(0, 60)?;
        market.mint(outer_owner, -1_200, 1_200, self.outer_liquidity as i128)?;
        market.mint(inner_owner, -600, 600, self.inner_liquidity as i128)?;
        let total = self.outer_liquidity + self.inner_liquidity;
        ensure!(market.vamm.state().liquidity == total);

        let inner_upper = *market.vamm.ticks().get(600).context("tick 600 missing")?;
        let outer_upper = *market.vamm.ticks().get(1_200).context("tick 1200 missing")?;

        market.advance(60);
        let first = market.swap_to(1 << 100, 900)?;
        ensure!(
            first.ticks_crossed == vec![600],
            "crossed {:?}",
            first.ticks_crossed
        );
        let expected = total as i128 + inner_upper.liquidity_net;
        ensure!(
            first.liquidity as i128 == expected,
            "liquidity {} after crossing, expected {}",
            first.liquidity,
            expected
        );

        market.advance(60);
        let second = market.swap_to(1 << 100, 1_500)?;
        ensure!(
            second.ticks_crossed == vec![1_200],
            "crossed {:?}",
            second.ticks_crossed
        );
        ensure!(
            second.liquidity == 0,
            "liquidity {} left above all ranges",
            second.liquidity
        );

        // crossing only flips growth outside
        for (tick, before) in [(600, inner_upper), (1_200, outer_upper)] {
            let after = market.vamm.ticks().info(tick);
            ensure!(
                after.liquidity_gross == before.liquidity_gross,
                "gross changed at {tick}"
            );
            ensure!(
                after.liquidity_net == before.liquidity_net,
                "net changed at {tick}"
            );
        }

        let trader_base = first.base_token_delta + second.base_token_delta;
        let vamm = &market.vamm;
        let outer = vamm.account_filled_balances(AccountId::new(outer_owner))?;
        let inner = vamm.account_filled_balances(AccountId::new(inner_owner))?;
        let lp_base = outer.base + inner.base;
        ensure!(
            (lp_base + trader_base).abs() <= 4,
            "providers hold {} base against trader {}",
            lp_base,
            trader_base
        );

        Ok(ScenarioOutcome {
            vamm: market.vamm,
            metrics: vec![
                ("trader_base".to_string(), trader_base.to_string()),
                ("provider_base".to_string(), lp_base.to_string()),
            ],
        })
    }
}

/// Grow the oracle, overwrite it once around, then compare the TWAP over the
/// whole retained history with a direct time-weighted sum
pub struct OracleHistoryScenario {
    pub cardinality: u16,
    /// Tick reached by each swap
    pub ticks: Vec<i32>,
    /// Seconds before each swap
    pub gaps: Vec<u64>,
    /// Seconds between the last swap and the query
    pub tail: u64,
}

impl OracleHistoryScenario {
    pub fn new(cardinality: u16) -> Self {
        let count = usize::from(cardinality) + 1;
        let pattern = [120, -300, 45, 700, -20, 260, -510, 90, 333, -75, 610];
        let n = pattern.len();
        let ticks = (0..count)
            .map(|i| pattern[i % n] + 60 * (i / n) as i32)
            .collect();
        let gaps = (0..count).map(|i| 7 + 3 * i as u64).collect();
        Self {
            cardinality,
            ticks,
            gaps,
            tail: 5,
        }
    }
}

impl Default for OracleHistoryScenario {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Scenario for OracleHistoryScenario {
    fn name(&self) -> &str {
        "oracle_history"
    }

    fn description(&self) -> &str {
        "Fill and wrap the observation buffer, then average over the full history"
    }

    fn execute(&self) -> Result<ScenarioOutcome> {
        let mut market = MarketFixture::new(0, 60)?;
        market.grow_oracle(self.cardinality)?;

        // (time, tick from then on)
        let mut history = vec![(market.now, 0)];
        for (&tick, &gap) in self.ticks.iter().zip(&self.gaps) {
            market.advance(gap);
            let current = market.vamm.state().tick;
            let amount = if tick > current { 1 } else { -1 };
            let result = market.swap_to(amount, tick)?;
            ensure!(
                result.tick == tick,
                "swap reached tick {} instead of {}",
                result.tick,
                tick
            );
            history.push((market.now, tick));
        }
        market.advance(self.tail);
        let now = market.now;

        let retained = usize::from(self.cardinality).min(history.len());
        let oldest = history.len() - retained;
        let oldest_time = history[oldest].0;

        let mut weighted: i64 = 0;
        for (i, &(time, tick)) in history.iter().enumerate().skip(oldest) {
            let end = history.get(i + 1).map(|(t, _)| *t).unwrap_or(now);
            weighted += i64::from(tick) * (end - time) as i64;
        }
        let window = now - oldest_time;
        let naive = weighted.div_euclid(window as i64) as i32;

        let observed = market.vamm.observe_mean_tick(now, window as u32)?;
        debug!(naive, observed, window, "Compared oracle mean tick");
        ensure!(
            observed == naive,
            "oracle mean {} differs from direct mean {}",
            observed,
            naive
        );

        let twap = market.vamm.twap(now, window as u32, 0, false, false)?;
        ensure!(twap == price_at_tick(naive)? / dec!(100));

        let too_old = market.vamm.observe_mean_tick(now, window as u32 + 1);
        ensure!(
            matches!(too_old, Err(VammError::ObservationTooOld { .. })),
            "lookback past the oldest observation returned {:?}",
            too_old
        );

        Ok(ScenarioOutcome {
            vamm: market.vamm,
            metrics: vec![
                ("window_secs".to_string(), window.to_string()),
                ("mean_tick".to_string(), observed.to_string()),
                ("twap".to_string(), twap.to_string()),
            ],
        })
    }
}

/// Every scenario with its default parameters
pub fn all_scenarios() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(UniformRangeScenario::default()),
        Box::new(OverlappingRangesScenario::default()),
        Box::new(OracleHistoryScenario::default()),
    ]
}
