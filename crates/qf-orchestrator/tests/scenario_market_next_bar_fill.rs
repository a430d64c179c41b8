//! Scenario: a MARKET buy submitted on bar T fills on bar T+1 at its open.
//!
//! Bars: T1 (100, 101, 99, 100.5) and T2 (102, 103, 101, 102.5), plus an
//! observation bar T3. Expected: acceptance at T1, one fill at T2's open of
//! 102, and a position of +1 at average 102 visible from T3 on.

mod common;

use std::collections::BTreeMap;

use common::{ts, Scenario, ScriptedLogic};
use qf_models::{RunStatus, TradeSide};
use qf_strategy::OrderIntent;

#[test]
fn market_buy_fills_next_bar_at_open() {
    let scenario = Scenario::with_bars(
        "AAA",
        &[
            (1, 100.0, 101.0, 99.0, 100.5),
            (2, 102.0, 103.0, 101.0, 102.5),
            (3, 103.0, 104.0, 102.0, 103.5),
        ],
    );

    let (logic, snapshots) = ScriptedLogic::new(BTreeMap::from([(
        0usize,
        vec![OrderIntent::market(TradeSide::Buy, 1.0)],
    )]));
    let report = scenario.run_scripted("AAA", logic);
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.bars_replayed, 3);

    let fills = scenario.fills(&report.run_id);
    assert_eq!(fills.len(), 1);
    let (fill_ts, side, quantity, price) = &fills[0];
    assert_eq!(*fill_ts, ts(2));
    assert_eq!(side, "BUY");
    assert_eq!(*quantity, 1.0);
    assert_eq!(*price, 102.0);

    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 3);
    // Nothing filled while T1 was processed.
    assert_eq!(snapshots[0].position, 0.0);
    // By T3 the fill from T2 has been applied.
    assert_eq!(snapshots[2].position, 1.0);
    assert_eq!(snapshots[2].avg_price, 102.0);

    // Acceptance was recorded, and exactly one order existed in the run.
    let db = scenario.runs();
    assert_eq!(
        db.count_events("orders_accepted", &report.run_id).unwrap(),
        1
    );
    assert_eq!(
        db.count_events("order_submissions", &report.run_id).unwrap(),
        1
    );
}
