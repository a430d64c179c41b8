//! Scenario: a LIMIT buy fills at the better of limit and open.
//!
//! Bars: T1 (100, 101, 99, 100.5), T2 (98, 99, 96, 97). A LIMIT BUY at 97
//! submitted on T1 triggers on T2 (low 96 <= 97) and fills at
//! min(97, open 98) = 97.

mod common;

use std::collections::BTreeMap;

use common::{ts, Scenario, ScriptedLogic};
use qf_models::{RunStatus, TradeSide};
use qf_strategy::OrderIntent;

#[test]
fn limit_buy_fills_at_limit_price() {
    let scenario = Scenario::with_bars(
        "AAA",
        &[
            (1, 100.0, 101.0, 99.0, 100.5),
            (2, 98.0, 99.0, 96.0, 97.0),
            (3, 97.5, 98.0, 96.5, 97.2),
        ],
    );

    let (logic, snapshots) = ScriptedLogic::new(BTreeMap::from([(
        0usize,
        vec![OrderIntent::limit(TradeSide::Buy, 1.0, 97.0)],
    )]));
    let report = scenario.run_scripted("AAA", logic);
    assert_eq!(report.status, RunStatus::Completed);

    let fills = scenario.fills(&report.run_id);
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].0, ts(2));
    assert_eq!(fills[0].3, 97.0);

    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots[2].position, 1.0);
    assert_eq!(snapshots[2].avg_price, 97.0);
}

#[test]
fn limit_buy_takes_the_open_when_it_gaps_below() {
    let scenario = Scenario::with_bars(
        "AAA",
        &[
            (1, 100.0, 101.0, 99.0, 100.5),
            (2, 95.0, 96.0, 94.0, 95.5),
            (3, 95.5, 96.0, 95.0, 95.8),
        ],
    );

    let (logic, snapshots) = ScriptedLogic::new(BTreeMap::from([(
        0usize,
        vec![OrderIntent::limit(TradeSide::Buy, 1.0, 97.0)],
    )]));
    let report = scenario.run_scripted("AAA", logic);

    let fills = scenario.fills(&report.run_id);
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].3, 95.0);

    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots[2].avg_price, 95.0);
}
