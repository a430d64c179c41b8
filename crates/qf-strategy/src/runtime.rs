//! The strategy subscriber: bar pipeline plus response state machine.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use qf_bus::{spawn_subscriber, EventBus, EventHandler, SubscriberHandle};
use qf_events::market::{BarProcessed, BarReceived};
use qf_events::{Event, EventKind};
use qf_models::BarPeriod;

use crate::api::StrategyApi;
use crate::params::{ParamSpec, ParamValue, ResolvedParams};

/// Static description of a strategy: identity, traded universe, timeframe,
/// and tunable-parameter schema. Consumed as plain data by run-configuration
/// tooling.
#[derive(Clone, Debug)]
pub struct StrategyDef {
    pub name: String,
    pub symbols: Vec<String>,
    pub bar_period: BarPeriod,
    pub params: BTreeMap<String, ParamSpec>,
}

impl StrategyDef {
    pub fn new(name: impl Into<String>, symbols: Vec<String>, bar_period: BarPeriod) -> Self {
        Self {
            name: name.into(),
            symbols,
            bar_period,
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.params.insert(name.into(), spec);
        self
    }
}

/// User-supplied trading logic.
///
/// `setup` runs once at construction, after parameter resolution, and is the
/// only place indicators may be registered. `on_bar` runs for every accepted
/// bar after the indicators updated and the processed bar was published.
/// Errors from either hook are routed through the subscriber error channel;
/// they never kill the worker.
pub trait StrategyLogic: Send + 'static {
    fn setup(&mut self, _api: &mut StrategyApi) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_bar(&mut self, api: &mut StrategyApi, bar: &BarReceived) -> anyhow::Result<()>;
}

/// The subscriber wrapping one configured strategy instance.
pub struct StrategyRuntime {
    def: StrategyDef,
    api: StrategyApi,
    logic: Box<dyn StrategyLogic>,
}

impl StrategyRuntime {
    fn on_bar_received(&mut self, bar: &BarReceived) -> anyhow::Result<()> {
        if !self.def.symbols.iter().any(|s| s == &bar.symbol) {
            return Ok(());
        }
        if bar.bar_period != self.def.bar_period {
            return Ok(());
        }

        self.api.set_active(&bar.symbol, bar.ts_event_ns);
        self.api.update_indicators(bar);

        let values = self.api.indicator_values(&bar.symbol);
        self.api
            .bus()
            .publish(BarProcessed::from_bar(bar, values));

        self.logic.on_bar(&mut self.api, bar)
    }
}

impl EventHandler for StrategyRuntime {
    fn on_event(&mut self, event: &Arc<Event>) -> anyhow::Result<()> {
        match event.as_ref() {
            Event::BarReceived(bar) => self.on_bar_received(bar)?,
            Event::OrderAccepted(e) => self.api.on_order_accepted(e.system_order_id),
            Event::OrderRejected(e) => self.api.on_order_rejected(e.system_order_id),
            Event::ModificationAccepted(e) => self.api.on_modification_accepted(e.system_order_id),
            Event::ModificationRejected(e) => self.api.on_modification_rejected(e.system_order_id),
            Event::CancellationAccepted(e) => self.api.on_cancellation_accepted(e.system_order_id),
            Event::CancellationRejected(e) => self.api.on_cancellation_rejected(e.system_order_id),
            Event::Fill(e) => self.api.on_fill(e),
            Event::OrderExpired(e) => self.api.on_order_expired(e.system_order_id),
            _ => {}
        }
        Ok(())
    }

    fn on_error(&mut self, error: anyhow::Error, event: &Arc<Event>) {
        tracing::warn!(
            strategy = %self.def.name,
            kind = ?event.kind(),
            %error,
            "strategy handler error"
        );
    }
}

/// Construct a strategy instance and register it on the bus.
///
/// Resolution order: parameters (defaults + `overrides`), then the identity
/// indicators, then `logic.setup` (registering further indicators), then
/// subscription to `BarReceived` and the eight order-response kinds.
pub fn build_strategy(
    bus: &Arc<EventBus>,
    def: StrategyDef,
    overrides: &BTreeMap<String, ParamValue>,
    mut logic: Box<dyn StrategyLogic>,
) -> anyhow::Result<SubscriberHandle> {
    let params = ResolvedParams::resolve(&def.params, overrides)
        .with_context(|| format!("resolving parameters for strategy {}", def.name))?;

    let mut api = StrategyApi::new(Arc::clone(bus), params);
    logic
        .setup(&mut api)
        .with_context(|| format!("setup failed for strategy {}", def.name))?;

    let name = def.name.clone();
    let runtime = StrategyRuntime { def, api, logic };
    let handle = spawn_subscriber(name, runtime);

    bus.subscribe(EventKind::BarReceived, &handle);
    bus.subscribe_many(&EventKind::ORDER_RESPONSES, &handle);
    Ok(handle)
}
