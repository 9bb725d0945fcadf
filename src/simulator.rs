//! Synthetic telemetry generator.
//!
//! A [`Simulator`] owns its own timer loop, tick counter and RNG. Each tick
//! produces one [`Reading`] per sensor in the store (baseline + slow sinusoid
//! + bounded jitter, clamped to a physical range), a fresh [`Kpis`] snapshot,
//! and with fixed probabilities one [`Alert`] and one [`Recommendation`]. The
//! sensor snapshot and the batch write share one store write lock per tick.
//!
//! KPI figures are sampled independently of the readings of the same tick.
//! Alert and recommendation field ids are drawn from the id space captured
//! when the simulator was built; they are not checked against the live
//! field set, so deleting a field can leave orphaned references (logged).

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Action, Alert, Kpis, Reading, Recommendation, Sensor, Severity};
use crate::store::{SharedStore, Store};

/// Shortest accepted tick period; shorter requests are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Shape of one simulated measurement.
#[derive(Debug, Clone, Copy)]
struct Channel {
    baseline: f64,
    amplitude: f64,
    /// Ticks per radian of the periodic component.
    period: f64,
    jitter: f64,
    min: f64,
    max: f64,
}

impl Channel {
    // ---
    fn sample<R: Rng>(&self, tick: u64, phase: f64, rng: &mut R) -> f64 {
        let periodic = self.amplitude * (tick as f64 / self.period + phase).sin();
        let jitter = rng.gen_range(-self.jitter..=self.jitter);
        (self.baseline + periodic + jitter).clamp(self.min, self.max)
    }
}

const NITRATE: Channel = Channel {
    baseline: 7.5,
    amplitude: 3.0,
    period: 10.0,
    jitter: 1.5,
    min: 0.0,
    max: 15.0,
};

const MOISTURE: Channel = Channel {
    baseline: 45.0,
    amplitude: 15.0,
    period: 12.0,
    jitter: 5.0,
    min: 10.0,
    max: 80.0,
};

const TEMPERATURE: Channel = Channel {
    baseline: 25.0,
    amplitude: 5.0,
    period: 8.0,
    jitter: 2.0,
    min: 15.0,
    max: 35.0,
};

pub const NITRATE_RANGE: RangeInclusive<f64> = NITRATE.min..=NITRATE.max;
pub const MOISTURE_RANGE: RangeInclusive<f64> = MOISTURE.min..=MOISTURE.max;
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = TEMPERATURE.min..=TEMPERATURE.max;

const KPI_NITRATE: RangeInclusive<f64> = 2.0..=12.0;
const KPI_MOISTURE: RangeInclusive<f64> = 20.0..=70.0;
const KPI_TEMPERATURE: RangeInclusive<f64> = 18.0..=32.0;

const ALERT_TEMPLATES: [&str; 4] = [
    "High nitrate levels detected",
    "Moisture levels below threshold",
    "Temperature spike",
    "Sensor reporting irregular values",
];

const RECOMMENDATION_TEMPLATES: [(Action, f64, &str); 4] = [
    (Action::Irrigate, 100.0, "Low moisture levels"),
    (Action::Irrigate, 60.0, "Heat stress expected this afternoon"),
    (Action::Fertilize, 50.0, "Nutrient deficiency"),
    (Action::Fertilize, 25.0, "Nitrate trending below target"),
];

/// Tunables for a simulator instance.
#[derive(Debug, Clone)]
pub struct SimSettings {
    // ---
    pub alert_probability: f64,
    pub recommendation_probability: f64,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl SimSettings {
    // ---
    /// Probabilities clamped into [0, 1]; NaN becomes 0.
    fn sanitized(mut self) -> Self {
        // ---
        for p in [
            &mut self.alert_probability,
            &mut self.recommendation_probability,
        ] {
            let value = *p;
            let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
            if clamped != value {
                warn!("Probability {} out of range, using {}", value, clamped);
                *p = clamped;
            }
        }
        self
    }
}

impl Default for SimSettings {
    fn default() -> Self {
        SimSettings {
            alert_probability: 0.3,
            recommendation_probability: 0.2,
            seed: None,
        }
    }
}

/// Everything produced by one tick.
#[derive(Debug, Clone)]
pub struct TickBatch {
    // ---
    pub tick: u64,
    pub readings: Vec<Reading>,
    pub kpis: Kpis,
    pub alert: Option<Alert>,
    pub recommendation: Option<Recommendation>,
}

/// Pure per-tick generation state: counter, RNG and field-id space.
#[derive(Debug)]
pub struct Generator {
    // ---
    settings: SimSettings,
    rng: StdRng,
    field_ids: Vec<String>,
    tick: u64,
}

impl Generator {
    // ---
    pub fn new(settings: SimSettings, field_ids: Vec<String>) -> Self {
        // ---
        let settings = settings.sanitized();
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Generator {
            settings,
            rng,
            field_ids,
            tick: 0,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance the tick counter and generate a batch for `sensors`.
    pub fn next_batch<'a, I>(&mut self, sensors: I, now: DateTime<Utc>) -> TickBatch
    where
        I: IntoIterator<Item = &'a Sensor>,
    {
        // ---
        self.tick += 1;
        let tick = self.tick;

        let readings = sensors
            .into_iter()
            .enumerate()
            .map(|(i, sensor)| {
                // Offset each sensor's phase so they do not move in lockstep
                let phase = i as f64 * 0.7;
                Reading {
                    sensor_id: sensor.id.clone(),
                    timestamp: now,
                    nitrate_mg_l: NITRATE.sample(tick, phase, &mut self.rng),
                    moisture_pct: MOISTURE.sample(tick, phase, &mut self.rng),
                    temperature_c: TEMPERATURE.sample(tick, phase, &mut self.rng),
                }
            })
            .collect();

        let kpis = Kpis {
            avg_nitrate: self.rng.gen_range(KPI_NITRATE),
            avg_moisture: self.rng.gen_range(KPI_MOISTURE),
            avg_temp: self.rng.gen_range(KPI_TEMPERATURE),
            generated_at: now,
        };

        let alert = if self.rng.gen_bool(self.settings.alert_probability) {
            self.random_alert(now)
        } else {
            None
        };
        let recommendation = if self.rng.gen_bool(self.settings.recommendation_probability) {
            self.random_recommendation(now)
        } else {
            None
        };

        TickBatch {
            tick,
            readings,
            kpis,
            alert,
            recommendation,
        }
    }

    fn random_alert(&mut self, now: DateTime<Utc>) -> Option<Alert> {
        // ---
        let field_id = self.field_ids.choose(&mut self.rng)?.clone();
        let message = ALERT_TEMPLATES.choose(&mut self.rng)?;
        let severity = *Severity::ALL.choose(&mut self.rng)?;
        Some(Alert {
            id: Uuid::new_v4().to_string(),
            message: format!("{} in {}", message, field_id),
            field_id,
            severity,
            created_at: now,
        })
    }

    fn random_recommendation(&mut self, now: DateTime<Utc>) -> Option<Recommendation> {
        // ---
        let field_id = self.field_ids.choose(&mut self.rng)?.clone();
        let (action, amount, reason) = *RECOMMENDATION_TEMPLATES.choose(&mut self.rng)?;
        let severity = *Severity::ALL.choose(&mut self.rng)?;
        Some(Recommendation {
            id: Uuid::new_v4().to_string(),
            field_id,
            action,
            amount,
            units: action.units(),
            reason: reason.to_string(),
            severity,
            created_at: now,
        })
    }
}

/// Write a batch into the store and return how many of its alert and
/// recommendation field ids are unknown to the store. The batch is recorded
/// either way.
fn record_batch(store: &mut Store, batch: TickBatch) -> usize {
    // ---
    let mut orphaned = 0;
    for id in batch
        .alert
        .iter()
        .map(|a| &a.field_id)
        .chain(batch.recommendation.iter().map(|r| &r.field_id))
    {
        if !store.contains_field(id) {
            warn!("Tick {} references unknown field {}", batch.tick, id);
            orphaned += 1;
        }
    }

    let count = batch.readings.len();
    for reading in batch.readings {
        store.push_reading(reading);
    }
    store.set_kpis(batch.kpis);
    if let Some(alert) = batch.alert {
        store.push_alert(alert);
    }
    if let Some(recommendation) = batch.recommendation {
        store.push_recommendation(recommendation);
    }

    debug!("Tick {} recorded {} readings", batch.tick, count);
    orphaned
}

/// Handle to the running loop.
struct Running {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<Generator>,
}

/// Timer-driven telemetry generator bound to one store.
///
/// Lifecycle is explicit: build with [`Simulator::new`], [`start`](Self::start),
/// [`stop`](Self::stop). Dropping a running simulator aborts its loop.
pub struct Simulator {
    // ---
    store: SharedStore,
    settings: SimSettings,
    field_ids: Vec<String>,
    /// Parked generator while idle; moved into the loop while running.
    generator: Option<Generator>,
    running: Option<Running>,
    ticks: Arc<AtomicU64>,
}

impl Simulator {
    // ---
    /// Build an idle simulator. The field-id space for alerts and
    /// recommendations is the store's field set at this moment.
    pub async fn new(store: SharedStore, settings: SimSettings) -> Self {
        // ---
        let field_ids = store.read().await.field_ids();
        Self::with_field_ids(store, settings, field_ids)
    }

    pub fn with_field_ids(store: SharedStore, settings: SimSettings, field_ids: Vec<String>) -> Self {
        Simulator {
            generator: Some(Generator::new(settings.clone(), field_ids.clone())),
            store,
            settings,
            field_ids,
            running: None,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Number of ticks recorded so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Start producing a batch every `interval`, the first one a full
    /// interval from now. Restarts the loop if it is already running.
    /// Intervals below [`MIN_INTERVAL`] are raised to it.
    pub async fn start(&mut self, interval: Duration) {
        // ---
        if self.is_running() {
            self.stop().await;
        }
        let interval = if interval < MIN_INTERVAL {
            warn!("Simulator interval {:?} too short, using {:?}", interval, MIN_INTERVAL);
            MIN_INTERVAL
        } else {
            interval
        };
        let mut generator = self.generator.take().unwrap_or_else(|| self.fresh_generator());

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let store = self.store.clone();
        let ticks = self.ticks.clone();
        let first_tick = Instant::now() + interval;

        let join = tokio::spawn(async move {
            // ---
            let mut timer = interval_at(first_tick, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = timer.tick() => {
                        let mut guard = store.write().await;
                        let batch = generator.next_batch(guard.sensors(), Utc::now());
                        record_batch(&mut guard, batch);
                        drop(guard);
                        ticks.fetch_add(1, Ordering::AcqRel);
                    }
                }
            }
            generator
        });

        info!("Simulator started with interval {:?}", interval);
        self.running = Some(Running { stop_tx, join });
    }

    /// Stop the loop if running; a no-op otherwise. An in-progress tick
    /// completes before the loop exits.
    pub async fn stop(&mut self) {
        // ---
        let Some(Running { stop_tx, join }) = self.running.take() else {
            return;
        };
        let _ = stop_tx.send(());
        match join.await {
            Ok(generator) => {
                info!("Simulator stopped after {} ticks", generator.tick());
                self.generator = Some(generator);
            }
            Err(e) => {
                warn!("Simulator loop ended abnormally: {}", e);
                self.generator = Some(self.fresh_generator());
            }
        }
    }

    /// Generator rebuilt from the stored settings and field-id space, used
    /// when the previous one was lost with its loop.
    fn fresh_generator(&self) -> Generator {
        Generator::new(self.settings.clone(), self.field_ids.clone())
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.join.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::ReadingsFilter;
    use crate::store::Store;
    use chrono::TimeZone;

    fn seeded_settings() -> SimSettings {
        SimSettings {
            seed: Some(7),
            ..Default::default()
        }
    }

    fn test_sensors(n: usize) -> Vec<Sensor> {
        (0..n)
            .map(|i| Sensor {
                id: format!("sensor{}", i + 1),
                kind: crate::models::SensorKind::SoilProbe,
                lat: 0.0,
                lng: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_readings_stay_in_range() {
        // ---
        let sensors = test_sensors(4);
        let mut generator = Generator::new(seeded_settings(), vec!["field1".to_string()]);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        for _ in 0..2_000 {
            let batch = generator.next_batch(&sensors, now);
            assert_eq!(batch.readings.len(), sensors.len());
            for r in &batch.readings {
                assert!(NITRATE_RANGE.contains(&r.nitrate_mg_l), "nitrate {}", r.nitrate_mg_l);
                assert!(MOISTURE_RANGE.contains(&r.moisture_pct), "moisture {}", r.moisture_pct);
                assert!(
                    TEMPERATURE_RANGE.contains(&r.temperature_c),
                    "temperature {}",
                    r.temperature_c
                );
            }
            assert!(KPI_NITRATE.contains(&batch.kpis.avg_nitrate));
            assert!(KPI_MOISTURE.contains(&batch.kpis.avg_moisture));
            assert!(KPI_TEMPERATURE.contains(&batch.kpis.avg_temp));
        }
        assert_eq!(generator.tick(), 2_000);
    }

    #[test]
    fn test_clamp_ranges() {
        // ---
        assert_eq!(NITRATE_RANGE, 0.0..=15.0);
        assert_eq!(MOISTURE_RANGE, 10.0..=80.0);
        assert_eq!(TEMPERATURE_RANGE, 15.0..=35.0);
    }

    #[test]
    fn test_readings_reference_given_sensors() {
        // ---
        let sensors = test_sensors(3);
        let mut generator = Generator::new(seeded_settings(), Vec::new());
        let batch = generator.next_batch(&sensors, Utc::now());
        let ids: Vec<&str> = batch.readings.iter().map(|r| r.sensor_id.as_str()).collect();
        assert_eq!(ids, vec!["sensor1", "sensor2", "sensor3"]);
    }

    #[test]
    fn test_event_probabilities() {
        // ---
        let always = SimSettings {
            alert_probability: 1.0,
            recommendation_probability: 1.0,
            seed: Some(1),
        };
        let field_ids = vec!["field1".to_string(), "field2".to_string()];
        let mut generator = Generator::new(always, field_ids.clone());
        for _ in 0..50 {
            let batch = generator.next_batch(&test_sensors(1), Utc::now());
            let alert = batch.alert.expect("alert expected");
            let rec = batch.recommendation.expect("recommendation expected");
            assert!(field_ids.contains(&alert.field_id));
            assert!(field_ids.contains(&rec.field_id));
            assert_eq!(rec.units, rec.action.units());
        }

        let never = SimSettings {
            alert_probability: 0.0,
            recommendation_probability: 0.0,
            seed: Some(1),
        };
        let mut generator = Generator::new(never, field_ids);
        for _ in 0..50 {
            let batch = generator.next_batch(&test_sensors(1), Utc::now());
            assert!(batch.alert.is_none());
            assert!(batch.recommendation.is_none());
        }
    }

    #[test]
    fn test_empty_field_space_yields_no_events() {
        // ---
        let always = SimSettings {
            alert_probability: 1.0,
            recommendation_probability: 1.0,
            seed: Some(3),
        };
        let mut generator = Generator::new(always, Vec::new());
        let batch = generator.next_batch(&test_sensors(1), Utc::now());
        assert!(batch.alert.is_none());
        assert!(batch.recommendation.is_none());
    }

    #[test]
    fn test_same_seed_same_readings() {
        // ---
        let sensors = test_sensors(2);
        let now = Utc::now();
        let mut a = Generator::new(seeded_settings(), Vec::new());
        let mut b = Generator::new(seeded_settings(), Vec::new());
        for _ in 0..10 {
            assert_eq!(
                a.next_batch(&sensors, now).readings,
                b.next_batch(&sensors, now).readings
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_tick_then_stop() {
        // ---
        let store = Store::seeded().into_shared();
        let seeded_count = store.read().await.reading_count();
        let sensor_count = store.read().await.sensors().count();

        let mut sim = Simulator::new(store.clone(), seeded_settings()).await;
        sim.start(Duration::from_millis(1000)).await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        sim.stop().await;
        assert!(!sim.is_running());
        assert_eq!(sim.ticks(), 1);
        assert_eq!(
            store.read().await.reading_count(),
            seeded_count + sensor_count
        );

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(sim.ticks(), 1);
        assert_eq!(
            store.read().await.reading_count(),
            seeded_count + sensor_count
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_batch_before_first_interval() {
        // ---
        let store = Store::seeded().into_shared();
        let mut sim = Simulator::new(store.clone(), seeded_settings()).await;
        sim.start(Duration::from_millis(1000)).await;

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(sim.ticks(), 0);
        sim.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        // ---
        let store = Store::seeded().into_shared();
        let mut sim = Simulator::new(store.clone(), seeded_settings()).await;

        sim.start(Duration::from_millis(1000)).await;
        sim.start(Duration::from_millis(1000)).await;
        assert!(sim.is_running());

        // A second live loop would double the tick count
        tokio::time::sleep(Duration::from_millis(3500)).await;
        sim.stop().await;
        assert_eq!(sim.ticks(), 3);

        let latest = store
            .read()
            .await
            .readings(&ReadingsFilter::by_sensor("sensor1"));
        assert_eq!(latest.len(), 2 + 3);
    }

    #[test]
    fn test_out_of_range_probabilities_clamped() {
        // ---
        let wild = SimSettings {
            alert_probability: 1.5,
            recommendation_probability: f64::NAN,
            seed: Some(5),
        };
        let mut generator = Generator::new(wild, vec!["field1".to_string()]);
        for _ in 0..20 {
            let batch = generator.next_batch(&test_sensors(1), Utc::now());
            assert!(batch.alert.is_some());
            assert!(batch.recommendation.is_none());
        }
    }

    #[test]
    fn test_orphaned_field_ids_still_recorded() {
        // ---
        let mut store = Store::seeded();
        store.remove_field("field2").unwrap();
        let alerts_before = store.alerts().len();
        let recs_before = store.recommendations_for("field2").len();

        let always = SimSettings {
            alert_probability: 1.0,
            recommendation_probability: 1.0,
            seed: Some(9),
        };
        let mut generator = Generator::new(always, vec!["field2".to_string()]);
        let batch = generator.next_batch(store.sensors(), Utc::now());

        assert_eq!(record_batch(&mut store, batch), 2);
        assert_eq!(store.alerts().len(), alerts_before + 1);
        assert_eq!(store.alerts().last().unwrap().field_id, "field2");
        assert_eq!(store.recommendations_for("field2").len(), recs_before + 1);
        assert!(!store.contains_field("field2"));
    }

    #[test]
    fn test_known_field_ids_not_counted_as_orphans() {
        // ---
        let mut store = Store::seeded();
        let always = SimSettings {
            alert_probability: 1.0,
            recommendation_probability: 1.0,
            seed: Some(9),
        };
        let mut generator = Generator::new(always, store.field_ids());
        let batch = generator.next_batch(store.sensors(), Utc::now());
        assert_eq!(record_batch(&mut store, batch), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_does_not_disable_simulator() {
        // ---
        let store = Store::seeded().into_shared();
        let mut sim = Simulator::new(store.clone(), seeded_settings()).await;

        sim.start(Duration::ZERO).await;
        assert!(sim.is_running());
        sim.stop().await;
        let after_zero = sim.ticks();

        sim.start(Duration::from_millis(1000)).await;
        assert!(sim.is_running());
        tokio::time::sleep(Duration::from_millis(3500)).await;
        sim.stop().await;
        assert_eq!(sim.ticks(), after_zero + 3);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        // ---
        let store = Store::seeded().into_shared();
        let mut sim = Simulator::new(store, SimSettings::default()).await;
        sim.stop().await;
        sim.stop().await;
        assert!(!sim.is_running());
        assert_eq!(sim.ticks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_instances() {
        // ---
        let store = Store::seeded().into_shared();
        let mut fast = Simulator::new(store.clone(), seeded_settings()).await;
        let mut slow = Simulator::new(store.clone(), seeded_settings()).await;

        fast.start(Duration::from_millis(500)).await;
        slow.start(Duration::from_millis(2000)).await;
        tokio::time::sleep(Duration::from_millis(2100)).await;
        fast.stop().await;

        tokio::time::sleep(Duration::from_millis(2000)).await;
        slow.stop().await;

        assert_eq!(fast.ticks(), 4);
        assert_eq!(slow.ticks(), 2);
    }
}
