use evo_domain::constants::MAX_DOMAIN_VALUE;
use evo_progression::{GrowthDomain, ProgressionProfile};
use proptest::prelude::*;

fn profile(values: &[(f64, f64)]) -> ProgressionProfile {
    let domains = values
        .iter()
        .enumerate()
        .map(|(i, (value, rate))| GrowthDomain::new(format!("d{i}"), *value, *rate).unwrap());
    ProgressionProfile::with_domains(domains, 0).unwrap()
}

fn values(profile: &ProgressionProfile) -> Vec<f64> {
    profile.domains().map(GrowthDomain::value).collect()
}

/// Relative 1e-9, with an absolute floor for quantities near zero.
fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #[test]
    fn tick_is_monotone(
        domains in prop::collection::vec((0.0..1.0e12f64, 0.0..0.01f64), 1..5),
        deltas in prop::collection::vec(-100.0..100_000.0f64, 1..8),
    ) {
        let mut p = profile(&domains);
        for delta in deltas {
            let before = p.clone();
            p.tick(delta).unwrap();

            for (b, a) in values(&before).into_iter().zip(values(&p)) {
                prop_assert!(a >= b);
                prop_assert!(a <= MAX_DOMAIN_VALUE.max(b));
            }
            prop_assert!(p.experience() >= before.experience());
            prop_assert!(p.level() >= before.level());
            for (b, a) in before.domains().zip(p.domains()) {
                prop_assert!(a.rate_per_second() >= b.rate_per_second());
            }
        }
    }

    /// Splitting an interval gives the same result as a single tick, as long as the
    /// level (and so every rate) does not change in between.
    #[test]
    fn split_ticks_match_single_tick(
        domains in prop::collection::vec((0.0..1_000.0f64, 0.0..1.0e-3f64), 1..4),
        total in 0.0..2_000.0f64,
        fraction in 0.0..1.0f64,
    ) {
        let t1 = total * fraction;
        let t2 = total - t1;

        let mut whole = profile(&domains);
        let once = whole.tick(total).unwrap();
        prop_assume!(once.level.is_none());

        let mut split = profile(&domains);
        let first = split.tick(t1).unwrap();
        let second = split.tick(t2).unwrap();

        for (a, b) in values(&whole).into_iter().zip(values(&split)) {
            prop_assert!(close(a, b), "{a} vs {b}");
        }
        prop_assert!(close(whole.experience(), split.experience()));
        prop_assert!(close(once.experience_gained, first.experience_gained + second.experience_gained));
        prop_assert!(close(whole.total_active_seconds(), split.total_active_seconds()));
    }

    #[test]
    fn saturation_commutes_with_split(total in 4_000.0..20_000.0f64, fraction in 0.0..1.0f64) {
        let mut whole = profile(&[(100.0, 0.01)]);
        whole.tick(total).unwrap();

        let mut split = profile(&[(100.0, 0.01)]);
        split.tick(total * fraction).unwrap();
        split.tick(total - total * fraction).unwrap();

        prop_assert_eq!(values(&whole), vec![MAX_DOMAIN_VALUE]);
        prop_assert_eq!(values(&split), vec![MAX_DOMAIN_VALUE]);
    }
}

#[test]
fn hour_at_one_percent_saturates_power() {
    let mut p = profile(&[(100.0, 0.01)]);
    let outcome = p.tick(3600.0).unwrap();

    // 100 * 1.01^3600 is about 3.6e17, far past the ceiling.
    assert_eq!(p.domain("d0").unwrap().value(), MAX_DOMAIN_VALUE);
    assert!(outcome.saturated.contains("d0"));
    assert!(outcome.level.is_some());
}

#[test]
fn snapshot_round_trip_is_exact() {
    let mut p = ProgressionProfile::new(1_700_000_000_123);
    p.tick(0.1).unwrap();
    p.tick(17.3).unwrap();
    p.mark_seen(1_700_000_017_523);

    let snapshot = p.to_snapshot();
    let restored = ProgressionProfile::from_snapshot(snapshot.clone()).unwrap();

    assert_eq!(restored.to_snapshot(), snapshot);
    for (a, b) in p.domains().zip(restored.domains()) {
        assert_eq!(a.value().to_bits(), b.value().to_bits());
    }
    assert_eq!(p.experience().to_bits(), restored.experience().to_bits());
    assert_eq!(restored.last_seen(), 1_700_000_017_523);
}
