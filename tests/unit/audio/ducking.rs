use super::*;

#[test]
fn exact_offset_inside_and_none_outside() {
    let env = DuckingEnvelope::new(&[(2.0, 5.0)], -6.0, 0.03);
    assert_eq!(env.offset_db_at(2.0), -6.0);
    assert_eq!(env.offset_db_at(3.5), -6.0);
    assert_eq!(env.offset_db_at(4.999), -6.0);
    assert_eq!(env.offset_db_at(0.0), 0.0);
    assert_eq!(env.offset_db_at(6.0), 0.0);
}

#[test]
fn ramps_are_monotonic_outside_the_interval() {
    let env = DuckingEnvelope::new(&[(2.0, 5.0)], -6.0, 0.1);
    let before = [1.9, 1.925, 1.95, 1.975, 1.999];
    let mut last = 0.0f32;
    for t in before {
        let v = env.offset_db_at(t);
        assert!(v <= last, "ramp in must deepen: {t} -> {v}");
        assert!(v > -6.0);
        last = v;
    }
    let mid = env.offset_db_at(5.05);
    assert!(mid < 0.0 && mid > -6.0);
}

#[test]
fn close_intervals_merge() {
    let env = DuckingEnvelope::new(&[(3.0, 4.0), (1.0, 2.0), (2.05, 2.5)], -6.0, 0.03);
    assert_eq!(env.intervals(), &[(1.0, 2.5), (3.0, 4.0)]);
    assert_eq!(env.offset_db_at(2.02), -6.0);
}

#[test]
fn zero_fade_is_a_hard_step() {
    let env = DuckingEnvelope::new(&[(1.0, 2.0)], -9.0, 0.0);
    assert_eq!(env.offset_db_at(0.9999), 0.0);
    assert_eq!(env.offset_db_at(1.0), -9.0);
    assert_eq!(env.offset_db_at(2.0), 0.0);
}

#[test]
fn degenerate_intervals_are_dropped() {
    let env = DuckingEnvelope::new(&[(1.0, 1.0), (f64::NAN, 2.0), (3.0, 2.0)], -6.0, 0.03);
    assert!(env.intervals().is_empty());
    assert_eq!(env.offset_db_at(1.0), 0.0);
}
