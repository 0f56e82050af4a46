// CPU rendition of the per-pixel math in src/shaders. Operation order follows
// the WGSL so results can be compared against GPU readbacks.
use crate::field_params::FieldParams;

// One-at-a-time style integer mix (hash.inc: hash1).
pub fn hash1(mut x: u32) -> u32 {
    x = x.wrapping_add(x << 10);
    x ^= x >> 6;
    x = x.wrapping_add(x << 3);
    x ^= x >> 11;
    x = x.wrapping_add(x << 15);
    x
}

pub fn hash2(pixel: [u32; 2], seed: u32) -> u32 {
    hash1(pixel[0] ^ hash1(pixel[1]) ^ seed)
}

// Maps the low 23 bits onto a float in [0, 1).
pub fn float_construct(m: u32) -> f32 {
    const IEEE_MANTISSA: u32 = 0x007F_FFFF;
    const IEEE_ONE: u32 = 0x3F80_0000;
    f32::from_bits((m & IEEE_MANTISSA) | IEEE_ONE) - 1.0
}

pub fn random(pixel: [u32; 2], seed: f32) -> f32 {
    float_construct(hash2(pixel, (seed * 1000.0) as u32))
}

pub fn random2(pixel: [u32; 2], seed: f32) -> [f32; 2] {
    [random(pixel, seed), random(pixel, seed + 1.0)]
}

// Seed offsets separating the channels of one init call.
pub const VELOCITY_SEED_OFFSET: f32 = 123.456;
pub const WEIGHT_SEED_OFFSET: f32 = 789.123;
pub const INITIAL_SPEED_RANGE: f32 = 0.4;

pub fn initial_position(pixel: [u32; 2], seed: f32) -> [f32; 2] {
    random2(pixel, seed)
}

pub fn initial_velocity(pixel: [u32; 2], seed: f32) -> [f32; 2] {
    let r = random2(pixel, seed + VELOCITY_SEED_OFFSET);
    [
        (r[0] - 0.5) * INITIAL_SPEED_RANGE,
        (r[1] - 0.5) * INITIAL_SPEED_RANGE,
    ]
}

pub fn initial_weight(pixel: [u32; 2], seed: f32, min_weight: f32, max_weight: f32) -> f32 {
    mix(min_weight, max_weight, random(pixel, seed + WEIGHT_SEED_OFFSET))
}

pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

pub fn smoothstep(low: f32, high: f32, x: f32) -> f32 {
    let t = ((x - low) / (high - low)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

// fract() that never rounds up to 1.0.
pub fn wrap_unit(x: f32) -> f32 {
    let f = x - x.floor();
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}

fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

// Sum of the scaled, offset field samples with non-finite components zeroed.
// A missing second field contributes nothing.
pub fn combine_fields(field1: [f32; 2], field2: Option<[f32; 2]>, params: &FieldParams) -> [f32; 2] {
    let mut field = [0.0; 2];
    for i in 0..2 {
        let mut value = field1[i] * params.field1_multiplier + params.field1_value_offset;
        if let Some(field2) = field2 {
            value += field2[i] * params.field2_multiplier + params.field2_value_offset;
        }
        field[i] = finite_or_zero(value);
    }
    field
}

pub fn jitter_raw(pixel: [u32; 2], frame_seed: f32, jitter_strength: f32) -> [f32; 2] {
    let r = random2(pixel, frame_seed);
    [
        (r[0] - 0.5) * 2.0 * jitter_strength,
        (r[1] - 0.5) * 2.0 * jitter_strength,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleState {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub jitter: [f32; 2],
    pub weight: f32,
}

impl ParticleState {
    pub fn new(position: [f32; 2], velocity: [f32; 2]) -> Self {
        ParticleState {
            position,
            velocity,
            jitter: [0.0; 2],
            weight: 1.0,
        }
    }
}

// One integration step for a single particle given its combined field value.
pub fn integrate(
    state: &ParticleState,
    field: [f32; 2],
    jitter_raw: [f32; 2],
    params: &FieldParams,
) -> ParticleState {
    let mut next = *state;
    for i in 0..2 {
        let jitter = mix(state.jitter[i], jitter_raw[i], params.jitter_smoothing);
        let force = field[i] * params.force_multiplier * state.weight;
        let velocity = (state.velocity[i] + force + jitter) * params.velocity_damping;
        next.jitter[i] = jitter;
        next.velocity[i] = velocity;
        next.position[i] = wrap_unit(state.position[i] + velocity * params.max_velocity);
    }
    next
}

// Alpha of a point-sprite fragment at `local` in [-1, 1]^2, or None when the
// fragment lies outside the unit circle.
pub fn point_alpha(local: [f32; 2], speed: f32, speed_threshold: f32, tint_alpha: f32) -> Option<f32> {
    let r2 = local[0] * local[0] + local[1] * local[1];
    if r2 > 1.0 {
        return None;
    }
    let speed_alpha = if speed_threshold > 0.0 {
        smoothstep(0.0, speed_threshold, speed)
    } else {
        1.0
    };
    Some((1.0 - r2) * speed_alpha * tint_alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still_params() -> FieldParams {
        FieldParams {
            force_multiplier: 1.0,
            velocity_damping: 1.0,
            jitter_strength: 0.0,
            max_velocity: 0.1,
            ..FieldParams::default()
        }
    }

    fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
    }

    #[test]
    fn random_is_in_unit_range() {
        for x in 0..64 {
            for y in 0..64 {
                let r = random([x, y], 12345.678);
                assert!((0.0..1.0).contains(&r));
            }
        }
        assert_eq!(float_construct(0), 0.0);
        assert!(float_construct(u32::MAX) < 1.0);
    }

    #[test]
    fn initialization_is_reproducible() {
        let a: Vec<_> = (0..32)
            .flat_map(|x| (0..32).map(move |y| initial_position([x, y], 54321.0)))
            .collect();
        let b: Vec<_> = (0..32)
            .flat_map(|x| (0..32).map(move |y| initial_position([x, y], 54321.0)))
            .collect();
        let a_bits: Vec<_> = a.iter().map(|p| [p[0].to_bits(), p[1].to_bits()]).collect();
        let b_bits: Vec<_> = b.iter().map(|p| [p[0].to_bits(), p[1].to_bits()]).collect();
        assert_eq!(a_bits, b_bits);
    }

    #[test]
    fn adjacent_cells_are_decorrelated() {
        let epsilon = 0.01;
        let mut close = 0;
        let mut total = 0;
        for x in 0..63 {
            for y in 0..64 {
                let here = initial_position([x, y], 42424.0);
                let right = initial_position([x + 1, y], 42424.0);
                total += 1;
                if distance(here, right) < epsilon {
                    close += 1;
                }
            }
        }
        assert!(close * 20 < total, "{} of {} neighbours too close", close, total);
    }

    #[test]
    fn different_seeds_are_decorrelated() {
        let epsilon = 0.01;
        let mut close = 0;
        let mut total = 0;
        for x in 0..64 {
            for y in 0..64 {
                total += 1;
                if distance(initial_position([x, y], 11111.0), initial_position([x, y], 22222.0))
                    < epsilon
                {
                    close += 1;
                }
            }
        }
        assert!(close * 20 < total, "{} of {} cells too close", close, total);
    }

    #[test]
    fn initial_ranges() {
        for x in 0..40 {
            for y in 0..40 {
                let v = initial_velocity([x, y], 31337.0);
                assert!(v[0] >= -0.2 && v[0] < 0.2);
                assert!(v[1] >= -0.2 && v[1] < 0.2);
                let w = initial_weight([x, y], 31337.0, 0.5, 2.0);
                assert!((0.5..=2.0).contains(&w));
            }
        }
    }

    #[test]
    fn position_wraps_instead_of_clamping() {
        let params = FieldParams {
            force_multiplier: 1.0,
            velocity_damping: 1.0,
            max_velocity: 0.1,
            ..FieldParams::default()
        };
        let state = ParticleState::new([0.99, 0.5], [0.0, 0.0]);
        let next = integrate(&state, [0.5, 0.0], [0.0, 0.0], &params);
        assert!((next.position[0] - 0.04).abs() < 1e-5, "{:?}", next.position);

        let state = ParticleState::new([0.01, 0.5], [0.0, 0.0]);
        let next = integrate(&state, [-0.5, 0.0], [0.0, 0.0], &params);
        assert!((next.position[0] - 0.96).abs() < 1e-5, "{:?}", next.position);
    }

    #[test]
    fn wrap_stays_below_one() {
        assert_eq!(wrap_unit(-1e-9), 0.0);
        assert_eq!(wrap_unit(1.0), 0.0);
        assert_eq!(wrap_unit(2.25), 0.25);
        for i in 0..10_000 {
            let x = (i as f32 - 5000.0) * 0.000_731;
            let w = wrap_unit(x);
            assert!((0.0..1.0).contains(&w), "{} -> {}", x, w);
        }
    }

    #[test]
    fn constant_field_scenario() {
        let params = still_params();
        for x in 0..4 {
            for y in 0..4 {
                let seed = 777.0;
                let state = ParticleState::new(
                    initial_position([x, y], seed),
                    initial_velocity([x, y], seed),
                );
                let field = combine_fields([1.0, 0.0], None, &params);
                let jitter = jitter_raw([x, y], 1.5, params.jitter_strength);
                let next = integrate(&state, field, jitter, &params);
                assert_eq!(next.velocity[0], state.velocity[0] + 1.0);
                let expected = wrap_unit(state.position[0] + (state.velocity[0] + 1.0) * 0.1);
                assert_eq!(next.position[0], expected);
            }
        }
    }

    #[test]
    fn nan_field_never_reaches_state() {
        let params = FieldParams::default();
        let mut state = ParticleState::new([0.3, 0.7], [0.01, -0.02]);
        let fields = [
            [f32::NAN, 0.5],
            [0.2, f32::INFINITY],
            [f32::NEG_INFINITY, f32::NAN],
            [0.1, 0.1],
        ];
        for (frame, field) in fields.iter().cycle().take(40).enumerate() {
            let field = combine_fields(*field, Some([f32::NAN, 0.0]), &params);
            let jitter = jitter_raw([3, 4], frame as f32, 0.1);
            state = integrate(&state, field, jitter, &params);
            assert!(state.velocity.iter().all(|v| v.is_finite()));
            assert!(state.position.iter().all(|p| (0.0..1.0).contains(p)));
        }
    }

    #[test]
    fn nan_sanitization_is_per_component() {
        let params = FieldParams::default();
        let field = combine_fields([f32::NAN, 0.25], None, &params);
        assert_eq!(field, [0.0, 0.25]);
    }

    #[test]
    fn missing_second_field_contributes_nothing() {
        let params = FieldParams {
            field2_value_offset: -0.5,
            ..FieldParams::default()
        };
        assert_eq!(combine_fields([0.3, 0.4], None, &params), [0.3, 0.4]);
        assert_eq!(combine_fields([0.3, 0.5], Some([0.5, 1.0]), &params), [0.3, 1.0]);
    }

    #[test]
    fn override_applies_only_while_set() {
        let configured = FieldParams::default();
        let state = ParticleState::new([0.5, 0.5], [0.0, 0.0]);
        let field = [0.4, -0.2];
        let baseline = integrate(&state, field, [0.0; 2], &configured);

        let overrides = crate::field_params::ParamOverrides {
            force_multiplier: Some(configured.force_multiplier * 4.0),
            ..Default::default()
        };
        let overridden = integrate(&state, field, [0.0; 2], &configured.with_overrides(&overrides));
        assert_ne!(overridden.velocity, baseline.velocity);

        let cleared = integrate(
            &state,
            field,
            [0.0; 2],
            &configured.with_overrides(&Default::default()),
        );
        assert_eq!(cleared, baseline);
    }

    #[test]
    fn jitter_is_smoothed_over_frames() {
        let params = FieldParams {
            jitter_strength: 1.0,
            jitter_smoothing: 0.25,
            velocity_damping: 1.0,
            ..FieldParams::default()
        };
        let state = ParticleState::new([0.5, 0.5], [0.0, 0.0]);
        let raw = [0.8, -0.4];
        let next = integrate(&state, [0.0; 2], raw, &params);
        assert!((next.jitter[0] - 0.2).abs() < 1e-6);
        assert!((next.jitter[1] + 0.1).abs() < 1e-6);
        assert_eq!(jitter_raw([1, 2], 3.0, 0.0), [0.0, 0.0]);
    }

    #[test]
    fn weight_scales_force() {
        let params = still_params();
        let mut heavy = ParticleState::new([0.5, 0.5], [0.0, 0.0]);
        heavy.weight = 2.0;
        let next = integrate(&heavy, [0.25, 0.0], [0.0; 2], &params);
        assert_eq!(next.velocity[0], 0.5);
    }

    #[test]
    fn point_alpha_falloff() {
        assert_eq!(point_alpha([0.0, 0.0], 0.0, 0.0, 1.0), Some(1.0));
        assert_eq!(point_alpha([1.0, 1.0], 0.0, 0.0, 1.0), None);
        let edge = point_alpha([0.6, 0.0], 0.0, 0.0, 0.5).unwrap();
        assert!((edge - 0.32).abs() < 1e-6);
        // Slow particles vanish, fast ones are opaque.
        assert_eq!(point_alpha([0.0, 0.0], 0.0, 0.1, 1.0), Some(0.0));
        assert_eq!(point_alpha([0.0, 0.0], 0.5, 0.1, 1.0), Some(1.0));
    }
}
