// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sampling decisions for captured events.

/// Source of uniform draws in `[0, 1)` used by the sampling decision.
///
/// Any `Fn() -> f64` closure is a sampler, so tests can pin the draw:
///
/// ```
/// use bugwatch::Client;
///
/// let client = Client::builder().sampler(|| 0.25).sample_rate(0.5).build();
/// # drop(client);
/// ```
pub trait Sampler: Send + Sync {
	/// Returns a value in `[0, 1)`.
	fn draw(&self) -> f64;
}

impl<F> Sampler for F
where
	F: Fn() -> f64 + Send + Sync,
{
	fn draw(&self) -> f64 {
		self()
	}
}

/// Default sampler backed by `fastrand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FastrandSampler;

impl Sampler for FastrandSampler {
	fn draw(&self) -> f64 {
		fastrand::f64()
	}
}

/// Returns true when an event should be kept at `rate`.
///
/// A rate of 1.0 or more always keeps and 0.0 or less always drops without
/// consulting the sampler. Otherwise the event is dropped when the draw is
/// greater than the rate.
pub(crate) fn keep(rate: f64, sampler: &dyn Sampler) -> bool {
	if rate >= 1.0 {
		return true;
	}
	if rate <= 0.0 {
		return false;
	}
	sampler.draw() <= rate
}

/// Clamps a configured rate into `[0, 1]`. NaN falls back to 1.0.
pub(crate) fn clamp_rate(rate: f64) -> f64 {
	if rate.is_nan() {
		1.0
	} else {
		rate.clamp(0.0, 1.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn full_rate_always_keeps() {
		assert!(keep(1.0, &|| 0.999_999));
	}

	#[test]
	fn zero_rate_always_drops() {
		assert!(!keep(0.0, &|| 0.0));
	}

	#[test]
	fn draw_above_rate_drops() {
		assert!(!keep(0.5, &|| 0.75));
		assert!(keep(0.5, &|| 0.25));
		assert!(keep(0.5, &|| 0.5));
	}

	#[test]
	fn clamps_rate() {
		assert_eq!(clamp_rate(2.0), 1.0);
		assert_eq!(clamp_rate(-1.0), 0.0);
		assert_eq!(clamp_rate(0.3), 0.3);
		assert_eq!(clamp_rate(f64::NAN), 1.0);
	}

	#[test]
	fn fastrand_sampler_stays_in_unit_interval() {
		let sampler = FastrandSampler;
		for _ in 0..1000 {
			let draw = sampler.draw();
			assert!((0.0..1.0).contains(&draw));
		}
	}

	proptest! {
		#[test]
		fn decision_matches_comparison(rate in 0.001f64..0.999, draw in 0.0f64..1.0) {
			prop_assert_eq!(keep(rate, &move || draw), draw <= rate);
		}
	}
}
