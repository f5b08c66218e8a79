//! Size policy: derive the rewritten font-size from the current one.

use crate::settings::{IncreaseKind, IncreaseMethod, SizeUnit};
use crate::style::FontSize;

/// Compute the rewrite target for an element currently at `current_px`.
///
/// Returns `None` when there is nothing sensible to write: a zero,
/// negative, or non-finite current size, or a non-finite method value
/// (the typed equivalents of "missing" in the persisted form).
///
/// Fixed methods produce exactly `value` in the configured unit, without
/// scaling by the current size. Multiplier methods scale the current
/// pixel size by `value`.
pub fn compute_size(current_px: f32, method: &IncreaseMethod) -> Option<FontSize> {
  if !current_px.is_finite() || current_px <= 0.0 {
    return None;
  }
  if !method.value.is_finite() {
    return None;
  }
  let value = match method.kind {
    IncreaseKind::Fixed => method.value,
    IncreaseKind::Multiplier => current_px * method.value,
  };
  Some(match method.unit {
    SizeUnit::Px => FontSize::Px(value),
    SizeUnit::Em => FontSize::Em(value),
    SizeUnit::Rem => FontSize::Rem(value),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fixed(value: f32, unit: SizeUnit) -> IncreaseMethod {
    IncreaseMethod {
      kind: IncreaseKind::Fixed,
      unit,
      value,
    }
  }

  fn multiplier(value: f32, unit: SizeUnit) -> IncreaseMethod {
    IncreaseMethod {
      kind: IncreaseKind::Multiplier,
      unit,
      value,
    }
  }

  #[test]
  fn fixed_ignores_the_current_size() {
    let size = compute_size(12.0, &fixed(16.0, SizeUnit::Px)).unwrap();
    assert_eq!(size.to_string(), "16px");

    let size = compute_size(12.0, &fixed(2.0, SizeUnit::Em)).unwrap();
    assert_eq!(size.to_string(), "2em");
  }

  #[test]
  fn multiplier_scales_the_current_size() {
    let size = compute_size(8.0, &multiplier(1.5, SizeUnit::Px)).unwrap();
    assert_eq!(size.to_string(), "12px");

    let size = compute_size(10.0, &multiplier(2.0, SizeUnit::Rem)).unwrap();
    assert_eq!(size, FontSize::Rem(20.0));
  }

  #[test]
  fn degenerate_current_sizes_produce_nothing() {
    assert_eq!(compute_size(0.0, &fixed(16.0, SizeUnit::Px)), None);
    assert_eq!(compute_size(-3.0, &fixed(16.0, SizeUnit::Px)), None);
    assert_eq!(compute_size(f32::NAN, &fixed(16.0, SizeUnit::Px)), None);
  }

  #[test]
  fn non_finite_method_values_produce_nothing() {
    assert_eq!(compute_size(12.0, &fixed(f32::NAN, SizeUnit::Px)), None);
    assert_eq!(compute_size(12.0, &multiplier(f32::INFINITY, SizeUnit::Px)), None);
  }
}
