//! Layer gain computation

/// Pan law: pan in [-1, 1] and volume in [0, 1] -> (left_gain, right_gain)
///
/// `left = v * ((1 - p) / 2 + 0.5)`, `right = v * ((1 + p) / 2 + 0.5)`.
/// Centre gives `(v, v)`; hard right gives `(v/2, 3v/2)`.
/// NaN/Inf inputs are sanitized (volume to 0, pan to centre).
/// Gains above 1 are passed through as-is; capping is up to the device.
pub fn pan_gains(volume: f32, pan: f32) -> (f32, f32) {
    let v = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
    let p = if pan.is_finite() { pan.clamp(-1.0, 1.0) } else { 0.0 };
    let left = v * ((1.0 - p) / 2.0 + 0.5);
    let right = v * ((1.0 + p) / 2.0 + 0.5);
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_is_equal() {
        let (l, r) = pan_gains(0.8, 0.0);
        assert_relative_eq!(l, r);
        assert_relative_eq!(l, 0.8);
    }

    #[test]
    fn test_hard_pans() {
        let (l, r) = pan_gains(0.5, 1.0);
        assert!(r > l);
        assert_relative_eq!(l, 0.25);
        assert_relative_eq!(r, 0.75);

        let (l, r) = pan_gains(0.5, -1.0);
        assert!(l > r);
        assert_relative_eq!(l, 0.75);
        assert_relative_eq!(r, 0.25);
    }

    #[test]
    fn test_symmetry() {
        for pan in [0.1f32, 0.35, 0.7, 1.0] {
            let (l, r) = pan_gains(0.6, pan);
            let (ml, mr) = pan_gains(0.6, -pan);
            assert_relative_eq!(l, mr);
            assert_relative_eq!(r, ml);
        }
    }

    #[test]
    fn test_out_of_range_inputs_clamped() {
        assert_eq!(pan_gains(2.0, 5.0), pan_gains(1.0, 1.0));
        assert_eq!(pan_gains(f32::NAN, 0.0), (0.0, 0.0));
        assert_eq!(pan_gains(1.0, f32::INFINITY), (1.0, 1.0));
    }

    #[test]
    fn test_hard_right_exceeds_unity() {
        let (l, r) = pan_gains(1.0, 1.0);
        assert_relative_eq!(l, 0.5);
        assert_relative_eq!(r, 1.5);
    }
}
