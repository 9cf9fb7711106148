//! Elevation gain/loss accumulation
//!
//! Every change between consecutive fixes counts, there is no deadzone or
//! smoothing. Values come in as meters and are reported in whole feet.

pub const FEET_PER_METER: f64 = 3.28084;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElevationStats {
    pub gain_ft: u32,
    /// Magnitude of the accumulated descent.
    pub loss_ft: u32,
}

/// Raw accumulation in feet. Gain is non-negative, loss is non-positive.
pub fn accumulate_gain_loss_ft(elevations: &[f64]) -> (f64, f64) {
    let mut gain = 0.0;
    let mut loss = 0.0;

    for window in elevations.windows(2) {
        let change = window[1] - window[0];
        if change > 0.0 {
            gain += change * FEET_PER_METER;
        } else if change < 0.0 {
            loss += change * FEET_PER_METER;
        }
    }

    (gain, loss)
}

pub fn analyze_elevation(elevations: &[f64]) -> ElevationStats {
    let (gain, loss) = accumulate_gain_loss_ft(elevations);

    ElevationStats {
        gain_ft: gain.round_ties_even() as u32,
        loss_ft: loss.round_ties_even().abs() as u32,
    }
}
