use avicast_core::{GridCell, RangeShift, YearMonth};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Produces the north/south/east/west range shift of a forecasted cell month.
pub trait RangeShiftEstimator: Send {
    fn estimate(&mut self, cell: &GridCell, period: YearMonth) -> RangeShift;
}

/// Placeholder estimator: gaussian noise around a seasonal sinusoid. Nothing here is learned
/// from data.
#[derive(Debug, Clone)]
pub struct SeasonalNoise {
    rng: StdRng,
    std_dev: f64,
    amplitude: f64,
}

impl SeasonalNoise {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            std_dev: 0.5,
            amplitude: 0.3,
        }
    }
}

impl RangeShiftEstimator for SeasonalNoise {
    fn estimate(&mut self, _cell: &GridCell, period: YearMonth) -> RangeShift {
        let seasonal = period.cyclical_encoding().0 * self.amplitude;
        let std_dev = self.std_dev;
        let rng = &mut self.rng;
        let mut draw = || rng.sample::<f64, _>(StandardNormal) * std_dev + seasonal;

        RangeShift {
            north: draw(),
            south: draw(),
            east: draw(),
            west: draw(),
        }
    }
}
