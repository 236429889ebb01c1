//! Evaluation limits for interactive use.

/// Limits that keep one evaluation cheap on very large results.
///
/// Estimates refresh many times per second during progressive sampling, so
/// a validity computation has to stay well under a frame. Both caps trade
/// a little accuracy on huge group counts for bounded work; on results of
/// ordinary visualization size they never engage.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of points fed into a distribution fit.
    ///
    /// Larger results are thinned (evenly for histogram and planar fits,
    /// by top ranks for power-law fits) before fitting and scoring.
    /// Default: 2,000.
    pub max_fit_points: usize,

    /// Maximum number of contested competitors in the exact rank
    /// convolution.
    ///
    /// Competitors beyond the cap are rounded to their likelier side of
    /// the subject. Default: 1,024.
    pub max_rank_competitors: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_fit_points: 2_000,
            max_rank_competitors: 1_024,
        }
    }
}

impl Config {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fit input cap.
    pub fn max_fit_points(mut self, points: usize) -> Self {
        assert!(points >= 2, "a fit needs at least two points");
        self.max_fit_points = points;
        self
    }

    /// Set the rank convolution cap.
    pub fn max_rank_competitors(mut self, competitors: usize) -> Self {
        assert!(competitors >= 1, "the convolution needs at least one competitor");
        self.max_rank_competitors = competitors;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_fit_points < 2 {
            return Err("max_fit_points must be at least 2".to_string());
        }
        if self.max_rank_competitors == 0 {
            return Err("max_rank_competitors must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.max_fit_points, 2_000);
        assert_eq!(config.max_rank_competitors, 1_024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders_set_fields() {
        let config = Config::new().max_fit_points(100).max_rank_competitors(16);
        assert_eq!(config.max_fit_points, 100);
        assert_eq!(config.max_rank_competitors, 16);
    }

    #[test]
    fn validation_rejects_degenerate_limits() {
        let mut config = Config::default();
        config.max_fit_points = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_rank_competitors = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[should_panic(expected = "at least two points")]
    fn fit_cap_below_two_panics() {
        Config::new().max_fit_points(1);
    }
}
