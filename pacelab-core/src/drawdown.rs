//! Drawdown episode detection.
//!
//! A single forward scan maintains the running all-time-high. Equity
//! falling more than the noise floor below that peak opens an episode;
//! regaining the pre-episode peak closes it. At most one episode is open
//! at any time, and a close re-arms the peak so sequential episodes never
//! overlap.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::domain::{DisruptionLabel, DrawdownEpisode};
use crate::equity::EquityCurve;

/// Scan result for one driver's curve. Episodes carry the
/// `Unclassified` label until the classifier runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownScan {
    pub episodes: Vec<DrawdownEpisode>,
    /// `min_t(equity[t] - running_peak[t])`, always <= 0.
    pub max_drawdown: f64,
}

pub struct DrawdownDetector<'a> {
    config: &'a AnalysisConfig,
}

struct OpenEpisode {
    peak_lap: u32,
    peak_equity: f64,
    trough_lap: u32,
    trough_equity: f64,
}

impl<'a> DrawdownDetector<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn scan(&self, curve: &EquityCurve) -> DrawdownScan {
        let equity = &curve.equity;
        let mut peak = equity[0];
        let mut peak_lap: u32 = 0;
        let mut max_drawdown = 0.0_f64;
        let mut open: Option<OpenEpisode> = None;
        let mut episodes = Vec::new();

        for (t, &value) in equity.iter().enumerate().skip(1) {
            let t = t as u32;

            match open.take() {
                Some(mut ep) => {
                    if value < ep.trough_equity {
                        ep.trough_equity = value;
                        ep.trough_lap = t;
                    }
                    if value >= ep.peak_equity {
                        episodes.push(DrawdownEpisode {
                            peak_lap: ep.peak_lap,
                            trough_lap: ep.trough_lap,
                            recovery_lap: Some(t),
                            depth: ep.trough_equity - ep.peak_equity,
                            label: DisruptionLabel::Unclassified,
                        });
                        peak = value;
                        peak_lap = t;
                    } else {
                        open = Some(ep);
                    }
                }
                None => {
                    // >= so the peak lap tracks the *last* lap at the
                    // running peak across flat stretches.
                    if value >= peak {
                        peak = value;
                        peak_lap = t;
                    } else if value < peak - self.config.noise_floor_s {
                        open = Some(OpenEpisode {
                            peak_lap,
                            peak_equity: peak,
                            trough_lap: t,
                            trough_equity: value,
                        });
                    }
                }
            }

            let dd = value - peak;
            if dd < max_drawdown {
                max_drawdown = dd;
            }
        }

        if let Some(ep) = open {
            episodes.push(DrawdownEpisode {
                peak_lap: ep.peak_lap,
                trough_lap: ep.trough_lap,
                recovery_lap: None,
                depth: ep.trough_equity - ep.peak_equity,
                label: DisruptionLabel::Unclassified,
            });
        }

        DrawdownScan {
            episodes,
            max_drawdown,
        }
    }
}
