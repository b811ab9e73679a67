//! ADSR and exponential-decay envelopes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SonanceError};

/// Attack/decay/release times in seconds and a sustain level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    /// Level held between decay and release.
    pub sustain: f64,
    pub release: f64,
}

impl Default for Adsr {
    fn default() -> Self {
        Adsr {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

impl Adsr {
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Adsr {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Amplitude after `elapsed` frames of a note lasting `duration`
    /// seconds, at `control_rate` frames per second.
    ///
    /// Regions are checked in order: attack, decay, sustain, release. The
    /// sustain region is empty when attack, decay and release fill the whole
    /// duration. From `duration` on the amplitude is 0.
    pub fn value(&self, max_amp: f64, duration: f64, control_rate: f64, elapsed: u64) -> f64 {
        let dur = duration * control_rate;
        let at = self.attack * control_rate;
        let dt = self.decay * control_rate;
        let rt = self.release * control_rate;
        let sus = self.sustain;
        let cnt = elapsed as f64;

        if cnt >= dur {
            0.0
        } else if cnt <= at {
            if at == 0.0 { max_amp } else { cnt * (max_amp / at) }
        } else if cnt <= at + dt {
            if dt == 0.0 {
                sus
            } else {
                ((sus - max_amp) / dt) * (cnt - at) + max_amp
            }
        } else if cnt <= dur - rt {
            sus
        } else if rt == 0.0 {
            0.0
        } else {
            -(sus / rt) * (cnt - (dur - rt)) + sus
        }
    }
}

/// Stateless ADSR in one call.
#[allow(clippy::too_many_arguments)]
pub fn adsr(
    max_amp: f64,
    duration: f64,
    attack: f64,
    decay: f64,
    sustain: f64,
    release: f64,
    control_rate: f64,
    elapsed: u64,
) -> f64 {
    Adsr::new(attack, decay, sustain, release).value(max_amp, duration, control_rate, elapsed)
}

/// An [`Adsr`] bound to one note, advanced one frame per call.
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    pub shape: Adsr,
    pub max_amp: f64,
    pub duration: f64,
    control_rate: f64,
    elapsed: u64,
}

impl AdsrEnvelope {
    pub fn new(shape: Adsr, max_amp: f64, duration: f64, control_rate: f64) -> Result<Self> {
        if control_rate <= 0.0 {
            return Err(SonanceError::invalid("control rate must be greater than 0"));
        }
        Ok(AdsrEnvelope {
            shape,
            max_amp,
            duration,
            control_rate,
            elapsed: 0,
        })
    }

    /// Amplitude for the current frame, then advance.
    pub fn next_sample(&mut self) -> f64 {
        let value = self
            .shape
            .value(self.max_amp, self.duration, self.control_rate, self.elapsed);
        self.elapsed += 1;
        value
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// True once the note's duration has passed.
    pub fn is_finished(&self) -> bool {
        self.elapsed as f64 >= self.duration * self.control_rate
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
    }
}

/// Exponential decay from `start` to `end` over a fixed number of samples.
#[derive(Debug, Clone)]
pub struct ExpDecay {
    level: f64,
    factor: f64,
}

impl ExpDecay {
    pub fn new(start: f64, end: f64, samples: usize) -> Result<Self> {
        if start <= 0.0 || end <= 0.0 {
            return Err(SonanceError::invalid(format!(
                "decay levels must be positive (start {start}, end {end})"
            )));
        }
        if samples == 0 {
            return Err(SonanceError::invalid("decay length must be at least one sample"));
        }
        Ok(ExpDecay {
            level: start,
            factor: (end / start).powf(1.0 / samples as f64),
        })
    }

    /// Current level, then multiply by the per-sample factor.
    pub fn next_sample(&mut self) -> f64 {
        let level = self.level;
        self.level *= self.factor;
        level
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Adsr {
        Adsr::new(1.0, 1.0, 0.7, 5.0)
    }

    #[test]
    fn regions_at_control_rate_one() {
        let env = reference();
        let at = |e| env.value(1.0, 10.0, 1.0, e);
        assert_eq!(at(0), 0.0);
        assert_eq!(at(1), 1.0);
        assert!((at(2) - 0.7).abs() < 1e-12);
        for e in 3..=5 {
            assert_eq!(at(e), 0.7, "sustain at {e}");
        }
        assert!((at(6) - 0.56).abs() < 1e-12);
        assert!(at(9) > 0.0);
        assert_eq!(at(10), 0.0);
        assert_eq!(at(1_000), 0.0);
    }

    #[test]
    fn free_function_matches_struct() {
        for e in 0..12 {
            assert_eq!(
                adsr(1.0, 10.0, 1.0, 1.0, 0.7, 5.0, 1.0, e),
                reference().value(1.0, 10.0, 1.0, e)
            );
        }
    }

    #[test]
    fn zero_length_stages_stay_finite() {
        let env = Adsr::new(0.0, 0.0, 0.5, 0.0);
        for e in 0..20 {
            let v = env.value(1.0, 10.0, 1.0, e);
            assert!(v.is_finite(), "NaN/Inf at {e}");
        }
        assert_eq!(env.value(1.0, 10.0, 1.0, 0), 1.0);
        assert_eq!(env.value(1.0, 10.0, 1.0, 5), 0.5);
    }

    #[test]
    fn zero_max_amplitude_is_silent_until_sustain() {
        let env = reference();
        assert_eq!(env.value(0.0, 10.0, 1.0, 0), 0.0);
        assert_eq!(env.value(0.0, 10.0, 1.0, 1), 0.0);
    }

    #[test]
    fn envelope_range() {
        let mut env = AdsrEnvelope::new(Adsr::new(0.01, 0.05, 0.5, 0.1), 1.0, 1.0, 44100.0).unwrap();
        while !env.is_finished() {
            let s = env.next_sample();
            assert!((0.0..=1.0).contains(&s), "Envelope out of range: {s}");
        }
        assert_eq!(env.elapsed(), 44100);
        assert_eq!(env.next_sample(), 0.0);
    }

    #[test]
    fn envelope_rejects_zero_rate() {
        assert!(AdsrEnvelope::new(Adsr::default(), 1.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn exp_decay_reaches_end() {
        let mut decay = ExpDecay::new(1.0, 1.0e-4, 1000).unwrap();
        assert_eq!(decay.next_sample(), 1.0);
        let mut last = 1.0;
        for _ in 1..1000 {
            let v = decay.next_sample();
            assert!(v < last);
            last = v;
        }
        // 1000 multiplications land on the end level
        assert!((decay.next_sample() - 1.0e-4).abs() < 1e-12);
    }

    #[test]
    fn exp_decay_argument_checks() {
        assert!(ExpDecay::new(0.0, 1.0, 10).is_err());
        assert!(ExpDecay::new(1.0, -1.0, 10).is_err());
        assert!(ExpDecay::new(1.0, 0.5, 0).is_err());
    }
}
