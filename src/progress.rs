//! Progress reporting for long bootstrap runs.
//!
//! The estimator calls [`Progress::tick`] once per completed iteration and
//! [`Progress::finish`] once at the end. Sinks only observe; nothing they do
//! feeds back into the computation.

/// Observer of bootstrap iterations.
pub trait Progress {
    fn tick(&mut self);

    fn finish(&mut self) {}
}

/// Discards all progress events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn tick(&mut self) {}
}

/// Logs `done/total` at info level every `every` iterations and on finish.
#[derive(Debug, Clone)]
pub struct LogProgress {
    total: usize,
    every: usize,
    done: usize,
}

impl LogProgress {
    pub fn new(total: usize) -> Self {
        Self::with_interval(total, (total / 10).max(1))
    }

    pub fn with_interval(total: usize, every: usize) -> Self {
        Self {
            total,
            every: every.max(1),
            done: 0,
        }
    }

    pub fn done(&self) -> usize {
        self.done
    }
}

impl Progress for LogProgress {
    fn tick(&mut self) {
        self.done += 1;
        if self.done % self.every == 0 && self.done < self.total {
            log::info!("bootstrap iteration {}/{}", self.done, self.total);
        }
    }

    fn finish(&mut self) {
        log::info!("bootstrap finished {}/{}", self.done, self.total);
    }
}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn tick(&mut self) {
        (**self).tick()
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}

/// Terminal progress bar.
#[cfg(feature = "progress-bar")]
#[derive(Debug, Clone)]
pub struct ProgressBar {
    bar: indicatif::ProgressBar,
}

#[cfg(feature = "progress-bar")]
impl ProgressBar {
    pub fn new(total: usize) -> Self {
        let bar = indicatif::ProgressBar::new(total as u64);
        if let Ok(style) =
            indicatif::ProgressStyle::default_bar().template("  Bootstrap: [{bar:30}] {pos}/{len} ({eta})")
        {
            bar.set_style(style);
        }
        Self { bar }
    }
}

#[cfg(feature = "progress-bar")]
impl Progress for ProgressBar {
    fn tick(&mut self) {
        self.bar.inc(1);
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}
