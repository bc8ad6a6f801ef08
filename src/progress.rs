use log::info;

/// Observes migration progress. Has no effect on the outcome.
pub trait ProgressSink {
    fn start(&mut self, total: usize);
    fn advance(&mut self);
    fn finish(&mut self);
}

impl<P: ProgressSink + ?Sized> ProgressSink for &mut P {
    fn start(&mut self, total: usize) {
        (**self).start(total)
    }

    fn advance(&mut self) {
        (**self).advance()
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}

/// Discards all progress events.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn start(&mut self, _total: usize) {}
    fn advance(&mut self) {}
    fn finish(&mut self) {}
}

/// Reports each step through the `log` facade.
#[derive(Debug, Default, Clone)]
pub struct LogProgress {
    total: usize,
    current: usize,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.current
    }
}

impl ProgressSink for LogProgress {
    fn start(&mut self, total: usize) {
        self.total = total;
        self.current = 0;
        info!("EAV migration: {} steps", total);
    }

    fn advance(&mut self) {
        self.current += 1;
        info!("EAV migration: step {}/{}", self.current, self.total);
    }

    fn finish(&mut self) {
        info!("EAV migration: finished {}/{}", self.current, self.total);
    }
}
