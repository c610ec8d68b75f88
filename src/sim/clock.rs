use super::types::Tick;

/// A discrete host clock that advances one tick at a time.
///
/// # Examples
///
/// ```
/// use backup_power::sim::clock::Clock;
///
/// let mut clock = Clock::new(3);
/// let mut ticks = Vec::new();
///
/// clock.run(|tick| ticks.push(tick));
/// assert_eq!(ticks, vec![0, 1, 2]);
/// ```
pub struct Clock {
    /// Current tick
    current: Tick,
    /// Total ticks to run
    total: Tick,
}

impl Clock {
    /// Creates a new clock that will run for `total` ticks.
    pub fn new(total: Tick) -> Self {
        Self { current: 0, total }
    }

    /// The tick that the next call to [`Clock::tick`] will return.
    pub fn now(&self) -> Tick {
        self.current
    }

    /// Advances the clock by one tick.
    ///
    /// # Returns
    ///
    /// * `Some(tick)` - The current tick before advancing
    /// * `None` - If the clock has run out
    pub fn tick(&mut self) -> Option<Tick> {
        if self.current < self.total {
            let tick = self.current;
            self.current += 1;
            Some(tick)
        } else {
            None
        }
    }

    /// Runs a function for each remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(Tick)) {
        while let Some(tick) = self.tick() {
            f(tick);
        }
    }
}

/// True on ticks where a task with the given interval should run.
///
/// An interval of zero is treated as one.
pub fn is_due(tick: Tick, interval: Tick) -> bool {
    tick % interval.max(1) == 0
}
