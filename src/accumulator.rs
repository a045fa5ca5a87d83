/// Running sum of one metric over a polling window.
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    window: u32,
    sum: f64,
    count: u32,
}

impl WindowAccumulator {
    pub fn new(window: u32) -> Self {
        debug_assert!(window >= 1, "window must hold at least one tick");
        Self {
            window: window.max(1),
            sum: 0.0,
            count: 0,
        }
    }

    pub fn add(&mut self, value: f64) {
        debug_assert!(self.count < self.window, "sample added to a full window");
        self.sum += value;
        self.count += 1;
    }

    pub fn is_window_complete(&self) -> bool {
        self.count == self.window
    }

    /// Window mean, then reset. Only valid once the window is complete.
    pub fn drain_average(&mut self) -> f64 {
        debug_assert!(self.is_window_complete(), "window drained early");
        let average = self.sum / self.window as f64;
        self.sum = 0.0;
        self.count = 0;
        average
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_a_full_window() {
        let mut acc = WindowAccumulator::new(3);
        acc.add(0.0);
        acc.add(50.0);
        assert!(!acc.is_window_complete());
        acc.add(100.0);
        assert!(acc.is_window_complete());
        assert_eq!(acc.drain_average(), 50.0);
        assert_eq!(acc.count(), 0);
        assert!(!acc.is_window_complete());
    }

    #[test]
    fn single_tick_window_passes_value_through() {
        let mut acc = WindowAccumulator::new(1);
        acc.add(42.5);
        assert!(acc.is_window_complete());
        assert_eq!(acc.drain_average(), 42.5);
    }

    #[test]
    fn drain_resets_sum_for_next_window() {
        let mut acc = WindowAccumulator::new(2);
        acc.add(100.0);
        acc.add(100.0);
        assert_eq!(acc.drain_average(), 100.0);
        acc.add(10.0);
        acc.add(20.0);
        assert_eq!(acc.drain_average(), 15.0);
    }
}
