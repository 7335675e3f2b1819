/// Double-buffered equation state, indexed by equation ordinal.
///
/// `current` holds the values committed by the last completed tick and is
/// the only slot rules can read. `pending` receives the values computed
/// during the update phase and is promoted wholesale by [`commit`].
///
/// [`commit`]: StateBuffer::commit
#[derive(Debug, Clone, PartialEq)]
pub struct StateBuffer {
    current: Vec<f64>,
    pending: Vec<f64>,
}

impl StateBuffer {
    /// Create a buffer where both slots start from `initial`.
    pub fn new(initial: Vec<f64>) -> Self {
        Self {
            pending: initial.clone(),
            current: initial,
        }
    }

    /// Number of quantities held.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Returns `true` if the buffer holds no quantities.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Committed values.
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    /// Values computed for the next tick.
    pub fn pending(&self) -> &[f64] {
        &self.pending
    }

    /// Borrow the committed slot for reading and the pending slot for writing.
    pub fn split_mut(&mut self) -> (&[f64], &mut [f64]) {
        (&self.current, &mut self.pending)
    }

    /// Overwrite both slots of one quantity.
    pub fn set(&mut self, index: usize, value: f64) {
        self.current[index] = value;
        self.pending[index] = value;
    }

    /// Overwrite the committed slot of one quantity.
    pub fn set_current(&mut self, index: usize, value: f64) {
        self.current[index] = value;
    }

    /// Overwrite the pending slot of one quantity.
    pub fn set_pending(&mut self, index: usize, value: f64) {
        self.pending[index] = value;
    }

    /// Promote every pending value to current.
    pub fn commit(&mut self) {
        self.current.copy_from_slice(&self.pending);
    }
}
