/// Ordered, append-only queue of encoded rows awaiting persistence
///
/// Grows only through `push` and shrinks only through `drain_all`, which
/// hands back every row in capture order and leaves the buffer empty.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    rows: Vec<String>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: String) {
        self.rows.push(row);
    }

    /// Take every buffered row, oldest first
    pub fn drain_all(&mut self) -> Vec<String> {
        std::mem::take(&mut self.rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
