use tracing::debug;

/// Smallest multiple of `stride` strictly greater than `current`
///
/// Falls back to `stride` itself when `current` is not positive.
pub fn next_boundary(current: f64, stride: f64) -> f64 {
    if current <= 0.0 || !current.is_finite() {
        return stride;
    }
    ((current / stride).floor() + 1.0) * stride
}

/// Playback-time boundaries at which sampling pauses for a checkpoint
///
/// The first boundary is anchored from the playback position of the first
/// sample. Every later boundary is the previous one plus one stride, never
/// recomputed from the live position, so late resumes do not shift the
/// spacing of subsequent checkpoints.
#[derive(Debug, Clone)]
pub struct CheckpointSchedule {
    stride: f64,
    boundary: Option<f64>,
    completed: u32,
    max_checkpoints: u32,
}

impl CheckpointSchedule {
    pub fn new(stride: f64, max_checkpoints: u32) -> Self {
        Self {
            stride,
            boundary: None,
            completed: 0,
            max_checkpoints,
        }
    }

    /// Anchor the first boundary; later calls are ignored
    pub fn anchor(&mut self, position: f64) -> f64 {
        match self.boundary {
            Some(boundary) => boundary,
            None => {
                let boundary = next_boundary(position, self.stride);
                debug!("First checkpoint boundary anchored at {:.0}s", boundary);
                self.boundary = Some(boundary);
                boundary
            }
        }
    }

    pub fn is_anchored(&self) -> bool {
        self.boundary.is_some()
    }

    /// Active boundary, or the first stride if sampling has not started
    pub fn boundary(&self) -> f64 {
        self.boundary.unwrap_or(self.stride)
    }

    /// Whether `position` has reached the active boundary
    pub fn crossed(&self, position: f64) -> bool {
        matches!(self.boundary, Some(boundary) if position >= boundary)
    }

    /// Record a completed checkpoint and move the boundary forward one stride
    pub fn advance(&mut self) -> f64 {
        let next = self.boundary() + self.stride;
        self.boundary = Some(next);
        self.completed += 1;
        next
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn limit_reached(&self) -> bool {
        self.completed >= self.max_checkpoints
    }
}
