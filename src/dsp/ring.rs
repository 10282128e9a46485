//! Fixed-capacity sample history with a wrapping write cursor.

/// A ring of the most recent `capacity` samples.
///
/// Capacity is fixed at construction; `clear` zeroes the contents in place.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f32>,
    cursor: usize,
}

impl RingBuffer {
    /// A zeroed ring. Capacity is at least one sample.
    pub fn new(capacity: usize) -> Self {
        RingBuffer {
            data: vec![0.0; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Index the next `push` will write to, always in [0, capacity).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Overwrite the oldest sample with `sample`.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.data[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % self.data.len();
    }

    /// The `age`-th most recent sample; 0 is the last one pushed.
    #[inline]
    pub fn recent(&self, age: usize) -> f32 {
        let len = self.data.len();
        self.data[(self.cursor + len - 1 - age % len) % len]
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.cursor = 0;
    }
}
