use heapless::Deque;

/// Fixed size capture buffer for command responses
///
/// Bytes are appended in arrival order. If more than `N` bytes arrive, the oldest byte is dropped,
/// so the tail of a long response (where the terminal tokens are located) is always retained.
///
/// N needs to be greater than zero.
pub struct ResponseBuffer<const N: usize> {
    data: Deque<u8, N>,

    /// True if at least one byte was dropped since the last clear
    overflowed: bool,
}

impl<const N: usize> ResponseBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: Deque::new(),
            overflowed: false,
        }
    }

    /// Appends a single byte
    pub fn push(&mut self, byte: u8) {
        if self.data.is_full() {
            self.data.pop_front();
            self.overflowed = true;
        }

        let _ = self.data.push_back(byte);
    }

    /// Drops all captured bytes
    pub fn clear(&mut self) {
        self.data.clear();
        self.overflowed = false;
    }

    /// Passes the captured bytes as one contiguous slice to the given closure
    pub fn with_contiguous<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let mut scratch = [0x0; N];
        let (front, back) = self.data.as_slices();

        scratch[..front.len()].copy_from_slice(front);
        scratch[front.len()..front.len() + back.len()].copy_from_slice(back);

        f(&scratch[..self.data.len()])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if bytes got dropped since the last clear
    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    /// True if the captured bytes contain the given needle
    pub fn contains(&self, needle: &[u8]) -> bool {
        self.with_contiguous(|data| contains(data, needle))
    }
}

impl<const N: usize> Default for ResponseBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Substring search on raw bytes. NUL bytes are ordinary data.
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Returns the start index of the first occurrence of needle
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }

    haystack.windows(needle.len()).position(|window| window == needle)
}
