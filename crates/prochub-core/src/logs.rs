use std::collections::VecDeque;

/// Upper bound on retained output lines per process.
pub const MAX_LOG_LINES: usize = 1000;

/// Bounded ring of captured output lines plus an unread-byte counter.
///
/// The ring keeps the most recent [`MAX_LOG_LINES`] lines, evicting the
/// oldest first. `unread_bytes` accumulates the byte length of every line
/// appended since the previous [`LogBuffer::drain`], so a polling reader can
/// tell how much new output arrived without re-reading content it has
/// already seen.
#[derive(Debug, Default)]
pub struct LogBuffer {
	lines: VecDeque<String>,
	unread_bytes: usize,
}

impl LogBuffer {
	pub fn new() -> Self {
		Self {
			lines: VecDeque::new(),
			unread_bytes: 0,
		}
	}

	pub fn append(&mut self, line: String) {
		if self.lines.len() >= MAX_LOG_LINES {
			self.lines.pop_front();
		}
		self.unread_bytes += line.len();
		self.lines.push_back(line);
	}

	/// Returns the buffered lines newest first and resets the unread
	/// counter. The buffer itself is not emptied; the returned count covers
	/// only lines appended since the previous drain.
	pub fn drain(&mut self) -> (Vec<String>, usize) {
		let lines = self.lines.iter().rev().cloned().collect();
		let unread = std::mem::take(&mut self.unread_bytes);
		(lines, unread)
	}

	/// The buffered lines newest first, without touching the unread counter.
	pub fn snapshot(&self) -> Vec<String> {
		self.lines.iter().rev().cloned().collect()
	}

	pub fn unread_bytes(&self) -> usize {
		self.unread_bytes
	}

	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn append_evicts_oldest_beyond_cap() {
		let mut buf = LogBuffer::new();
		for i in 0..(MAX_LOG_LINES + 5) {
			buf.append(format!("line-{}", i));
		}
		assert_eq!(buf.len(), MAX_LOG_LINES);

		let (lines, _) = buf.drain();
		assert_eq!(lines.first().map(String::as_str), Some("line-1004"));
		assert_eq!(lines.last().map(String::as_str), Some("line-5"));
	}

	#[test]
	fn drain_is_newest_first() {
		let mut buf = LogBuffer::new();
		buf.append("first".to_string());
		buf.append("second".to_string());
		buf.append("third".to_string());

		let (lines, _) = buf.drain();
		assert_eq!(lines, vec!["third", "second", "first"]);
	}

	#[test]
	fn drain_resets_unread_count() {
		let mut buf = LogBuffer::new();
		buf.append("abc".to_string());
		buf.append("de".to_string());

		let (lines, unread) = buf.drain();
		assert_eq!(lines, vec!["de", "abc"]);
		assert_eq!(unread, 5);

		// No intervening append: same content, zero unread.
		let (lines, unread) = buf.drain();
		assert_eq!(lines, vec!["de", "abc"]);
		assert_eq!(unread, 0);
	}

	#[test]
	fn snapshot_leaves_unread_untouched() {
		let mut buf = LogBuffer::new();
		buf.append("hello".to_string());

		assert_eq!(buf.snapshot(), vec!["hello"]);
		assert_eq!(buf.unread_bytes(), 5);
	}
}
