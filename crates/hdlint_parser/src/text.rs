//! Text helpers shared by the scanners.

use hdlint_types::Location;

/// Byte offset of each line start, for turning match offsets into
/// zero-based (line, column) pairs.
#[derive(Debug)]
pub struct LineIndex {
  starts: Vec<usize>,
}

impl LineIndex {
  pub fn new(text: &str) -> Self {
    let mut starts = Vec::with_capacity(128);
    starts.push(0);
    for (offset, byte) in text.bytes().enumerate() {
      if byte == b'\n' {
        starts.push(offset + 1);
      }
    }
    Self { starts }
  }

  pub fn location(
    &self,
    offset: usize,
  ) -> Location {
    let line = match self.starts.binary_search(&offset) {
      Ok(line) => line,
      Err(insertion) => insertion - 1,
    };
    Location::new(line as u32, (offset - self.starts[line]) as u32)
  }
}

/// Blanks out VHDL `--` comments, preserving byte offsets and newlines so
/// locations computed on the stripped text match the original.
pub fn strip_vhdl_comments(text: &str) -> String {
  let bytes = text.as_bytes();
  let mut out = bytes.to_vec();
  let mut i = 0;

  while i + 1 < bytes.len() {
    if bytes[i] == b'-' && bytes[i + 1] == b'-' {
      while i < bytes.len() && bytes[i] != b'\n' {
        out[i] = b' ';
        i += 1;
      }
    } else {
      i += 1;
    }
  }

  String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

/// Blanks out `//` and `/* */` comments, preserving offsets and newlines.
pub fn strip_c_comments(text: &str) -> String {
  let bytes = text.as_bytes();
  let mut out = bytes.to_vec();
  let mut i = 0;

  while i + 1 < bytes.len() {
    if bytes[i] == b'/' && bytes[i + 1] == b'/' {
      while i < bytes.len() && bytes[i] != b'\n' {
        out[i] = b' ';
        i += 1;
      }
    } else if bytes[i] == b'/' && bytes[i + 1] == b'*' {
      out[i] = b' ';
      out[i + 1] = b' ';
      i += 2;
      while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
        if bytes[i] != b'\n' {
          out[i] = b' ';
        }
        i += 1;
      }
      if i + 1 < bytes.len() {
        out[i] = b' ';
        out[i + 1] = b' ';
        i += 2;
      }
    } else {
      i += 1;
    }
  }

  String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn line_index_maps_offsets() {
    let index = LineIndex::new("ab\ncd\n");
    assert_eq!(index.location(0), Location::new(0, 0));
    assert_eq!(index.location(1), Location::new(0, 1));
    assert_eq!(index.location(3), Location::new(1, 0));
    assert_eq!(index.location(4), Location::new(1, 1));
  }

  #[test]
  fn vhdl_comments_blank_to_spaces() {
    let source = "a -- comment\nb";
    let stripped = strip_vhdl_comments(source);
    assert_eq!(stripped.len(), source.len());
    assert!(!stripped.contains("comment"));
    assert_eq!(stripped.find('b'), source.find('b'));
  }

  #[test]
  fn block_comments_keep_newlines() {
    let stripped = strip_c_comments("a /* x\ny */ b // tail\nc");
    assert_eq!(stripped.lines().count(), 3);
    assert!(stripped.contains('a'));
    assert!(stripped.contains('b'));
    assert!(stripped.contains('c'));
    assert!(!stripped.contains('x'));
    assert!(!stripped.contains("tail"));
  }
}
