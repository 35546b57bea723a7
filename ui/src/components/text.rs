use std::fmt;

/// A block of lines to print.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Text {
    lines: Vec<String>,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from<S: Into<String>>(line: S) -> Self {
        Self {
            lines: vec![line.into()],
        }
    }

    pub fn add_line<S: Into<String>>(&mut self, line: S) {
        self.lines.push(line.into());
    }

    pub fn append(&mut self, other: Text) {
        self.lines.extend(other.lines);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}
