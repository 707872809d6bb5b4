/// A file's text split into lines with each line's own terminator kept
/// alongside it. Replacing one line and joining reproduces every other byte
/// of the original exactly — mixed `\n`/`\r\n` files and a missing final
/// newline survive the round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    parts: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    text: String,
    /// `"\n"`, `"\r\n"`, or `""` for a final line without a terminator
    ending: &'static str,
}

impl LineBuffer {
    /// Split on `\n`, treating a preceding `\r` as part of the terminator.
    pub fn split(content: &str) -> LineBuffer {
        let mut parts = Vec::new();
        let mut rest = content;
        while let Some(nl) = rest.find('\n') {
            let (head, tail) = rest.split_at(nl);
            let (text, ending) = match head.strip_suffix('\r') {
                Some(text) => (text, "\r\n"),
                None => (head, "\n"),
            };
            parts.push(Line {
                text: text.to_string(),
                ending,
            });
            rest = &tail[1..];
        }
        if !rest.is_empty() {
            parts.push(Line {
                text: rest.to_string(),
                ending: "",
            });
        }
        LineBuffer { parts }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.parts.get(idx).map(|l| l.text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|l| l.text.as_str())
    }

    /// Replace one line's text, keeping its terminator.
    pub fn replace(&mut self, idx: usize, text: String) {
        self.parts[idx].text = text;
    }

    pub fn join(&self) -> String {
        let mut out = String::new();
        for line in &self.parts {
            out.push_str(&line.text);
            out.push_str(line.ending);
        }
        out
    }
}
