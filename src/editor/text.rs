/// Line buffer for in-cell text editing.
/// Note: cursor is a CHARACTER index, not a byte index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBuffer {
    text: String,
    cursor: usize,
}

#[derive(PartialEq, Clone, Copy)]
enum CharType {
    Whitespace,
    Numeric,
    Punctuation,
    Alphabetic,
}

impl CharType {
    fn of(c: char) -> CharType {
        if c.is_whitespace() {
            CharType::Whitespace
        } else if c.is_numeric() {
            CharType::Numeric
        } else if c.is_alphabetic() {
            CharType::Alphabetic
        } else {
            CharType::Punctuation
        }
    }
}

impl TextBuffer {
    /// Start with `initial`, cursor at the end
    pub fn new(initial: impl Into<String>) -> Self {
        let text = initial.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.len();
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }

    /// Jump to the start of the current or previous word
    pub fn word_left(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let mut i = self.cursor;
        while i > 0 && CharType::of(chars[i - 1]) == CharType::Whitespace {
            i -= 1;
        }
        if i > 0 {
            let kind = CharType::of(chars[i - 1]);
            while i > 0 && CharType::of(chars[i - 1]) == kind {
                i -= 1;
            }
        }
        self.cursor = i;
    }

    /// Jump past the current word and the whitespace after it
    pub fn word_right(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let mut i = self.cursor;
        if i < chars.len() {
            let kind = CharType::of(chars[i]);
            if kind != CharType::Whitespace {
                while i < chars.len() && CharType::of(chars[i]) == kind {
                    i += 1;
                }
            }
        }
        while i < chars.len() && CharType::of(chars[i]) == CharType::Whitespace {
            i += 1;
        }
        self.cursor = i;
    }
}
