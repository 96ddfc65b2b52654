//! XSD regular expressions
//!
//! Pattern facets use the XML Schema regex dialect: implicitly anchored,
//! no back-references or assertions, `^`/`$` are literals, plus the XML
//! name escapes `\i`/`\c`, Unicode block escapes `\p{IsBlock}` and class
//! subtraction `[a-z-[aeiou]]`. Patterns are translated into `regex` crate
//! syntax; anything outside the dialect is rejected at schema build time
//! instead of being handed to the engine as-is.

use regex::Regex;

use crate::error::ParseError;

/// General categories accepted by `\p{..}`
const CATEGORIES: &[&str] = &[
    "L", "Lu", "Ll", "Lt", "Lm", "Lo", "M", "Mn", "Mc", "Me", "N", "Nd", "Nl", "No", "P", "Pc",
    "Pd", "Ps", "Pe", "Pi", "Pf", "Po", "Z", "Zs", "Zl", "Zp", "S", "Sm", "Sc", "Sk", "So", "C",
    "Cc", "Cf", "Co", "Cn",
];

/// Unicode blocks accepted by `\p{IsBlock}`
const BLOCKS: &[(&str, u32, u32)] = &[
    ("BasicLatin", 0x0000, 0x007F),
    ("Latin-1Supplement", 0x0080, 0x00FF),
    ("LatinExtended-A", 0x0100, 0x017F),
    ("LatinExtended-B", 0x0180, 0x024F),
    ("IPAExtensions", 0x0250, 0x02AF),
    ("SpacingModifierLetters", 0x02B0, 0x02FF),
    ("CombiningDiacriticalMarks", 0x0300, 0x036F),
    ("Greek", 0x0370, 0x03FF),
    ("Cyrillic", 0x0400, 0x04FF),
    ("Armenian", 0x0530, 0x058F),
    ("Hebrew", 0x0590, 0x05FF),
    ("Arabic", 0x0600, 0x06FF),
    ("Devanagari", 0x0900, 0x097F),
    ("Thai", 0x0E00, 0x0E7F),
    ("Georgian", 0x10A0, 0x10FF),
    ("HangulJamo", 0x1100, 0x11FF),
    ("LatinExtendedAdditional", 0x1E00, 0x1EFF),
    ("GreekExtended", 0x1F00, 0x1FFF),
    ("GeneralPunctuation", 0x2000, 0x206F),
    ("SuperscriptsandSubscripts", 0x2070, 0x209F),
    ("CurrencySymbols", 0x20A0, 0x20CF),
    ("LetterlikeSymbols", 0x2100, 0x214F),
    ("NumberForms", 0x2150, 0x218F),
    ("Arrows", 0x2190, 0x21FF),
    ("MathematicalOperators", 0x2200, 0x22FF),
    ("MiscellaneousTechnical", 0x2300, 0x23FF),
    ("BoxDrawing", 0x2500, 0x257F),
    ("GeometricShapes", 0x25A0, 0x25FF),
    ("MiscellaneousSymbols", 0x2600, 0x26FF),
    ("CJKSymbolsandPunctuation", 0x3000, 0x303F),
    ("Hiragana", 0x3040, 0x309F),
    ("Katakana", 0x30A0, 0x30FF),
    ("CJKUnifiedIdeographs", 0x4E00, 0x9FFF),
    ("HangulSyllables", 0xAC00, 0xD7AF),
    ("PrivateUse", 0xE000, 0xF8FF),
    ("AlphabeticPresentationForms", 0xFB00, 0xFB4F),
    ("HalfwidthandFullwidthForms", 0xFF00, 0xFFEF),
    ("Specials", 0xFFF0, 0xFFFF),
];

const NAME_START: &str = r"\p{L}\p{Nl}_:";
const NAME_CHAR: &str = r"\p{L}\p{Nl}\p{Nd}\p{Mn}\p{Mc}\p{Lm}_:.\-\x{B7}";
const WORD_EXCLUDED: &str = r"\p{P}\p{Z}\p{C}";

/// A compiled pattern facet
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Translate and compile an XSD pattern
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let translated = translate(source)?;
        let regex = Regex::new(&translated).map_err(|e| {
            ParseError::new(format!("invalid pattern: {}", e)).with_source(source)
        })?;
        Ok(Self {
            source: source.to_owned(),
            regex,
        })
    }

    /// The pattern as written in the schema
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the whole of `value` matches
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Translate an XSD regular expression into anchored `regex` crate syntax
pub fn translate(pattern: &str) -> Result<String, ParseError> {
    let mut translator = Translator {
        chars: pattern.chars().collect(),
        pos: 0,
        source: pattern,
        out: String::with_capacity(pattern.len() + 8),
    };
    translator.out.push_str("^(?:");
    translator.branch_list()?;
    if translator.pos < translator.chars.len() {
        return Err(translator.error("unbalanced parenthesis"));
    }
    translator.out.push_str(")$");
    Ok(translator.out)
}

struct Translator<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
    out: String,
}

impl Translator<'_> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(format!("{} at offset {}", message.into(), self.pos)).with_source(self.source)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Translate until end of input or an unmatched `)`
    fn branch_list(&mut self) -> Result<(), ParseError> {
        let mut quantifiable = false;
        while let Some(c) = self.peek() {
            match c {
                ')' => return Ok(()),
                '|' => {
                    self.pos += 1;
                    self.out.push('|');
                    quantifiable = false;
                }
                '(' => {
                    self.pos += 1;
                    if self.peek() == Some('?') {
                        return Err(self.error("group extensions '(?' are not part of XSD regular expressions"));
                    }
                    self.out.push_str("(?:");
                    self.branch_list()?;
                    if self.next() != Some(')') {
                        return Err(self.error("unbalanced parenthesis"));
                    }
                    self.out.push(')');
                    quantifiable = true;
                }
                '*' | '+' | '?' | '{' => {
                    if !quantifiable {
                        return Err(self.error(format!("quantifier '{}' has nothing to repeat", c)));
                    }
                    self.quantifier()?;
                    quantifiable = false;
                }
                '[' => {
                    self.pos += 1;
                    self.char_class()?;
                    quantifiable = true;
                }
                ']' => return Err(self.error("unescaped ']'")),
                '.' => {
                    self.pos += 1;
                    self.out.push_str(r"[^\n\r]");
                    quantifiable = true;
                }
                '\\' => {
                    self.pos += 1;
                    let piece = self.escape()?;
                    self.out.push_str(&piece);
                    quantifiable = true;
                }
                _ => {
                    self.pos += 1;
                    self.out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                    quantifiable = true;
                }
            }
        }
        Ok(())
    }

    fn quantifier(&mut self) -> Result<(), ParseError> {
        match self.next() {
            Some('{') => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == '}' {
                        break;
                    }
                    self.pos += 1;
                }
                let body: String = self.chars[start..self.pos].iter().collect();
                if self.next() != Some('}') {
                    return Err(self.error("unterminated quantifier"));
                }
                let valid = match body.split_once(',') {
                    Some((min, max)) => {
                        !min.is_empty()
                            && min.chars().all(|c| c.is_ascii_digit())
                            && max.chars().all(|c| c.is_ascii_digit())
                    }
                    None => !body.is_empty() && body.chars().all(|c| c.is_ascii_digit()),
                };
                if !valid {
                    return Err(self.error(format!("invalid quantifier '{{{}}}'", body)));
                }
                self.out.push('{');
                self.out.push_str(&body);
                self.out.push('}');
            }
            Some(c) => self.out.push(c),
            None => return Err(self.error("missing quantifier")),
        }
        if matches!(self.peek(), Some('?') | Some('+') | Some('*') | Some('{')) {
            return Err(self.error("repeated or lazy quantifiers are not part of XSD regular expressions"));
        }
        Ok(())
    }

    /// Translate the escape after a consumed `\`
    fn escape(&mut self) -> Result<String, ParseError> {
        let c = self.next().ok_or_else(|| self.error("trailing backslash"))?;
        let piece = match c {
            'n' => r"\n".to_string(),
            'r' => r"\r".to_string(),
            't' => r"\t".to_string(),
            '\\' | '|' | '.' | '-' | '^' | '?' | '*' | '+' | '{' | '}' | '(' | ')' | '[' | ']' => {
                format!("\\{}", c)
            }
            's' => class_set(r" \t\n\r", false),
            'S' => class_set(r" \t\n\r", true),
            'd' => r"\p{Nd}".to_string(),
            'D' => r"\P{Nd}".to_string(),
            'w' => class_set(WORD_EXCLUDED, true),
            'W' => class_set(WORD_EXCLUDED, false),
            'i' => class_set(NAME_START, false),
            'I' => class_set(NAME_START, true),
            'c' => class_set(NAME_CHAR, false),
            'C' => class_set(NAME_CHAR, true),
            'p' | 'P' => {
                let negated = c == 'P';
                if self.next() != Some('{') {
                    return Err(self.error("expected '{' after \\p"));
                }
                let start = self.pos;
                while self.peek().is_some_and(|c| c != '}') {
                    self.pos += 1;
                }
                let name: String = self.chars[start..self.pos].iter().collect();
                if self.next() != Some('}') {
                    return Err(self.error("unterminated property escape"));
                }
                self.property(&name, negated)?
            }
            other => {
                return Err(self.error(format!("unknown escape '\\{}'", other)));
            }
        };
        Ok(piece)
    }

    fn property(&self, name: &str, negated: bool) -> Result<String, ParseError> {
        if let Some(block) = name.strip_prefix("Is") {
            let (_, lo, hi) = BLOCKS
                .iter()
                .find(|(n, _, _)| *n == block)
                .ok_or_else(|| self.error(format!("unsupported block escape '\\p{{{}}}'", name)))?;
            let range = format!(r"\x{{{:X}}}-\x{{{:X}}}", lo, hi);
            return Ok(class_set(&range, negated));
        }
        if !CATEGORIES.contains(&name) {
            return Err(self.error(format!("unknown category escape '\\p{{{}}}'", name)));
        }
        Ok(format!(r"\{}{{{}}}", if negated { 'P' } else { 'p' }, name))
    }

    /// Translate a character class; the opening `[` has been consumed
    fn char_class(&mut self) -> Result<(), ParseError> {
        let negated = if self.peek() == Some('^') {
            self.pos += 1;
            true
        } else {
            false
        };
        let mut body = String::new();
        let mut first = true;
        let mut subtraction = None;
        loop {
            let c = self.next().ok_or_else(|| self.error("unterminated character class"))?;
            match c {
                ']' if !first => break,
                '-' if self.peek() == Some('[') && !first => {
                    self.pos += 1;
                    let saved = std::mem::take(&mut self.out);
                    self.char_class()?;
                    subtraction = Some(std::mem::replace(&mut self.out, saved));
                    if self.next() != Some(']') {
                        return Err(self.error("class subtraction must end the character class"));
                    }
                    break;
                }
                '[' => return Err(self.error("unescaped '[' inside a character class")),
                _ => {
                    let start = if c == '\\' {
                        let piece = self.escape()?;
                        if !is_single_char_escape(&piece) {
                            body.push_str(&piece);
                            first = false;
                            continue;
                        }
                        piece
                    } else {
                        class_literal(c)
                    };
                    if self.peek() == Some('-') && self.chars.get(self.pos + 1).is_some_and(|n| *n != ']' && *n != '[') {
                        self.pos += 1;
                        let end_char = self.next().ok_or_else(|| self.error("unterminated range"))?;
                        let end = if end_char == '\\' {
                            let piece = self.escape()?;
                            if !is_single_char_escape(&piece) {
                                return Err(self.error("range end must be a single character"));
                            }
                            piece
                        } else {
                            class_literal(end_char)
                        };
                        body.push_str(&start);
                        body.push('-');
                        body.push_str(&end);
                    } else {
                        body.push_str(&start);
                    }
                }
            }
            first = false;
        }
        let class = format!("[{}{}]", if negated { "^" } else { "" }, body);
        match subtraction {
            Some(sub) => {
                self.out.push('[');
                self.out.push_str(&class);
                self.out.push_str("--");
                self.out.push_str(&sub);
                self.out.push(']');
            }
            None => self.out.push_str(&class),
        }
        Ok(())
    }
}

fn class_literal(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0; 4]))
}

fn is_single_char_escape(piece: &str) -> bool {
    let mut chars = piece.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('\\'), Some(c), None) => !matches!(c, 'p' | 'P'),
        _ => false,
    }
}

/// Class of `items`; `regex` classes nest, so this also works inside a class
fn class_set(items: &str, negated: bool) -> String {
    format!("[{}{}]", if negated { "^" } else { "" }, items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, value: &str) -> bool {
        CompiledPattern::new(pattern).unwrap().is_match(value)
    }

    #[test]
    fn test_implicit_anchoring() {
        assert!(matches("[a-z]+", "abc"));
        assert!(!matches("[a-z]+", "abc1"));
        assert!(matches("a|b", "b"));
        assert!(!matches("a|b", "ab"));
    }

    #[test]
    fn test_caret_and_dollar_are_literals() {
        assert!(matches("^a$", "^a$"));
        assert!(!matches("^a$", "a"));
    }

    #[test]
    fn test_dot_excludes_newlines() {
        assert!(matches("a.c", "abc"));
        assert!(!matches("a.c", "a\nc"));
    }

    #[test]
    fn test_multi_char_escapes() {
        assert!(matches(r"\d{3}-\d{4}", "555-1234"));
        assert!(matches(r"\i\c*", "_foo-bar.1"));
        assert!(!matches(r"\i\c*", "1foo"));
        assert!(matches(r"\s?x", " x"));
        assert!(matches(r"\w+", "abc"));
        assert!(!matches(r"\w+", "a b"));
        assert!(matches(r"[\s\d]+", "1 2"));
    }

    #[test]
    fn test_category_and_block_escapes() {
        assert!(matches(r"\p{Lu}\p{Ll}*", "Hello"));
        assert!(matches(r"\p{IsBasicLatin}+", "abc"));
        assert!(!matches(r"\p{IsBasicLatin}+", "é"));
        assert!(matches(r"\P{IsBasicLatin}", "é"));
        assert!(CompiledPattern::new(r"\p{IsKlingon}").is_err());
        assert!(CompiledPattern::new(r"\p{Foo}").is_err());
    }

    #[test]
    fn test_class_subtraction() {
        assert!(matches("[a-z-[aeiou]]+", "bcd"));
        assert!(!matches("[a-z-[aeiou]]+", "bad"));
        assert!(matches("[^a-[b]]", "c"));
    }

    #[test]
    fn test_class_literals() {
        assert!(matches("[-a]+", "-a-"));
        assert!(matches("[a-]+", "a-"));
        assert!(matches(r"[\-\]]+", "-]"));
        assert!(matches("[&~]", "&"));
    }

    #[test]
    fn test_rejects_constructs_outside_the_dialect() {
        assert!(CompiledPattern::new("(?i)a").is_err());
        assert!(CompiledPattern::new(r"(a)\1").is_err());
        assert!(CompiledPattern::new(r"\bword").is_err());
        assert!(CompiledPattern::new("a*?").is_err());
        assert!(CompiledPattern::new("*a").is_err());
        assert!(CompiledPattern::new("(a").is_err());
        assert!(CompiledPattern::new("a{x}").is_err());
    }

    #[test]
    fn test_quantifiers() {
        assert!(matches("a{2,3}", "aaa"));
        assert!(!matches("a{2,3}", "a"));
        assert!(matches("(ab){2}", "abab"));
        assert!(matches("a{2,}", "aaaaa"));
    }
}
