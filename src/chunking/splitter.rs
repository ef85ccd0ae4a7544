use unicode_segmentation::UnicodeSegmentation;

use crate::config::SplitterConfig;
use crate::language::LanguageTag;

/// Terminal only when followed by whitespace or the end of the text.
const SPACED_TERMINALS: &[char] = &['.', '!', '?'];

/// Terminal wherever they appear.
const ALWAYS_TERMINALS: &[char] = &[
    '\n', '\u{17D4}', '\u{17D5}', '。', '！', '？', '\u{0964}', '\u{0965}', '؟', '۔', '።',
];

/// Closing marks that stay attached to the sentence they close.
const CLOSERS: &[char] = &['"', '\'', '”', '’', '»', ')', ']', '）', '」', '』', '》'];

const SOFT_BREAKS: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{00A0}'];

/// A contiguous slice of the input text.
///
/// `start` and `end` are byte offsets into the text that was split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Sentence {
    fn from_range(source: &str, start: usize, end: usize) -> Self {
        Self {
            text: source[start..end].to_string(),
            start,
            end,
        }
    }
}

/// Splits text into sentences without dropping or adding characters.
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    max_span_chars: usize,
}

impl SentenceSplitter {
    pub fn new(config: &SplitterConfig) -> Self {
        Self {
            max_span_chars: config.max_span_chars.max(1),
        }
    }

    pub fn split(&self, text: &str, lang: &LanguageTag) -> Vec<Sentence> {
        let ranges = punctuation_ranges(text);
        if !lang.script().lacks_boundaries() {
            return ranges.into_iter()
                .map(|(start, end)| Sentence::from_range(text, start, end))
                .collect();
        }

        let mut sentences = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            self.split_positional(text, start, end, &mut sentences);
        }
        sentences
    }

    /// Cut `text[start..end]` into pieces of at most `max_span_chars`,
    /// preferring a soft break in the second half of each span and never
    /// cutting inside a grapheme cluster.
    fn split_positional(&self, text: &str, start: usize, end: usize, out: &mut Vec<Sentence>) {
        let max = self.max_span_chars;
        let slice = &text[start..end];
        if slice.chars().count() <= max {
            out.push(Sentence::from_range(text, start, end));
            return;
        }

        let graphemes: Vec<(usize, &str)> = slice.grapheme_indices(true).collect();
        let mut piece_start = 0;
        let mut chars_in_piece = 0;
        let mut soft_break: Option<(usize, usize)> = None;
        let mut i = 0;

        while i < graphemes.len() {
            let (offset, grapheme) = graphemes[i];
            let len = grapheme.chars().count();

            if chars_in_piece + len > max && offset > piece_start {
                let cut = match soft_break {
                    Some((at, chars)) if chars * 2 >= max => at,
                    _ => offset,
                };
                out.push(Sentence::from_range(text, start + piece_start, start + cut));
                piece_start = cut;
                chars_in_piece = slice[cut..offset].chars().count();
                soft_break = None;
                continue;
            }

            chars_in_piece += len;
            if is_soft_break(grapheme) {
                soft_break = Some((offset + grapheme.len(), chars_in_piece));
            }
            i += 1;
        }

        if piece_start < slice.len() {
            out.push(Sentence::from_range(text, start + piece_start, end));
        }
    }
}

fn is_soft_break(grapheme: &str) -> bool {
    grapheme.chars().last()
        .is_some_and(|c| c.is_whitespace() || SOFT_BREAKS.contains(&c))
}

/// Byte ranges of punctuation-delimited sentences covering all of `text`.
fn punctuation_ranges(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i].1;
        let spaced = SPACED_TERMINALS.contains(&c);
        if !spaced && !ALWAYS_TERMINALS.contains(&c) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && CLOSERS.contains(&chars[j].1) {
            j += 1;
        }
        if spaced && j < chars.len() && !chars[j].1.is_whitespace() {
            i += 1;
            continue;
        }
        while j < chars.len() && chars[j].1.is_whitespace() {
            j += 1;
        }

        let end = chars.get(j).map_or(text.len(), |(offset, _)| *offset);
        ranges.push((start, end));
        start = end;
        i = j;
    }

    if start < text.len() {
        ranges.push((start, text.len()));
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(max_span_chars: usize) -> SentenceSplitter {
        SentenceSplitter::new(&SplitterConfig { max_span_chars })
    }

    fn texts(sentences: &[Sentence]) -> Vec<&str> {
        sentences.iter().map(|s| s.text.as_str()).collect()
    }

    fn assert_lossless(text: &str, sentences: &[Sentence]) {
        let joined: String = sentences.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, text);
        for s in sentences {
            assert_eq!(&text[s.start..s.end], s.text);
        }
        for pair in sentences.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_latin_keeps_punctuation_and_spacing() {
        let text = "Hello there. How are you?  Fine!\nNext line";
        let sentences = splitter(200).split(text, &"eng_Latn".into());
        assert_eq!(
            texts(&sentences),
            vec!["Hello there. ", "How are you?  ", "Fine!\n", "Next line"]
        );
        assert_lossless(text, &sentences);
    }

    #[test]
    fn test_decimal_and_quotes() {
        let text = "Pi is 3.14 roughly. He said \"stop.\" Then left.";
        let sentences = splitter(200).split(text, &"eng_Latn".into());
        assert_eq!(
            texts(&sentences),
            vec!["Pi is 3.14 roughly. ", "He said \"stop.\" ", "Then left."]
        );
    }

    #[test]
    fn test_no_punctuation_is_one_sentence() {
        let text = "no terminal punctuation here";
        let sentences = splitter(5).split(text, &"eng_Latn".into());
        assert_eq!(texts(&sentences), vec![text]);
    }

    #[test]
    fn test_empty_text() {
        assert!(splitter(10).split("", &"eng_Latn".into()).is_empty());
    }

    #[test]
    fn test_cjk_terminals_without_spaces() {
        let text = "今日は晴れです。明日は雨？そうですね";
        let sentences = splitter(200).split(text, &"jpn_Jpan".into());
        assert_eq!(texts(&sentences), vec!["今日は晴れです。", "明日は雨？", "そうですね"]);
    }

    #[test]
    fn test_khmer_khan_and_positional_split() {
        let long = "ក".repeat(25);
        let text = format!("សួស្តី។ {}", long);
        let sentences = splitter(10).split(&text, &"khm_Khmr".into());
        assert_eq!(sentences[0].text, "សួស្តី។ ");
        assert!(sentences[1..].iter().all(|s| s.text.chars().count() <= 10));
        assert_eq!(sentences.len(), 4);
        assert_lossless(&text, &sentences);
    }

    #[test]
    fn test_positional_prefers_soft_break() {
        let text = "กขคงจฉ ชซฌญฎฏฐ";
        let sentences = splitter(10).split(text, &"tha_Thai".into());
        assert_eq!(texts(&sentences), vec!["กขคงจฉ ", "ชซฌญฎฏฐ"]);
    }

    #[test]
    fn test_soft_break_too_early_is_ignored() {
        let text = "ก ขคงจฉชซฌญฎฏฐ";
        let sentences = splitter(10).split(text, &"tha_Thai".into());
        assert_eq!(sentences[0].text.chars().count(), 10);
        assert_lossless(text, &sentences);
    }

    #[test]
    fn test_zero_width_space_is_soft_break() {
        let text = "កខគឃង\u{200B}ចឆជឈញដឋ";
        let sentences = splitter(8).split(text, &"khm_Khmr".into());
        assert_eq!(sentences[0].text, "កខគឃង\u{200B}");
        assert_lossless(text, &sentences);
    }

    #[test]
    fn test_never_splits_grapheme_cluster() {
        // Each Khmer syllable below is one grapheme of several code points
        let text = "ស្តី".repeat(10);
        let sentences = splitter(5).split(&text, &"khm_Khmr".into());
        for s in &sentences {
            assert_eq!(s.text.graphemes(true).collect::<String>(), s.text);
            assert!(s.text.starts_with('ស'));
        }
        assert_lossless(&text, &sentences);
    }

    #[test]
    fn test_lossless_across_spans() {
        let text = "First line.\n\nSecond paragraph, with detail! 数字は 3.5 です。 \
                    ភាសាខ្មែរ​គឺ​ស្រស់ស្អាត។ Trailing   ";
        for lang in ["eng_Latn", "khm_Khmr", "tha_Thai", "zho_Hans"] {
            for span in 1..40 {
                let sentences = splitter(span).split(text, &lang.into());
                assert_lossless(text, &sentences);
            }
        }
    }
}
