use unicode_segmentation::UnicodeSegmentation;

/// Unicode-aware word count: contiguous letter/number runs count as one
/// word each; CJK ideographs and syllables are counted individually since
/// `UnicodeSegmentation`'s word-boundary algorithm (UAX #29) already
/// treats them as separate words in the absence of whitespace. Byte or
/// ASCII-whitespace splitting would undercount non-Latin scripts, which
/// §4.2 explicitly calls out as insufficient.
pub fn count_words(text: &str) -> u64 {
    text.unicode_words().count() as u64
}
