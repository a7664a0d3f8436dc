use std::{collections::HashMap, sync::LazyLock};

use serde::{Deserialize, Serialize};

use crate::text_source_map::TextSourceMap;

pub const HIRAGANA_SMALL_TSU: char = '\u{3063}';
pub const KATAKANA_SMALL_TSU: char = '\u{30c3}';
pub const KATAKANA_SMALL_KA: char = '\u{30f5}';
pub const KATAKANA_SMALL_KE: char = '\u{30f6}';
pub const KANA_PROLONGED_SOUND_MARK: char = '\u{30fc}';

pub type CodepointRange = (u32, u32);

pub const HIRAGANA_CONVERSION_RANGE: CodepointRange = (0x3041, 0x3096);
pub const KATAKANA_CONVERSION_RANGE: CodepointRange = (0x30a1, 0x30f6);

pub const HIRAGANA_RANGE: CodepointRange = (0x3040, 0x309f);
pub const KATAKANA_RANGE: CodepointRange = (0x30a0, 0x30ff);

pub const KANA_RANGES: &[CodepointRange] = &[HIRAGANA_RANGE, KATAKANA_RANGE];

pub const JAPANESE_RANGES: &[CodepointRange] = &[
    HIRAGANA_RANGE,
    KATAKANA_RANGE,
    (0x4e00, 0x9fff),   // Unified ideographs
    (0x3400, 0x4dbf),   // Extension A
    (0x20000, 0x2a6df), // Extension B
    (0x2a700, 0x2b73f), // Extension C
    (0x2b740, 0x2b81f), // Extension D
    (0x2b820, 0x2ceaf), // Extension E
    (0x2ceb0, 0x2ebef), // Extension F
    (0xf900, 0xfaff),   // Compatibility ideographs
    (0x2f800, 0x2fa1f), // Compatibility ideographs supplement
    (0xff66, 0xff9f), // Halfwidth katakana
    (0x30fb, 0x30fc), // Katakana punctuation
    (0xff61, 0xff65), // Kana punctuation
    (0x3000, 0x303f), // CJK punctuation
    (0xff10, 0xff19), // Fullwidth numbers
    (0xff21, 0xff3a), // Fullwidth upper case Latin
    (0xff41, 0xff5a), // Fullwidth lower case Latin
    (0xff01, 0xff0f), // Fullwidth punctuation 1
    (0xff1a, 0xff1f), // Fullwidth punctuation 2
    (0xff3b, 0xff3f), // Fullwidth punctuation 3
    (0xff5b, 0xff60), // Fullwidth punctuation 4
    (0xffe0, 0xffee), // Currency markers
];

#[rustfmt::skip]
static HALFWIDTH_KATAKANA_MAP: LazyLock<HashMap<char, &'static str>> = LazyLock::new(|| {
    // value = plain form, then dakuten form, then handakuten form where they exist
    HashMap::from([
        ('･', "・"),('ｦ', "ヲヺ"),('ｧ', "ァ"),('ｨ', "ィ"),('ｩ', "ゥ"),('ｪ', "ェ"),
        ('ｫ', "ォ"),('ｬ', "ャ"),('ｭ', "ュ"),('ｮ', "ョ"),('ｯ', "ッ"),('ｰ', "ー"),
        ('ｱ', "ア"),('ｲ', "イ"),('ｳ', "ウヴ"),('ｴ', "エ"),('ｵ', "オ"),('ｶ', "カガ"),
        ('ｷ', "キギ"),('ｸ', "クグ"),('ｹ', "ケゲ"),('ｺ', "コゴ"),('ｻ', "サザ"),
        ('ｼ', "シジ"),('ｽ', "スズ"),('ｾ', "セゼ"),('ｿ', "ソゾ"),('ﾀ', "タダ"),('ﾁ', "チヂ"),
        ('ﾂ', "ツヅ"),('ﾃ', "テデ"),('ﾄ', "トド"),('ﾅ', "ナ"),('ﾆ', "ニ"),('ﾇ', "ヌ"),
        ('ﾈ', "ネ"),('ﾉ', "ノ"),('ﾊ', "ハバパ"),('ﾋ', "ヒビピ"),('ﾌ', "フブプ"),
        ('ﾍ', "ヘベペ"),('ﾎ', "ホボポ"),('ﾏ', "マ"),('ﾐ', "ミ"),('ﾑ', "ム"),
        ('ﾒ', "メ"),('ﾓ', "モ"),('ﾔ', "ヤ"),('ﾕ', "ユ"),('ﾖ', "ヨ"),('ﾗ', "ラ"),
        ('ﾘ', "リ"),('ﾙ', "ル"),('ﾚ', "レ"),('ﾛ', "ロ"),('ﾜ', "ワ"),('ﾝ', "ン"),
    ])
});

#[rustfmt::skip]
static VOWEL_TO_KANA_MAPPING: LazyLock<HashMap<char, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ('a', "ぁあかがさざただなはばぱまゃやらゎわヵァアカガサザタダナハバパマャヤラヮワヵヷ"),
        ('i', "ぃいきぎしじちぢにひびぴみりゐィイキギシジチヂニヒビピミリヰヸ"),
        ('u', "ぅうくぐすずっつづぬふぶぷむゅゆるゥウクグスズッツヅヌフブプムュユルヴ"),
        ('e', "ぇえけげせぜてでねへべぺめれゑヶェエケゲセゼテデネヘベペメレヱヶヹ"),
        ('o', "ぉおこごそぞとどのほぼぽもょよろをォオコゴソゾトドノホボポモョヨロヲヺ"),
    ])
});

static KANA_TO_VOWEL_MAPPING: LazyLock<HashMap<char, char>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (&vowel, characters) in VOWEL_TO_KANA_MAPPING.iter() {
        for c in characters.chars() {
            map.insert(c, vowel);
        }
    }
    map
});

pub fn is_code_point_in_range(code_point: u32, range: CodepointRange) -> bool {
    code_point >= range.0 && code_point <= range.1
}

pub fn is_code_point_in_ranges(code_point: u32, ranges: &[CodepointRange]) -> bool {
    ranges
        .iter()
        .any(|&range| is_code_point_in_range(code_point, range))
}

pub fn is_char_kana(c: char) -> bool {
    is_code_point_in_ranges(c as u32, KANA_RANGES)
}

pub fn is_char_japanese(c: char) -> bool {
    is_code_point_in_ranges(c as u32, JAPANESE_RANGES)
}

/// Returns the leading run of Japanese characters of `text`.
pub fn japanese_only_prefix(text: &str) -> &str {
    for (byte_index, c) in text.char_indices() {
        if !is_char_japanese(c) {
            return &text[..byte_index];
        }
    }
    text
}

fn prolonged_hiragana_for(prev: char) -> Option<char> {
    match KANA_TO_VOWEL_MAPPING.get(&prev) {
        Some('a') => Some('あ'),
        Some('i') => Some('い'),
        Some('u') => Some('う'),
        Some('e') => Some('え'),
        Some('o') => Some('お'),
        _ => None,
    }
}

pub fn convert_katakana_to_hiragana(text: &str, keep_prolonged_sound_marks: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        let converted = match c {
            KATAKANA_SMALL_KA | KATAKANA_SMALL_KE => c,
            KANA_PROLONGED_SOUND_MARK if !keep_prolonged_sound_marks => result
                .chars()
                .last()
                .and_then(prolonged_hiragana_for)
                .unwrap_or(c),
            _ if is_code_point_in_range(c as u32, KATAKANA_CONVERSION_RANGE) => {
                char::from_u32(c as u32 - KATAKANA_CONVERSION_RANGE.0 + HIRAGANA_CONVERSION_RANGE.0)
                    .unwrap_or(c)
            }
            _ => c,
        };
        result.push(converted);
    }
    result
}

pub fn convert_hiragana_to_katakana(text: &str) -> String {
    text.chars()
        .map(|c| {
            if is_code_point_in_range(c as u32, HIRAGANA_CONVERSION_RANGE) {
                char::from_u32(c as u32 - HIRAGANA_CONVERSION_RANGE.0 + KATAKANA_CONVERSION_RANGE.0)
                    .unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

pub fn convert_numeric_to_fullwidth(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_digit() {
                char::from_u32(c as u32 - 0x30 + 0xff10).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// Converts half-width katakana to full width. A voicing mark following a
/// convertible character merges with it, which shortens the text; the merge
/// is recorded in `source_map` when one is supplied.
pub fn convert_halfwidth_kana_to_fullwidth(
    text: &str,
    mut source_map: Option<&mut TextSourceMap>,
) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut out_len = 0usize;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let Some(mapping) = HALFWIDTH_KATAKANA_MAP.get(&c) else {
            result.push(c);
            out_len += 1;
            i += 1;
            continue;
        };
        let index = match chars.get(i + 1).map(|&m| m as u32) {
            Some(0xff9e) => 1, // dakuten
            Some(0xff9f) => 2, // handakuten
            _ => 0,
        };
        match mapping.chars().nth(index) {
            Some(voiced) if index > 0 => {
                result.push(voiced);
                if let Some(map) = source_map.as_deref_mut() {
                    map.combine(out_len, 1);
                }
                out_len += 1;
                i += 2;
            }
            _ => {
                // No voiced form; the mark, if any, is handled on its own.
                result.push(mapping.chars().next().unwrap_or(c));
                out_len += 1;
                i += 1;
            }
        }
    }
    result
}

pub fn is_emphatic_char(c: char) -> bool {
    c == HIRAGANA_SMALL_TSU || c == KATAKANA_SMALL_TSU || c == KANA_PROLONGED_SOUND_MARK
}

/// Collapses runs of emphatic characters in the interior of `text` to a
/// single occurrence, or removes them entirely when `full_collapse` is set.
/// Leading and trailing emphatic runs are left alone.
pub fn collapse_emphatic_sequences(
    text: &str,
    full_collapse: bool,
    mut source_map: Option<&mut TextSourceMap>,
) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut left = 0;
    while left < chars.len() && is_emphatic_char(chars[left]) {
        left += 1;
    }
    let mut right = chars.len();
    while right > left && is_emphatic_char(chars[right - 1]) {
        right -= 1;
    }
    if left >= right {
        // Entirely emphatic
        return text.to_string();
    }

    let mut result: Vec<char> = chars[..left].to_vec();
    let mut current: Option<char> = None;
    for &c in &chars[left..right] {
        let keep = if is_emphatic_char(c) {
            let repeat = current == Some(c);
            current = Some(c);
            !repeat && !full_collapse
        } else {
            current = None;
            true
        };
        if keep {
            result.push(c);
        } else if let Some(map) = source_map.as_deref_mut() {
            // Attribute the dropped char to the previous kept one.
            if !result.is_empty() {
                map.combine(result.len() - 1, 1);
            }
        }
    }
    result.extend_from_slice(&chars[right..]);
    result.into_iter().collect()
}

fn dakuten_allowed(code_point: u32) -> bool {
    (0x304b..=0x3068).contains(&code_point)
        || (0x306f..=0x307b).contains(&code_point)
        || (0x30ab..=0x30c8).contains(&code_point)
        || (0x30cf..=0x30db).contains(&code_point)
}

fn handakuten_allowed(code_point: u32) -> bool {
    (0x306f..=0x307b).contains(&code_point) || (0x30cf..=0x30db).contains(&code_point)
}

/// Replaces a kana character followed by a combining voicing mark
/// (U+3099 / U+309A) with the precomposed character.
pub fn normalize_combining_characters(
    text: &str,
    mut source_map: Option<&mut TextSourceMap>,
) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut out_len = 0usize;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let combined = match chars.get(i + 1) {
            Some('\u{3099}') if dakuten_allowed(c as u32) => char::from_u32(c as u32 + 1),
            Some('\u{309a}') if handakuten_allowed(c as u32) => char::from_u32(c as u32 + 2),
            _ => None,
        };
        if let Some(combined) = combined {
            result.push(combined);
            if let Some(map) = source_map.as_deref_mut() {
                map.combine(out_len, 1);
            }
            out_len += 1;
            i += 2;
        } else {
            result.push(c);
            out_len += 1;
            i += 1;
        }
    }
    result
}

/// A span of expression text paired with its reading, or `None` when the
/// span is already phonetic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuriganaSegment {
    pub text: String,
    pub reading: Option<String>,
}

impl FuriganaSegment {
    fn new(text: String, reading: Option<String>) -> Self {
        Self { text, reading }
    }
}

#[derive(Clone, Debug)]
struct FuriganaGroup {
    is_kana: bool,
    text: Vec<char>,
    text_normalized: Vec<char>,
}

/// Segments `term` against `reading`, pairing each kanji run with the part
/// of the reading it is pronounced as. Falls back to a single fully-annotated
/// segment when no unambiguous segmentation exists.
pub fn distribute_furigana(term: &str, reading: &str) -> Vec<FuriganaSegment> {
    if reading == term || reading.is_empty() {
        return vec![FuriganaSegment::new(term.to_string(), None)];
    }

    let mut groups: Vec<FuriganaGroup> = Vec::new();
    for c in term.chars() {
        let is_kana = is_char_kana(c);
        match groups.last_mut() {
            Some(group) if group.is_kana == is_kana => group.text.push(c),
            _ => groups.push(FuriganaGroup {
                is_kana,
                text: vec![c],
                text_normalized: Vec::new(),
            }),
        }
    }
    for group in &mut groups {
        if group.is_kana {
            let text: String = group.text.iter().collect();
            group.text_normalized = convert_katakana_to_hiragana(&text, false).chars().collect();
        }
    }

    let reading_chars: Vec<char> = reading.chars().collect();
    let reading_normalized: Vec<char> = convert_katakana_to_hiragana(reading, false)
        .chars()
        .collect();
    match segmentize_furigana(&reading_chars, &reading_normalized, &groups, 0) {
        Some(segments) => segments,
        None => vec![FuriganaSegment::new(
            term.to_string(),
            Some(reading.to_string()),
        )],
    }
}

fn segmentize_furigana(
    reading: &[char],
    reading_normalized: &[char],
    groups: &[FuriganaGroup],
    index: usize,
) -> Option<Vec<FuriganaSegment>> {
    if index >= groups.len() {
        return if reading.is_empty() {
            Some(Vec::new())
        } else {
            None
        };
    }

    let group = &groups[index];
    let text_len = group.text.len();
    if group.is_kana {
        if reading_normalized.len() < text_len
            || reading_normalized[..text_len] != group.text_normalized[..]
        {
            return None;
        }
        let mut segments = segmentize_furigana(
            &reading[text_len..],
            &reading_normalized[text_len..],
            groups,
            index + 1,
        )?;
        let text: String = group.text.iter().collect();
        if reading[..text_len] == group.text[..] {
            segments.insert(0, FuriganaSegment::new(text, None));
        } else {
            let mut head = kana_furigana_segments(&group.text, &reading[..text_len]);
            head.append(&mut segments);
            segments = head;
        }
        Some(segments)
    } else {
        let mut result: Option<Vec<FuriganaSegment>> = None;
        for i in (text_len..=reading.len()).rev() {
            if let Some(mut segments) =
                segmentize_furigana(&reading[i..], &reading_normalized[i..], groups, index + 1)
            {
                if result.is_some() {
                    // More than one way to segment the tail; ambiguous
                    return None;
                }
                let text: String = group.text.iter().collect();
                let segment_reading: String = reading[..i].iter().collect();
                segments.insert(0, FuriganaSegment::new(text, Some(segment_reading)));
                result = Some(segments);

                // Only one way to segment the last group
                if groups.len() - index == 1 {
                    break;
                }
            }
        }
        result
    }
}

/// Splits a kana span into runs that match the reading verbatim and runs
/// that differ (katakana term vs hiragana reading, for example).
fn kana_furigana_segments(text: &[char], reading: &[char]) -> Vec<FuriganaSegment> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut same = text.first() == reading.first();
    for i in 1..text.len() {
        let new_same = text.get(i) == reading.get(i);
        if new_same == same {
            continue;
        }
        segments.push(kana_segment(&text[start..i], &reading[start..i], same));
        same = new_same;
        start = i;
    }
    segments.push(kana_segment(&text[start..], &reading[start..], same));
    segments
}

fn kana_segment(text: &[char], reading: &[char], same: bool) -> FuriganaSegment {
    let text: String = text.iter().collect();
    let reading = if same {
        None
    } else {
        Some(reading.iter().collect())
    };
    FuriganaSegment::new(text, reading)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn katakana_hiragana_round_trip() {
        assert_eq!(convert_katakana_to_hiragana("ヨミチャン", false), "よみちゃん");
        assert_eq!(convert_hiragana_to_katakana("よみちゃん"), "ヨミチャン");
        // Small ka/ke and non-kana pass through
        assert_eq!(convert_katakana_to_hiragana("ヵ月X", false), "ヵ月X");
    }

    #[test]
    fn prolonged_sound_mark_resolves_to_vowel() {
        assert_eq!(convert_katakana_to_hiragana("カー", false), "かあ");
        assert_eq!(convert_katakana_to_hiragana("カー", true), "かー");
    }

    #[test]
    fn numeric_fullwidth() {
        assert_eq!(convert_numeric_to_fullwidth("12時"), "１２時");
    }

    #[test]
    fn halfwidth_kana_with_voicing_mark() {
        let mut map = TextSourceMap::new("ﾖﾐﾁｬﾝｶﾞ");
        let converted = convert_halfwidth_kana_to_fullwidth("ﾖﾐﾁｬﾝｶﾞ", Some(&mut map));
        assert_eq!(converted, "ヨミチャンガ");
        // ｶ + ﾞ merged into one char consuming two source chars
        assert_eq!(map.len(), 6);
        assert_eq!(map.source_length(6), 7);
        assert_eq!(map.source_substring(5), "ﾖﾐﾁｬﾝ");
    }

    #[test]
    fn collapse_emphatic_middle_runs() {
        assert_eq!(
            collapse_emphatic_sequences("すっっごーーい", false, None),
            "すっごーい"
        );
        assert_eq!(
            collapse_emphatic_sequences("すっっごーーい", true, None),
            "すごい"
        );
        // Leading and trailing emphatics preserved
        assert_eq!(collapse_emphatic_sequences("っすごい", false, None), "っすごい");
    }

    #[test]
    fn collapse_emphatic_source_map() {
        let mut map = TextSourceMap::new("すっっごーーい");
        let collapsed = collapse_emphatic_sequences("すっっごーーい", true, Some(&mut map));
        assert_eq!(collapsed, "すごい");
        assert_eq!(map.len(), 3);
        // The full prefix "すご" covers the dropped emphatics
        assert_eq!(map.source_substring(2), "すっっごーー");
        assert_eq!(map.source_substring(3), "すっっごーーい");
    }

    #[test]
    fn combining_characters_merge() {
        let mut map = TextSourceMap::new("か\u{3099}き");
        let normalized = normalize_combining_characters("か\u{3099}き", Some(&mut map));
        assert_eq!(normalized, "がき");
        assert_eq!(map.len(), 2);
        assert_eq!(map.source_length(1), 2);
    }

    #[test]
    fn japanese_prefix_detection() {
        assert_eq!(japanese_only_prefix("食べるabc"), "食べる");
        assert_eq!(japanese_only_prefix("abc"), "");
        assert_eq!(japanese_only_prefix("００７"), "００７");
    }

    #[test]
    fn furigana_simple_split() {
        let segments = distribute_furigana("食べる", "たべる");
        assert_eq!(
            segments,
            vec![
                FuriganaSegment {
                    text: "食".to_string(),
                    reading: Some("た".to_string())
                },
                FuriganaSegment {
                    text: "べる".to_string(),
                    reading: None
                },
            ]
        );
    }

    #[test]
    fn furigana_all_kana_or_empty_reading() {
        assert_eq!(
            distribute_furigana("みる", "みる"),
            vec![FuriganaSegment {
                text: "みる".to_string(),
                reading: None
            }]
        );
        assert_eq!(
            distribute_furigana("見る", ""),
            vec![FuriganaSegment {
                text: "見る".to_string(),
                reading: None
            }]
        );
    }

    #[test]
    fn furigana_ambiguous_falls_back() {
        // Two kanji, reading cannot be attributed unambiguously
        let segments = distribute_furigana("山川", "やまかわ");
        assert_eq!(
            segments,
            vec![FuriganaSegment {
                text: "山川".to_string(),
                reading: Some("やまかわ".to_string())
            }]
        );
    }

    #[test]
    fn furigana_katakana_term_with_hiragana_reading() {
        let segments = distribute_furigana("ハム肉", "はむにく");
        assert_eq!(
            segments,
            vec![
                FuriganaSegment {
                    text: "ハム".to_string(),
                    reading: Some("はむ".to_string())
                },
                FuriganaSegment {
                    text: "肉".to_string(),
                    reading: Some("にく".to_string())
                },
            ]
        );
    }
}
