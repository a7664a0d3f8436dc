use wana_kana::ConvertJapanese;

use crate::text_source_map::TextSourceMap;

/// Converts a run of romaji to hiragana.
pub fn convert_alphabetic_part_to_kana(text: &str) -> String {
    text.to_hiragana()
}

/// Converts every alphabetic run of `text` to kana, leaving other
/// characters in place. Full-width and upper-case Latin letters are
/// normalized first. Since romaji syllables span several characters, the
/// conversion is N:1 and is recorded in `source_map` when one is supplied.
pub fn convert_alphabetic_to_kana(text: &str, mut source_map: Option<&mut TextSourceMap>) -> String {
    let mut part: Vec<char> = Vec::new();
    let mut result = String::new();
    let mut result_len = 0usize;

    for c in text.chars() {
        match normalize_latin(c) {
            Some(n) => part.push(n),
            None => {
                if !part.is_empty() {
                    result_len +=
                        convert_part(&part, &mut result, source_map.as_deref_mut(), result_len);
                    part.clear();
                }
                result.push(c);
                result_len += 1;
            }
        }
    }
    if !part.is_empty() {
        convert_part(&part, &mut result, source_map.as_deref_mut(), result_len);
    }
    result
}

/// Lower-cases and narrows Latin letters; `None` for anything that is not
/// part of a romaji run.
fn normalize_latin(c: char) -> Option<char> {
    let code = c as u32;
    match code {
        0x41..=0x5a => char::from_u32(code - 0x41 + 0x61),
        0x61..=0x7a => Some(c),
        0xff21..=0xff3a => char::from_u32(code - 0xff21 + 0x61),
        0xff41..=0xff5a => char::from_u32(code - 0xff41 + 0x61),
        0x2d | 0xff0d => Some('-'),
        _ => None,
    }
}

/// Converts one romaji run and distributes the run's characters over the
/// produced kana: for each kana prefix, the smallest romaji prefix that
/// converts to it determines how many source characters it consumed.
fn convert_part(
    part: &[char],
    out: &mut String,
    source_map: Option<&mut TextSourceMap>,
    dest_start: usize,
) -> usize {
    let part_str: String = part.iter().collect();
    let converted = part_str.to_hiragana();
    let converted_chars: Vec<char> = converted.chars().collect();

    if let Some(map) = source_map {
        let mut i = 0;
        let mut result_pos = 0;
        let mut dest = dest_start;
        while i < part.len() {
            let mut i_next = i + 1;
            let mut result_pos_next = converted_chars.len();
            while i_next < part.len() {
                let prefix: String = part[..i_next].iter().collect();
                let prefix_kana: Vec<char> = prefix.to_hiragana().chars().collect();
                if prefix_kana.len() <= converted_chars.len()
                    && prefix_kana[..] == converted_chars[..prefix_kana.len()]
                {
                    result_pos_next = prefix_kana.len();
                    break;
                }
                i_next += 1;
            }
            let removals = i_next - i - 1;
            if removals > 0 {
                map.combine(dest, removals);
            }
            dest += 1;
            let additions = result_pos_next.saturating_sub(result_pos + 1);
            for _ in 0..additions {
                map.insert_empty(dest);
                dest += 1;
            }
            i = i_next;
            result_pos = result_pos_next;
        }
    }

    out.push_str(&converted);
    converted_chars.len()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn plain_conversion() {
        assert_eq!(convert_alphabetic_to_kana("neko", None), "ねこ");
        assert_eq!(convert_alphabetic_to_kana("ＮＥＫＯ", None), "ねこ");
    }

    #[test]
    fn mixed_text_keeps_non_latin() {
        assert_eq!(convert_alphabetic_to_kana("猫taberu", None), "猫たべる");
    }

    #[test]
    fn source_map_tracks_syllables() {
        let mut map = TextSourceMap::new("ka");
        let converted = convert_alphabetic_to_kana("ka", Some(&mut map));
        assert_eq!(converted, "か");
        assert_eq!(map.len(), 1);
        assert_eq!(map.source_substring(1), "ka");
    }

    #[test]
    fn source_map_multi_syllable() {
        let mut map = TextSourceMap::new("miru");
        let converted = convert_alphabetic_to_kana("miru", Some(&mut map));
        assert_eq!(converted, "みる");
        assert_eq!(map.len(), 2);
        assert_eq!(map.source_substring(1), "mi");
        assert_eq!(map.source_substring(2), "miru");
    }

    #[test]
    fn source_map_with_surrounding_text() {
        let mut map = TextSourceMap::new("猫ga");
        let converted = convert_alphabetic_to_kana("猫ga", Some(&mut map));
        assert_eq!(converted, "猫が");
        assert_eq!(map.len(), 2);
        assert_eq!(map.source_substring(1), "猫");
        assert_eq!(map.source_substring(2), "猫ga");
    }
}
