use crate::{
    language::ja::{
        japanese::{
            collapse_emphatic_sequences, convert_halfwidth_kana_to_fullwidth,
            convert_hiragana_to_katakana, convert_katakana_to_hiragana,
            convert_numeric_to_fullwidth, normalize_combining_characters,
        },
        wanakana::convert_alphabetic_to_kana,
    },
    text_source_map::TextSourceMap,
    translation::TextConversionOptions,
};

/// One orthographic rendition of the lookup text, with the offset map that
/// translates its positions back to the caller's original text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextVariant {
    pub text: String,
    pub source_map: TextSourceMap,
}

/// Produces the cross product of enabled normalizations, applied in a
/// fixed order per combination. Every variant keeps its own source map
/// since length-changing conversions differ between combinations.
pub fn expand_text_variants(text: &str, options: &TextConversionOptions) -> Vec<TextVariant> {
    let mut variants = Vec::new();
    for &combining in options.normalize_combining_characters.variants() {
        for &half_width in options.convert_half_width_characters.variants() {
            for &numeric in options.convert_numeric_characters.variants() {
                for &alphabetic in options.convert_alphabetic_characters.variants() {
                    for &katakana in options.convert_katakana_to_hiragana.variants() {
                        for &hiragana in options.convert_hiragana_to_katakana.variants() {
                            for &(collapse, collapse_full) in
                                options.collapse_emphatic_sequences.variants()
                            {
                                let mut source_map = TextSourceMap::new(text);
                                let mut text2 = text.to_string();
                                if combining {
                                    text2 = normalize_combining_characters(
                                        &text2,
                                        Some(&mut source_map),
                                    );
                                }
                                if half_width {
                                    text2 = convert_halfwidth_kana_to_fullwidth(
                                        &text2,
                                        Some(&mut source_map),
                                    );
                                }
                                if numeric {
                                    text2 = convert_numeric_to_fullwidth(&text2);
                                }
                                if alphabetic {
                                    text2 =
                                        convert_alphabetic_to_kana(&text2, Some(&mut source_map));
                                }
                                if katakana {
                                    text2 = convert_katakana_to_hiragana(&text2, false);
                                }
                                if hiragana {
                                    text2 = convert_hiragana_to_katakana(&text2);
                                }
                                if collapse {
                                    text2 = collapse_emphatic_sequences(
                                        &text2,
                                        collapse_full,
                                        Some(&mut source_map),
                                    );
                                }
                                variants.push(TextVariant { text: text2, source_map });
                            }
                        }
                    }
                }
            }
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::translation::{
        TranslationCollapseEmphaticSequences, TranslationConvertType,
    };

    #[test]
    fn no_conversions_yields_identity_variant() {
        let variants = expand_text_variants("食べた", &TextConversionOptions::default());
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].text, "食べた");
        assert_eq!(variants[0].source_map.source_substring(2), "食べ");
    }

    #[test]
    fn variant_toggle_doubles_combinations() {
        let options = TextConversionOptions {
            convert_katakana_to_hiragana: TranslationConvertType::Variant,
            convert_hiragana_to_katakana: TranslationConvertType::Variant,
            ..Default::default()
        };
        let variants = expand_text_variants("ミル", &options);
        assert_eq!(variants.len(), 4);
        let texts: Vec<&str> = variants.iter().map(|v| v.text.as_str()).collect();
        assert!(texts.contains(&"ミル"));
        assert!(texts.contains(&"みる"));
    }

    #[test]
    fn emphatic_options_are_additive() {
        let options = TextConversionOptions {
            collapse_emphatic_sequences: TranslationCollapseEmphaticSequences::Full,
            ..Default::default()
        };
        let variants = expand_text_variants("すっっごーーい", &options);
        let texts: Vec<&str> = variants.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec!["すっっごーーい", "すっごーい", "すごい"]);
    }

    #[test]
    fn conversions_compose_with_offset_tracking() {
        let options = TextConversionOptions {
            convert_half_width_characters: TranslationConvertType::True,
            convert_katakana_to_hiragana: TranslationConvertType::True,
            ..Default::default()
        };
        let variants = expand_text_variants("ｶﾞﾗｽ", &options);
        assert_eq!(variants.len(), 1);
        // half width ｶﾞ merges first, katakana converts downstream
        assert_eq!(variants[0].text, "がらす");
        assert_eq!(variants[0].source_map.source_substring(1), "ｶﾞ");
        assert_eq!(variants[0].source_map.source_substring(3), "ｶﾞﾗｽ");
    }

    #[test]
    fn alphabetic_conversion_keeps_prefix_mapping() {
        let options = TextConversionOptions {
            convert_alphabetic_characters: TranslationConvertType::True,
            ..Default::default()
        };
        let variants = expand_text_variants("taberu", &options);
        assert_eq!(variants[0].text, "たべる");
        assert_eq!(variants[0].source_map.source_substring(2), "tabe");
        assert_eq!(variants[0].source_map.source_substring(3), "taberu");
    }
}
