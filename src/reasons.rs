//! Built-in deinflection reasons for Japanese.
//!
//! Rule-name conventions: `rulesIn` names the class the inflected suffix
//! itself conjugates as (so chained strips stay coherent), `rulesOut` the
//! class of the recovered base. Variants with empty `rulesIn` only apply to
//! the untouched input, which carries no constraint yet.

use crate::deinflector::{ReasonVariant, ReasonsTable};

fn variant(kana_in: &str, kana_out: &str, rules_in: &[&str], rules_out: &[&str]) -> ReasonVariant {
    ReasonVariant {
        kana_in: kana_in.to_string(),
        kana_out: kana_out.to_string(),
        rules_in: rules_in.iter().map(|s| s.to_string()).collect(),
        rules_out: rules_out.iter().map(|s| s.to_string()).collect(),
    }
}

/// Godan masu-stem kana paired with the dictionary-form ending it restores.
const GODAN_STEMS: &[(&str, &str)] = &[
    ("い", "う"),
    ("き", "く"),
    ("ぎ", "ぐ"),
    ("し", "す"),
    ("ち", "つ"),
    ("に", "ぬ"),
    ("び", "ぶ"),
    ("み", "む"),
    ("り", "る"),
];

/// Builds the variants for one member of the ます family (ます, ません,
/// ました, ませんでした, ましょう): the suffix follows the masu stem of
/// every verb class.
fn polite_family(suffix: &str) -> Vec<ReasonVariant> {
    let mut variants = vec![variant(suffix, "る", &[], &["v1"])];
    for (stem, ending) in GODAN_STEMS {
        variants.push(variant(&format!("{stem}{suffix}"), ending, &[], &["v5"]));
    }
    variants.push(variant(&format!("し{suffix}"), "する", &[], &["vs"]));
    variants.push(variant(&format!("き{suffix}"), "くる", &[], &["vk"]));
    variants
}

/// Builds the variants for suffixes following the -ta/-te sound-change
/// stem: `base` is the suffix after ichidan stems (た, たら, たり, て …)
/// and `voiced` its rendaku form (だ, だら, だり, で …).
fn ta_family(base: &str, voiced: &str, rules_in: &[&str]) -> Vec<ReasonVariant> {
    vec![
        variant(base, "る", rules_in, &["v1"]),
        variant(&format!("い{base}"), "く", rules_in, &["v5"]),
        variant(&format!("い{voiced}"), "ぐ", rules_in, &["v5"]),
        variant(&format!("し{base}"), "す", rules_in, &["v5"]),
        variant(&format!("っ{base}"), "う", rules_in, &["v5"]),
        variant(&format!("っ{base}"), "つ", rules_in, &["v5"]),
        variant(&format!("っ{base}"), "る", rules_in, &["v5"]),
        variant(&format!("ん{voiced}"), "ぬ", rules_in, &["v5"]),
        variant(&format!("ん{voiced}"), "ぶ", rules_in, &["v5"]),
        variant(&format!("ん{voiced}"), "む", rules_in, &["v5"]),
        variant(&format!("し{base}"), "する", rules_in, &["vs"]),
        variant(&format!("き{base}"), "くる", rules_in, &["vk"]),
    ]
}

/// The default reasons table. Callers with their own linguistic data can
/// deserialize a [`ReasonsTable`] instead; the shapes are identical.
pub fn japanese_reasons() -> ReasonsTable {
    let mut table = ReasonsTable::new();

    table.insert("-ba".to_string(), {
        let mut v = vec![variant("ければ", "い", &[], &["adj-i"])];
        for (conditional, ending) in [
            ("えば", "う"),
            ("けば", "く"),
            ("げば", "ぐ"),
            ("せば", "す"),
            ("てば", "つ"),
            ("ねば", "ぬ"),
            ("べば", "ぶ"),
            ("めば", "む"),
        ] {
            v.push(variant(conditional, ending, &[], &["v5"]));
        }
        v.push(variant("れば", "る", &[], &["v1", "v5", "vk", "vs"]));
        v
    });

    table.insert("past".to_string(), {
        let mut v = ta_family("た", "だ", &[]);
        v.push(variant("かった", "い", &[], &["adj-i"]));
        v
    });

    table.insert("-tara".to_string(), ta_family("たら", "だら", &[]));
    table.insert("-tari".to_string(), ta_family("たり", "だり", &[]));

    // -te forms conjugate onward through the iru contraction, so every
    // variant accepts the iru mask.
    table.insert("-te".to_string(), {
        let mut v = ta_family("て", "で", &["iru"]);
        v.push(variant("くて", "い", &["iru"], &["adj-i"]));
        v
    });

    table.insert(
        "progressive or perfect".to_string(),
        vec![
            variant("ている", "て", &["v1"], &["iru"]),
            variant("でいる", "で", &["v1"], &["iru"]),
            variant("てる", "て", &["v1"], &["iru"]),
            variant("でる", "で", &["v1"], &["iru"]),
        ],
    );

    table.insert("polite".to_string(), polite_family("ます"));
    table.insert("polite negative".to_string(), polite_family("ません"));
    table.insert("polite past".to_string(), polite_family("ました"));
    table.insert(
        "polite past negative".to_string(),
        polite_family("ませんでした"),
    );
    table.insert("polite volitional".to_string(), polite_family("ましょう"));

    table.insert("negative".to_string(), {
        let mut v = vec![
            variant("ない", "る", &["adj-i"], &["v1"]),
            variant("くない", "い", &["adj-i"], &["adj-i"]),
        ];
        for (negative, ending) in [
            ("かない", "く"),
            ("がない", "ぐ"),
            ("さない", "す"),
            ("たない", "つ"),
            ("なない", "ぬ"),
            ("ばない", "ぶ"),
            ("まない", "む"),
            ("らない", "る"),
            ("わない", "う"),
        ] {
            v.push(variant(negative, ending, &["adj-i"], &["v5"]));
        }
        v.push(variant("しない", "する", &["adj-i"], &["vs"]));
        v.push(variant("こない", "くる", &["adj-i"], &["vk"]));
        v
    });

    table.insert("causative".to_string(), {
        let mut v = Vec::new();
        for (causative, ending) in [
            ("かせる", "く"),
            ("がせる", "ぐ"),
            ("たせる", "つ"),
            ("なせる", "ぬ"),
            ("ばせる", "ぶ"),
            ("ませる", "む"),
            ("わせる", "う"),
        ] {
            v.push(variant(causative, ending, &["v1"], &["v5"]));
        }
        v.push(variant("らせる", "る", &["v1"], &["v5"]));
        v.push(variant("させる", "る", &["v1"], &["v1"]));
        v.push(variant("させる", "する", &["v1"], &["vs"]));
        v.push(variant("こさせる", "くる", &["v1"], &["vk"]));
        v
    });

    table.insert("passive".to_string(), {
        let mut v = Vec::new();
        for (passive, ending) in [
            ("かれる", "く"),
            ("がれる", "ぐ"),
            ("たれる", "つ"),
            ("なれる", "ぬ"),
            ("ばれる", "ぶ"),
            ("まれる", "む"),
            ("われる", "う"),
        ] {
            v.push(variant(passive, ending, &["v1"], &["v5"]));
        }
        v.push(variant("られる", "る", &["v1"], &["v5"]));
        v.push(variant("される", "する", &["v1"], &["vs"]));
        v
    });

    table.insert(
        "potential or passive".to_string(),
        vec![
            variant("られる", "る", &["v1"], &["v1"]),
            variant("こられる", "くる", &["v1"], &["vk"]),
        ],
    );

    table.insert("potential".to_string(), {
        let mut v = Vec::new();
        for (potential, ending) in [
            ("える", "う"),
            ("ける", "く"),
            ("げる", "ぐ"),
            ("せる", "す"),
            ("てる", "つ"),
            ("ねる", "ぬ"),
            ("べる", "ぶ"),
            ("める", "む"),
        ] {
            v.push(variant(potential, ending, &["v1"], &["v5"]));
        }
        v.push(variant("れる", "る", &["v1"], &["v1", "v5"]));
        v.push(variant("できる", "する", &["v1"], &["vs"]));
        v
    });

    table.insert("volitional".to_string(), {
        let mut v = vec![variant("よう", "る", &[], &["v1"])];
        for (volitional, ending) in [
            ("おう", "う"),
            ("こう", "く"),
            ("ごう", "ぐ"),
            ("そう", "す"),
            ("とう", "つ"),
            ("のう", "ぬ"),
            ("ぼう", "ぶ"),
            ("もう", "む"),
            ("ろう", "る"),
        ] {
            v.push(variant(volitional, ending, &[], &["v5"]));
        }
        v.push(variant("しよう", "する", &[], &["vs"]));
        v.push(variant("こよう", "くる", &[], &["vk"]));
        v
    });

    table.insert("imperative".to_string(), {
        let mut v = vec![
            variant("ろ", "る", &[], &["v1"]),
            variant("よ", "る", &[], &["v1"]),
        ];
        for (imperative, ending) in [
            ("え", "う"),
            ("け", "く"),
            ("げ", "ぐ"),
            ("せ", "す"),
            ("て", "つ"),
            ("ね", "ぬ"),
            ("べ", "ぶ"),
            ("め", "む"),
        ] {
            v.push(variant(imperative, ending, &[], &["v5"]));
        }
        v.push(variant("れ", "る", &[], &["v5"]));
        v.push(variant("しろ", "する", &[], &["vs"]));
        v.push(variant("せよ", "する", &[], &["vs"]));
        v.push(variant("こい", "くる", &[], &["vk"]));
        v
    });

    table.insert(
        "imperative negative".to_string(),
        vec![variant(
            "な",
            "",
            &[],
            &["v1", "v5", "vk", "vs"],
        )],
    );

    table.insert("-tai".to_string(), {
        let mut v = vec![variant("たい", "る", &["adj-i"], &["v1"])];
        for (stem, ending) in GODAN_STEMS {
            v.push(variant(&format!("{stem}たい"), ending, &["adj-i"], &["v5"]));
        }
        v.push(variant("したい", "する", &["adj-i"], &["vs"]));
        v.push(variant("きたい", "くる", &["adj-i"], &["vk"]));
        v
    });

    table.insert("adv".to_string(), vec![variant("く", "い", &[], &["adj-i"])]);
    table.insert("noun".to_string(), vec![variant("さ", "い", &[], &["adj-i"])]);

    table.insert("masu stem".to_string(), {
        let mut v = Vec::new();
        for (stem, ending) in GODAN_STEMS {
            v.push(variant(stem, ending, &[], &["v5"]));
        }
        for stem in [
            "い", "え", "き", "ぎ", "け", "げ", "し", "じ", "せ", "ぜ", "ち", "て", "に", "ね",
            "ひ", "び", "べ", "み", "め", "り", "れ",
        ] {
            v.push(variant(stem, &format!("{stem}る"), &[], &["v1"]));
        }
        v
    });

    table
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::japanese_reasons;
    use crate::deinflector::Deinflector;

    fn terms_for(input: &str) -> Vec<(String, Vec<String>)> {
        let deinflector = Deinflector::new(&japanese_reasons());
        deinflector
            .deinflect(input, input)
            .into_iter()
            .map(|d| (d.term, d.reasons))
            .collect()
    }

    fn assert_reaches(input: &str, base: &str, reasons: &[&str]) {
        let expected: Vec<String> = reasons.iter().map(|s| s.to_string()).collect();
        let candidates = terms_for(input);
        assert!(
            candidates
                .iter()
                .any(|(term, chain)| term == base && *chain == expected),
            "{input} did not reach {base} via {reasons:?}; got {candidates:?}"
        );
    }

    #[test]
    fn single_step_inflections() {
        assert_reaches("食べた", "食べる", &["past"]);
        assert_reaches("飲んだ", "飲む", &["past"]);
        assert_reaches("行きます", "行く", &["polite"]);
        assert_reaches("高くない", "高い", &["negative"]);
        assert_reaches("見れば", "見る", &["-ba"]);
        assert_reaches("しました", "する", &["polite past"]);
    }

    #[test]
    fn chained_inflections_innermost_last() {
        // causative + passive + past, reported most recent first
        assert_reaches(
            "食べさせられた",
            "食べる",
            &["causative", "potential or passive", "past"],
        );
        assert_reaches("読んでいた", "読む", &["-te", "progressive or perfect", "past"]);
        assert_reaches("食べたくなかった", "食べる", &["-tai", "negative", "past"]);
    }

    #[test]
    fn closure_terminates_on_real_table() {
        let deinflector = Deinflector::new(&japanese_reasons());
        for input in ["させられませんでした", "すっごーい", "ググった", "ん"] {
            let results = deinflector.deinflect(input, input);
            assert!(!results.is_empty());
            assert!(results.len() < 4096, "unexpected blowup for {input}");
        }
        assert_eq!(deinflector.deinflect("", "").len(), 1);
    }
}
