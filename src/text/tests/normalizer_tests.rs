use super::*;

#[test]
fn test_normalize_strips_diacritics_and_tatweel() {
    // Fully vocalized "chair" reduces to its bare letters.
    assert_eq!(normalize("كُرْسِيّ"), "كرسي");
    // Tatweel elongation disappears.
    assert_eq!(normalize("جهــــاز"), "جهاز");
}

#[test]
fn test_normalize_folds_hamza_variants() {
    // Alef hamza above, alef hamza below, alef madda all fold to bare alef.
    assert_eq!(normalize("أجهزة"), "اجهزه");
    assert_eq!(normalize("إبرة"), "ابره");
    assert_eq!(normalize("آلة"), "اله");
    // Hamza on waw and yeh fold to the carrier.
    assert_eq!(normalize("مؤقت"), "موقت");
    assert_eq!(normalize("طوارئ"), "طواري");
}

#[test]
fn test_normalize_folds_teh_marbuta_and_alef_maksura() {
    assert_eq!(normalize("حقنة"), "حقنه");
    assert_eq!(normalize("مستشفى"), "مستشفي");
}

#[test]
fn test_normalize_converts_arabic_indic_digits() {
    assert_eq!(normalize("مقاس ٥٠"), "مقاس 50");
    assert_eq!(normalize("۱۲۳"), "123");
    assert_eq!(normalize("٠٩"), "09");
}

#[test]
fn test_normalize_lowercases_and_strips_punctuation() {
    assert_eq!(normalize("X-Ray Machine (Portable)"), "x ray machine portable");
    assert_eq!(normalize("B.P. Monitor, Digital!"), "b p monitor digital");
}

#[test]
fn test_normalize_collapses_whitespace() {
    assert_eq!(normalize("  infusion \t pump \n stand  "), "infusion pump stand");
}

#[test]
fn test_normalize_keeps_mixed_script_text() {
    assert_eq!(normalize("جهاز ECG محمول"), "جهاز ecg محمول");
}

#[test]
fn test_normalize_is_idempotent() {
    let samples = [
        "أَجْهِزَة طِبِّيَّة",
        "X-Ray (Portable) مقاس ٥٠",
        "  Wheelchair,   Manual  ",
    ];
    for sample in samples {
        let once = normalize(sample);
        assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
    }
}

#[test]
fn test_fingerprint_is_word_order_invariant() {
    let a = fingerprint("Manual Wheelchair");
    let b = fingerprint("Wheelchair, Manual");
    assert_eq!(a, b);
    assert_eq!(a, "manual wheelchair");
}

#[test]
fn test_fingerprint_collapses_repeated_tokens() {
    assert_eq!(fingerprint("pump pump infusion"), "infusion pump");
}

#[test]
fn test_fingerprint_arabic_and_folded_forms_agree() {
    // Unfolded and folded spellings of the same name share one key.
    assert_eq!(fingerprint("أجهزة أشعة"), fingerprint("اجهزه اشعه"));
}

#[test]
fn test_contains_arabic() {
    assert!(contains_arabic("ضغط الدم"));
    assert!(contains_arabic("جهاز ECG"));
    assert!(!contains_arabic("blood pressure 120"));
}

#[test]
fn test_normalize_item_fills_every_field() {
    let mut item = CatalogItem::new("n1", "Infusion Pump (Double-Channel)");
    item.brand = Some("B.Braun".to_string());
    item.description = Some("جهاز ضخ المحاليل".to_string());

    let normalized = normalize_item(&item, &Tokenizer::new());

    assert_eq!(normalized.normalized_name, "infusion pump double channel");
    assert_eq!(normalized.normalized_brand, "b braun");
    assert_eq!(normalized.normalized_description, "جهاز ضخ المحاليل");
    // Missing optionals come through as empty strings, not panics.
    assert_eq!(normalized.normalized_model, "");
    assert_eq!(normalized.fingerprint, "channel double infusion pump");
    // Tokens span name, brand and description.
    assert!(normalized.tokens.contains(&"infusion".to_string()));
    assert!(normalized.tokens.contains(&"braun".to_string()));
    assert!(normalized.tokens.contains(&"جهاز".to_string()));
}
