use super::*;

fn normalized_fixture(id: &str, name: &str) -> NormalizedItem {
    NormalizedItem {
        item: CatalogItem::new(id, name),
        normalized_name: name.to_lowercase(),
        normalized_brand: String::new(),
        normalized_model: String::new(),
        normalized_description: String::new(),
        normalized_category: String::new(),
        normalized_sku: String::new(),
        tokens: name.to_lowercase().split_whitespace().map(String::from).collect(),
        fingerprint: {
            let mut t: Vec<&str> = name.split_whitespace().collect();
            t.sort_unstable();
            t.join(" ").to_lowercase()
        },
    }
}

fn processed_fixture(id: &str, name: &str, score: f32) -> ProcessedItem {
    ProcessedItem {
        scored: ScoredItem {
            item: normalized_fixture(id, name),
            score,
            breakdown: ScoreBreakdown {
                base: score,
                ..Default::default()
            },
            matched_terms: vec![],
            negative_terms: vec![],
            blocked_by_gate: None,
            relevant: None,
            notes: vec![],
        },
        status: DecisionStatus::Review,
        threshold: 60.0,
        reason: format!("score {score:.1} below threshold 60.0"),
        group_id: None,
        variant_count: 1,
    }
}

#[test]
fn test_catalog_item_new_defaults_optionals() {
    let item = CatalogItem::new("a1", "Wheelchair");
    assert_eq!(item.id, "a1");
    assert_eq!(item.name, "Wheelchair");
    assert!(item.brand.is_none());
    assert!(item.price.is_none());
    assert!(item.domain_code.is_none());
}

#[test]
fn test_catalog_item_camel_case_wire_format() {
    let mut item = CatalogItem::new("a1", "Pulse Oximeter");
    item.item_type = Some("device".to_string());
    item.domain_code = Some("33100".to_string());

    let json = serde_json::to_value(&item).unwrap();
    assert!(json.get("itemType").is_some());
    assert!(json.get("domainCode").is_some());
    assert!(json.get("item_type").is_none());
}

#[test]
fn test_catalog_item_deserializes_with_missing_optionals() {
    let item: CatalogItem =
        serde_json::from_str(r#"{"id":"x","name":"ECG Machine"}"#).unwrap();
    assert_eq!(item.name, "ECG Machine");
    assert!(item.sku.is_none());
}

#[test]
fn test_combined_text_skips_empty_fields() {
    let mut norm = normalized_fixture("a1", "infusion pump");
    norm.normalized_brand = "braun".to_string();
    assert_eq!(norm.combined_text(), "infusion pump braun");

    let bare = normalized_fixture("a2", "defibrillator");
    assert_eq!(bare.combined_text(), "defibrillator");
}

#[test]
fn test_score_breakdown_sum_includes_all_components() {
    let breakdown = ScoreBreakdown {
        base: 40.0,
        name_match: 12.0,
        exact_bonus: 10.0,
        diagnostic_penalty: -5.0,
        token_index: 8.0,
        ..Default::default()
    };
    assert!((breakdown.sum() - 65.0).abs() < f32::EPSILON);
}

#[test]
fn test_decision_status_display_and_wire_format() {
    assert_eq!(DecisionStatus::Accepted.to_string(), "accepted");
    assert_eq!(DecisionStatus::Review.to_string(), "review");
    assert_eq!(DecisionStatus::Rejected.to_string(), "rejected");

    let json = serde_json::to_string(&DecisionStatus::Rejected).unwrap();
    assert_eq!(json, "\"rejected\"");
}

#[test]
fn test_sort_processed_deterministic_orders_by_score_then_name_then_id() {
    let mut items = vec![
        processed_fixture("c", "zeta monitor", 50.0),
        processed_fixture("a", "alpha monitor", 80.0),
        processed_fixture("b", "beta monitor", 50.0),
        processed_fixture("d", "beta monitor", 50.0),
    ];
    sort_processed_deterministic(&mut items);

    let ids: Vec<&str> = items.iter().map(|p| p.id()).collect();
    // 80 first, then the 50s by name asc, ties broken by id asc.
    assert_eq!(ids, vec!["a", "b", "d", "c"]);
}

#[test]
fn test_cap_term_hits_truncates_preserving_order() {
    let mut hits: Vec<TermHit> = (0..40)
        .map(|i| TermHit {
            term: format!("term{i}"),
            canonical: None,
            field: FieldKind::Name,
            strategy: MatchStrategy::Exact,
            confidence: 1.0,
            contribution: 1.0,
        })
        .collect();
    cap_term_hits(&mut hits);
    assert_eq!(hits.len(), MAX_TERM_HITS);
    assert_eq!(hits[0].term, "term0");
}

#[test]
fn test_grouped_record_counts() {
    let base = normalized_fixture("g1", "surgical glove");
    let record = GroupedRecord {
        group_id: "grp_x".to_string(),
        base_key: "glove surgical".to_string(),
        base,
        variants: vec![
            VariantRecord {
                item_id: "g1".to_string(),
                name: "surgical glove large".to_string(),
                variant_tokens: vec!["size:large".to_string()],
                sku: Some("SG-L".to_string()),
                price: Some(10.0),
            },
            VariantRecord {
                item_id: "g2".to_string(),
                name: "surgical glove small".to_string(),
                variant_tokens: vec!["size:small".to_string()],
                sku: Some("SG-S".to_string()),
                price: Some(9.0),
            },
        ],
        skus: vec!["SG-L".to_string(), "SG-S".to_string()],
        price_range: Some(PriceRange { min: 9.0, max: 10.0 }),
        member_ids: vec!["g1".to_string(), "g2".to_string(), "g3".to_string()],
    };

    assert_eq!(record.variant_count(), 2);
    // Exact duplicates are absorbed into member_ids without a variant row.
    assert_eq!(record.member_count(), 3);
}

#[test]
fn test_term_hit_skips_none_canonical_on_wire() {
    let hit = TermHit {
        term: "ecg".to_string(),
        canonical: None,
        field: FieldKind::Description,
        strategy: MatchStrategy::Substring,
        confidence: 0.9,
        contribution: 4.5,
    };
    let json = serde_json::to_value(&hit).unwrap();
    assert!(json.get("canonical").is_none());
    assert_eq!(json["strategy"], "substring");
    assert_eq!(json["field"], "description");
}
