//! Fingerprint-based deduplication and variant consolidation.
//!
//! Items sharing one base key (identity text with variant attributes
//! stripped) form a group; within a group, distinct variant keys become
//! variant rows and identical variant keys collapse onto the most
//! complete member. SKUs and prices of every member survive on the
//! consolidated record.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::knowledge::VariantPattern;
use crate::text::{contains_arabic, fingerprint, normalize_item, Tokenizer};
use crate::types::{GroupedRecord, NormalizedItem, PriceRange, VariantRecord};

// Completeness weights for representative election.
const WEIGHT_SKU: u32 = 3;
const WEIGHT_BRAND: u32 = 2;
const WEIGHT_MODEL: u32 = 2;
const WEIGHT_PRICE: u32 = 2;
const WEIGHT_MINOR_FIELD: u32 = 1;

/// Group identity with every variant attribute stripped out.
///
/// Concatenates the normalized sku, brand and name, removes each
/// configured variant pattern, then fingerprints, so word order and
/// variant attributes never split a group.
pub fn base_key(item: &NormalizedItem, patterns: &[VariantPattern]) -> String {
    let mut combined = identity_text(item);
    for pattern in patterns {
        combined = pattern.strip(&combined);
    }
    fingerprint(&combined)
}

/// Variant attributes extracted from the identity text, as sorted
/// `label:value` tokens.
pub fn variant_tokens(item: &NormalizedItem, patterns: &[VariantPattern]) -> Vec<String> {
    let combined = identity_text(item);
    let mut tokens: Vec<String> = patterns
        .iter()
        .filter_map(|pattern| pattern.extract(&combined))
        .collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens
}

/// Fine-grained identity: the base key extended with variant tokens.
/// Two items with equal variant keys are exact duplicates.
pub fn variant_key(item: &NormalizedItem, patterns: &[VariantPattern]) -> String {
    let base = base_key(item, patterns);
    let tokens = variant_tokens(item, patterns);
    if tokens.is_empty() {
        return base;
    }
    format!("{base}|{}", tokens.join("|"))
}

/// Weighted count of populated fields; higher means a better group
/// representative.
pub fn completeness(item: &NormalizedItem) -> u32 {
    let raw = &item.item;
    let mut score = 0;
    if present(&raw.sku) {
        score += WEIGHT_SKU;
    }
    if present(&raw.brand) {
        score += WEIGHT_BRAND;
    }
    if present(&raw.model) {
        score += WEIGHT_MODEL;
    }
    if raw.price.is_some() {
        score += WEIGHT_PRICE;
    }
    for field in [
        &raw.description,
        &raw.category,
        &raw.manufacturer,
        &raw.supplier,
        &raw.country,
        &raw.region,
        &raw.item_type,
    ] {
        if present(field) {
            score += WEIGHT_MINOR_FIELD;
        }
    }
    score
}

/// Group the full input set into consolidated records.
///
/// Output order follows the first appearance of each base key; every
/// input item lands in exactly one record's `member_ids`, so the member
/// counts across all records always sum to the input length.
pub fn group_items(
    items: &[NormalizedItem],
    patterns: &[VariantPattern],
    tokenizer: &Tokenizer,
) -> Vec<GroupedRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, item) in items.iter().enumerate() {
        let key = base_key(item, patterns);
        let members = groups.entry(key.clone()).or_default();
        if members.is_empty() {
            order.push(key);
        }
        members.push(index);
    }

    order
        .into_iter()
        .map(|key| {
            let members = &groups[&key];
            consolidate(key, members, items, patterns, tokenizer)
        })
        .collect()
}

/// Build one consolidated record from a base-key group.
fn consolidate(
    base_key: String,
    members: &[usize],
    items: &[NormalizedItem],
    patterns: &[VariantPattern],
    tokenizer: &Tokenizer,
) -> GroupedRecord {
    // Variant subgroups, first-seen order.
    let mut variant_order: Vec<String> = Vec::new();
    let mut subgroups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for &index in members {
        let key = variant_key(&items[index], patterns);
        let subgroup = subgroups.entry(key.clone()).or_default();
        if subgroup.is_empty() {
            variant_order.push(key);
        }
        subgroup.push(index);
    }

    let variants: Vec<VariantRecord> = variant_order
        .iter()
        .map(|key| {
            let subgroup = &subgroups[key];
            let representative = elect_representative(subgroup, items);
            let item = &items[representative];
            VariantRecord {
                item_id: item.item.id.clone(),
                name: item.item.name.clone(),
                variant_tokens: variant_tokens(item, patterns),
                sku: first_sku(subgroup, items),
                price: first_price(subgroup, items),
            }
        })
        .collect();

    let base_index = elect_representative(members, items);
    let base = consolidated_base(base_index, members, items, tokenizer);

    let mut skus: Vec<String> = Vec::new();
    for &index in members {
        if let Some(sku) = items[index].item.sku.as_deref() {
            let sku = sku.trim();
            if !sku.is_empty() && !skus.iter().any(|existing| existing == sku) {
                skus.push(sku.to_string());
            }
        }
    }
    skus.sort_unstable();

    let price_range = members
        .iter()
        .filter_map(|&index| items[index].item.price)
        .fold(None, |range: Option<PriceRange>, price| {
            Some(match range {
                None => PriceRange {
                    min: price,
                    max: price,
                },
                Some(current) => PriceRange {
                    min: current.min.min(price),
                    max: current.max.max(price),
                },
            })
        });

    GroupedRecord {
        group_id: stable_group_id(&base_key),
        base_key,
        base,
        variants,
        skus,
        price_range,
        member_ids: members.iter().map(|&index| items[index].item.id.clone()).collect(),
    }
}

/// Most complete member wins; ties prefer a non-Arabic display name,
/// then the lexicographically smaller id.
fn elect_representative(members: &[usize], items: &[NormalizedItem]) -> usize {
    members
        .iter()
        .copied()
        .min_by_key(|&index| {
            let item = &items[index];
            (
                Reverse(completeness(item)),
                contains_arabic(&item.item.name),
                item.item.id.as_str(),
            )
        })
        .unwrap_or(0)
}

/// The elected base, with differing member descriptions concatenated
/// instead of dropped.
fn consolidated_base(
    base_index: usize,
    members: &[usize],
    items: &[NormalizedItem],
    tokenizer: &Tokenizer,
) -> NormalizedItem {
    let base = &items[base_index];

    let mut descriptions: Vec<&str> = Vec::new();
    for &index in members {
        if let Some(description) = items[index].item.description.as_deref() {
            let description = description.trim();
            if !description.is_empty() && !descriptions.contains(&description) {
                descriptions.push(description);
            }
        }
    }
    if descriptions.len() <= 1 {
        return base.clone();
    }

    let mut merged = base.item.clone();
    merged.description = Some(descriptions.join("; "));
    normalize_item(&merged, tokenizer)
}

/// Deterministic id derived from the base key, first 32 hex chars of the
/// blake3 digest.
fn stable_group_id(base_key: &str) -> String {
    blake3::hash(base_key.as_bytes()).to_hex()[..32].to_string()
}

fn identity_text(item: &NormalizedItem) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    for part in [
        item.normalized_sku.as_str(),
        item.normalized_brand.as_str(),
        item.normalized_name.as_str(),
    ] {
        if !part.is_empty() {
            parts.push(part);
        }
    }
    parts.join(" ")
}

fn first_sku(members: &[usize], items: &[NormalizedItem]) -> Option<String> {
    members.iter().find_map(|&index| {
        items[index]
            .item
            .sku
            .as_deref()
            .map(str::trim)
            .filter(|sku| !sku.is_empty())
            .map(str::to_string)
    })
}

fn first_price(members: &[usize], items: &[NormalizedItem]) -> Option<f64> {
    members.iter().find_map(|&index| items[index].item.price)
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|value| !value.trim().is_empty())
}

#[cfg(test)]
#[path = "tests/dedupe_tests.rs"]
mod tests;
