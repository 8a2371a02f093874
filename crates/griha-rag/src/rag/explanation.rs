//! Explanation record builder.
//!
//! An explanation record is a fixed-template textual projection of one
//! property row plus a rationale sentence. It is the only form in which row
//! data may reach the generation step — the generator never sees raw rows.
//! The builder copies values verbatim: no field is omitted (missing values
//! render as "N/A") and no arithmetic ever happens here.

use crate::types::{Decision, PropertyRecord};

/// Sentinel for an empty retrieval result. Downstream composition treats it
/// as the trigger to fall back to semantic retrieval.
pub const NO_MATCH_SENTINEL: &str = "No properties found matching the criteria.";

/// Build explanation records for a retrieved row set, one block per row in
/// retrieval order. Empty input yields the sentinel.
pub fn build(records: &[PropertyRecord]) -> String {
    if records.is_empty() {
        return NO_MATCH_SENTINEL.to_string();
    }
    records
        .iter()
        .enumerate()
        .map(|(i, record)| build_one(record, i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_one(record: &PropertyRecord, ordinal: usize) -> String {
    format!(
        "--- PROPERTY RECORD {ordinal} ---\n\
         Name: {name}\n\
         Location: {address}\n\
         Size: {area} sqft\n\
         Financials: Price: {price}, Monthly Rent: {rent}\n\
         Analysis Decision: {decision}\n\
         Wealth Difference (Buy vs Rent over 20y): {wealth}\n\
         Monthly EMI: {emi}\n\
         Tax Strategy: {regime} with Total Tax Paid: {tax}\n\
         (Note: This decision comes from a deterministic backend calculation.\n\
         Positive wealth difference favors BUY, negative favors RENT.)\n\
         -------------------------------",
        ordinal = ordinal,
        name = non_empty(&record.name),
        address = non_empty(&record.address),
        area = fmt_f64(record.area),
        price = fmt_f64(record.price),
        rent = fmt_f64(record.rent),
        decision = record.decision.map(|d| d.as_str()).unwrap_or("N/A"),
        wealth = fmt_f64(record.wealth_difference),
        emi = fmt_f64(record.monthly_emi),
        regime = record.chosen_tax_regime.as_deref().unwrap_or("N/A"),
        tax = fmt_f64(record.total_tax_paid),
    )
}

/// Explanation-equivalent text used to seed the knowledge base. Same data,
/// compressed to one entry per property, with the rationale sentence that
/// makes the entry retrievable by decision-flavored queries.
pub fn knowledge_text(record: &PropertyRecord) -> String {
    let decision = record.decision.map(|d| d.as_str()).unwrap_or("N/A");
    format!(
        "Property: {name}\n\
         Location: {address}\n\
         Financials: Price {price}, Rent {rent}, EMI {emi}\n\
         Decision: {decision}\n\
         Wealth Difference: {wealth}\n\
         Tax Regime: {regime}, Tax Paid: {tax}\n\
         Rationale: This property in {address} is calculated to be a {decision}.",
        name = non_empty(&record.name),
        address = non_empty(&record.address),
        price = fmt_f64(record.price),
        rent = fmt_f64(record.rent),
        emi = fmt_f64(record.monthly_emi),
        decision = decision,
        wealth = fmt_f64(record.wealth_difference),
        regime = record.chosen_tax_regime.as_deref().unwrap_or("N/A"),
        tax = fmt_f64(record.total_tax_paid),
    )
}

/// Re-parse the decision field out of a built record block.
pub fn parse_decision(block: &str) -> Option<Decision> {
    block
        .lines()
        .find_map(|line| line.trim().strip_prefix("Analysis Decision: "))
        .and_then(|value| value.trim().parse::<Decision>().ok())
}

fn non_empty(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

fn fmt_f64(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{:.2}", v),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PropertyRecord {
        PropertyRecord {
            name: "Sunrise Towers".into(),
            address: "Action Area I, New Town".into(),
            bedrooms: Some(2),
            area: Some(950.0),
            price: Some(6_500_000.0),
            rent: Some(18_000.0),
            monthly_emi: Some(42_000.0),
            total_tax_paid: Some(310_000.0),
            chosen_tax_regime: Some("new".into()),
            decision: Some(Decision::Buy),
            wealth_difference: Some(1_200_000.0),
        }
    }

    #[test]
    fn test_empty_input_yields_sentinel() {
        assert_eq!(build(&[]), NO_MATCH_SENTINEL);
    }

    #[test]
    fn test_every_field_is_present() {
        let text = build(&[record()]);
        assert!(text.contains("Name: Sunrise Towers"));
        assert!(text.contains("Location: Action Area I, New Town"));
        assert!(text.contains("Size: 950 sqft"));
        assert!(text.contains("Price: 6500000"));
        assert!(text.contains("Monthly Rent: 18000"));
        assert!(text.contains("Analysis Decision: BUY"));
        assert!(text.contains("Wealth Difference (Buy vs Rent over 20y): 1200000"));
        assert!(text.contains("Monthly EMI: 42000"));
        assert!(text.contains("Tax Strategy: new with Total Tax Paid: 310000"));
    }

    #[test]
    fn test_missing_fields_render_as_na_not_omitted() {
        let mut sparse = record();
        sparse.price = None;
        sparse.chosen_tax_regime = None;
        sparse.decision = None;
        let text = build(&[sparse]);
        assert!(text.contains("Price: N/A"));
        assert!(text.contains("Tax Strategy: N/A"));
        assert!(text.contains("Analysis Decision: N/A"));
    }

    #[test]
    fn test_decision_round_trip() {
        let block = build(&[record()]);
        assert_eq!(parse_decision(&block), Some(Decision::Buy));

        let mut renting = record();
        renting.decision = Some(Decision::Rent);
        assert_eq!(parse_decision(&build(&[renting])), Some(Decision::Rent));
    }

    #[test]
    fn test_blocks_keep_retrieval_order() {
        let mut second = record();
        second.name = "Garia Green Residency".into();
        let text = build(&[record(), second]);
        let first_pos = text.find("PROPERTY RECORD 1").unwrap();
        let second_pos = text.find("PROPERTY RECORD 2").unwrap();
        assert!(first_pos < second_pos);
        assert!(text.find("Sunrise Towers").unwrap() < text.find("Garia Green Residency").unwrap());
    }
}
