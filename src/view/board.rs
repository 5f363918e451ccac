//! Kanban grouping for the deals board.

use rust_decimal::Decimal;

use crate::crm::types::{Deal, DealStage};

#[derive(Debug)]
pub struct BoardColumn<'a> {
    pub stage: DealStage,
    pub deals: Vec<&'a Deal>,
}

impl BoardColumn<'_> {
    pub fn total_value(&self) -> Decimal {
        self.deals
            .iter()
            .fold(Decimal::ZERO, |acc, deal| acc + deal.value)
    }
}

/// Partition deals into the fixed board columns, preserving input order
/// inside each column.
///
/// A deal whose stage is not one of [`DealStage::BOARD`] lands in no column
/// at all — the board simply does not show it.
pub fn group_by_stage(deals: &[Deal]) -> Vec<BoardColumn<'_>> {
    DealStage::BOARD
        .into_iter()
        .map(|stage| BoardColumn {
            stage,
            deals: deals.iter().filter(|deal| deal.stage == stage).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;

    fn deal(id: &str, stage: DealStage, value: Decimal) -> Deal {
        Deal {
            id: id.to_string(),
            owner_id: "u-1".into(),
            title: id.to_string(),
            description: String::new(),
            value,
            stage,
            probability: 50,
            expected_close_date: None,
            lead_id: None,
            client_id: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn every_stage_gets_a_column_even_when_empty() {
        let columns = group_by_stage(&[]);
        assert_eq!(columns.len(), DealStage::BOARD.len());
        assert!(columns.iter().all(|c| c.deals.is_empty()));
    }

    #[test]
    fn deal_appears_only_in_its_stage_column() {
        let deals = vec![
            deal("d-1", DealStage::New, dec!(100)),
            deal("d-2", DealStage::ClosedWon, dec!(1000)),
        ];
        let columns = group_by_stage(&deals);
        for column in &columns {
            let expected = match column.stage {
                DealStage::New => vec!["d-1"],
                DealStage::ClosedWon => vec!["d-2"],
                _ => vec![],
            };
            let got: Vec<&str> = column.deals.iter().map(|d| d.id.as_str()).collect();
            assert_eq!(got, expected, "stage {:?}", column.stage);
        }
    }

    #[test]
    fn unknown_stage_is_omitted_from_every_column() {
        let deals = vec![
            deal("d-1", DealStage::Unknown, dec!(100)),
            deal("d-2", DealStage::New, dec!(50)),
        ];
        let columns = group_by_stage(&deals);
        let shown: usize = columns.iter().map(|c| c.deals.len()).sum();
        assert_eq!(shown, 1);
    }

    #[test]
    fn column_total_sums_deal_values() {
        let deals = vec![
            deal("d-1", DealStage::New, dec!(100.50)),
            deal("d-2", DealStage::New, dec!(49.50)),
        ];
        let columns = group_by_stage(&deals);
        assert_eq!(columns[0].total_value(), dec!(150.00));
    }
}
