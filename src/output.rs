//! Console rendering for summaries and reporting reads

use tabled::{Table, Tabled};

use crate::bank::Bank;
use crate::loader::LoadSummary;
use crate::storage::DbStats;

#[derive(Tabled)]
struct BankRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Bank")]
    bank: String,
    #[tabled(rename = "App")]
    app: String,
    #[tabled(rename = "Reviews")]
    reviews: usize,
}

#[derive(Tabled)]
struct RatingRow {
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Reviews")]
    count: usize,
}

#[derive(Tabled)]
struct SentimentRow {
    #[tabled(rename = "Sentiment")]
    label: String,
    #[tabled(rename = "Reviews")]
    count: usize,
}

pub fn banks_table(banks: &[(Bank, usize)]) -> String {
    let rows: Vec<BankRow> = banks
        .iter()
        .map(|(bank, count)| BankRow {
            id: bank.bank_id,
            bank: bank.bank_name.clone(),
            app: bank.app_name.clone().unwrap_or_else(|| "-".to_string()),
            reviews: *count,
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn ratings_table(distribution: &[(u8, usize)]) -> String {
    let rows: Vec<RatingRow> = distribution
        .iter()
        .map(|(rating, count)| RatingRow {
            rating: "⭐".repeat(*rating as usize),
            count: *count,
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn sentiment_table(breakdown: &[(Option<String>, usize)]) -> String {
    let rows: Vec<SentimentRow> = breakdown
        .iter()
        .map(|(label, count)| SentimentRow {
            label: label.clone().unwrap_or_else(|| "(unscored)".to_string()),
            count: *count,
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn print_summary(summary: &LoadSummary) {
    println!();
    println!("📊 {}", summary);
    if summary.is_clean() {
        println!("✅ All {} records accounted for, no rejections.", summary.total());
    } else {
        println!(
            "⚠️  {} of {} records rejected (reasons above).",
            summary.rejected.len(),
            summary.total()
        );
    }
}

pub fn print_stats(stats: &DbStats) {
    println!("{}", stats);
}
