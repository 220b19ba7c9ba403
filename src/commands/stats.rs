use anyhow::Result;

use supportdesk::db::Database;
use supportdesk::models::{Category, Priority, TicketStats};

pub fn run(db: &Database, json: bool) -> Result<()> {
    let stats = db.ticket_stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", render(&stats));
    }
    Ok(())
}

fn render(stats: &TicketStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total tickets:   {}\n", stats.total_tickets));
    out.push_str(&format!("Open tickets:    {}\n", stats.open_tickets));
    out.push_str(&format!("Avg per day:     {:.1}\n", stats.avg_tickets_per_day));

    out.push_str("\nBy priority:\n");
    for priority in Priority::ALL {
        let count = match priority {
            Priority::Low => stats.priority_breakdown.low,
            Priority::Medium => stats.priority_breakdown.medium,
            Priority::High => stats.priority_breakdown.high,
            Priority::Critical => stats.priority_breakdown.critical,
        };
        out.push_str(&format!("  {:<10} {}\n", priority, count));
    }

    out.push_str("\nBy category:\n");
    for category in Category::ALL {
        let count = match category {
            Category::Billing => stats.category_breakdown.billing,
            Category::Technical => stats.category_breakdown.technical,
            Category::Account => stats.category_breakdown.account,
            Category::General => stats.category_breakdown.general,
        };
        out.push_str(&format!("  {:<10} {}\n", category, count));
    }
    out
}
