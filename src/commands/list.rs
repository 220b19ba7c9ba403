use anyhow::Result;

use supportdesk::db::Database;
use supportdesk::models::TicketFilter;

pub fn run(db: &Database, filter: &TicketFilter) -> Result<()> {
    let tickets = db.list_tickets(filter)?;

    if tickets.is_empty() {
        println!("No tickets found.");
        return Ok(());
    }

    for ticket in tickets {
        let status_display = format!("[{}]", ticket.status);
        let date = ticket.created_at.format("%Y-%m-%d");
        println!(
            "#{:<4} {:13} {:<40} {:9} {:8} {}",
            ticket.id,
            status_display,
            truncate(&ticket.title, 40),
            ticket.category,
            ticket.priority,
            date
        );
    }

    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use supportdesk::models::{Category, NewTicket, Status};

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("short", 40), "short");
    }

    #[test]
    fn test_truncate_multibyte() {
        let s = "日本語のチケットタイトルです";
        let out = truncate(s, 8);
        assert_eq!(out.chars().count(), 8);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_run_empty_and_filtered() {
        let db = Database::open_in_memory().unwrap();
        assert!(run(&db, &TicketFilter::default()).is_ok());

        db.create_ticket(&NewTicket {
            title: "Refund".to_string(),
            description: "Charged twice".to_string(),
            category: Some(Category::Billing),
            ..Default::default()
        })
        .unwrap();

        let filter = TicketFilter {
            status: Some(Status::Open),
            ..Default::default()
        };
        assert!(run(&db, &filter).is_ok());
    }

    proptest! {
        #[test]
        fn prop_truncate_never_exceeds(s in "\\PC{0,100}", max in 3usize..50) {
            prop_assert!(truncate(&s, max).chars().count() <= max);
        }
    }
}
