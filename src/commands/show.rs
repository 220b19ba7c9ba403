use anyhow::{bail, Result};

use supportdesk::db::Database;

pub fn run(db: &Database, id: i64) -> Result<()> {
    let ticket = match db.get_ticket(id)? {
        Some(t) => t,
        None => bail!("Ticket #{} not found", id),
    };

    println!("Ticket #{}: {}", ticket.id, ticket.title);
    println!("Status: {}", ticket.status);
    println!("Category: {}", ticket.category);
    println!("Priority: {}", ticket.priority);
    println!("Created: {}", ticket.created_at.format("%Y-%m-%d %H:%M:%S"));

    println!("\nDescription:");
    for line in ticket.description.lines() {
        println!("  {}", line);
    }

    if let Some(response) = &ticket.ai_response {
        println!("\nAcknowledgement:");
        println!("  {}", response);
    }

    Ok(())
}
