#![no_main]

//! Fuzz target for ticket storage and listing.
//!
//! Search terms and ordering strings come straight from query parameters, so
//! arbitrary Unicode, LIKE wildcards and SQL fragments must all be handled.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use supportdesk::db::Database;
use supportdesk::models::{NewTicket, SortKey, TicketFilter};

#[derive(Arbitrary, Debug)]
struct QueryInput {
    title: String,
    description: String,
    search: String,
    ordering: String,
    num_tickets: u8,
}

fuzz_target!(|input: QueryInput| {
    let num_tickets = (input.num_tickets % 10).max(1);

    let db = match Database::open_in_memory() {
        Ok(d) => d,
        Err(_) => return,
    };

    for i in 0..num_tickets {
        let _ = db.create_ticket(&NewTicket {
            title: format!("{} #{}", input.title, i),
            description: input.description.clone(),
            ..Default::default()
        });
    }

    let filter = TicketFilter {
        search: Some(input.search.clone()),
        ordering: SortKey::parse_list(&input.ordering),
        ..Default::default()
    };
    if let Ok(tickets) = db.list_tickets(&filter) {
        assert!(tickets.len() <= num_tickets as usize);
    }

    let _ = db.ticket_stats();
});
