//! Email bodies (plain text + minimal HTML)

use chrono_tz::Tz;
use shared::models::{Event, Order, OrderLine, Reservation, Ticket, TicketOrder};

use super::OutgoingEmail;
use crate::util::format_cents;

const BRAND: &str = "Trattoria";

/// Format Unix millis as a local date/time in the restaurant timezone
pub fn format_local(ts_ms: i64, tz: Tz) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.with_timezone(&tz).format("%A %-d %B %Y, %H:%M").to_string())
        .unwrap_or_default()
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn wrap_html(title: &str, inner: &str) -> String {
    format!(
        "<!doctype html><html><body style=\"font-family:Georgia,serif;color:#2b2118\">\
         <h2>{}</h2>{inner}<p style=\"color:#8a7d6b\">{BRAND}</p></body></html>",
        escape_html(title)
    )
}

pub fn verification_code(to: &str, code: &str, ttl_minutes: i64) -> OutgoingEmail {
    let subject = format!("{BRAND}: your verification code");
    let text = format!(
        "Your verification code is: {code}\n\
         It is valid for {ttl_minutes} minutes.\n\n\
         If you did not request this code you can ignore this email."
    );
    let html = wrap_html(
        "Your verification code",
        &format!(
            "<p style=\"font-size:28px;letter-spacing:6px\"><strong>{code}</strong></p>\
             <p>Valid for {ttl_minutes} minutes.</p>"
        ),
    );
    OutgoingEmail {
        to: to.to_string(),
        subject,
        text,
        html: Some(html),
    }
}

pub fn reservation_confirmation(r: &Reservation, tz: Tz, site_url: &str) -> OutgoingEmail {
    let when = format_local(r.starts_at, tz);
    let cancel_url = format!("{site_url}/reservations/{}/cancel", r.id);
    let subject = format!("{BRAND}: table for {} confirmed", r.party_size);
    let mut text = format!(
        "Dear {name},\n\n\
         your table for {party} is confirmed for {when}.\n\
         Reservation number: {id}\n",
        name = r.name,
        party = r.party_size,
        id = r.id,
    );
    if let Some(notes) = &r.notes {
        text.push_str(&format!("Notes: {notes}\n"));
    }
    text.push_str(&format!("\nNeed to cancel? {cancel_url}\n"));

    let html = wrap_html(
        "Reservation confirmed",
        &format!(
            "<p>Dear {name},</p><p>your table for <strong>{party}</strong> is confirmed for \
             <strong>{when}</strong>.</p><p>Reservation number: {id}</p>\
             <p><a href=\"{url}\">Cancel reservation</a></p>",
            name = escape_html(&r.name),
            party = r.party_size,
            when = escape_html(&when),
            id = r.id,
            url = escape_html(&cancel_url),
        ),
    );
    OutgoingEmail {
        to: r.email.clone(),
        subject,
        text,
        html: Some(html),
    }
}

pub fn reservation_cancellation(r: &Reservation, tz: Tz) -> OutgoingEmail {
    let when = format_local(r.starts_at, tz);
    let text = format!(
        "Dear {name},\n\nyour reservation {id} for {when} has been cancelled.\n\
         We hope to welcome you another time.\n",
        name = r.name,
        id = r.id,
    );
    let html = wrap_html(
        "Reservation cancelled",
        &format!(
            "<p>Dear {},</p><p>your reservation {} for {} has been cancelled.</p>",
            escape_html(&r.name),
            r.id,
            escape_html(&when)
        ),
    );
    OutgoingEmail {
        to: r.email.clone(),
        subject: format!("{BRAND}: reservation cancelled"),
        text,
        html: Some(html),
    }
}

pub fn ticket_delivery(
    order: &TicketOrder,
    event: &Event,
    tickets: &[Ticket],
    tz: Tz,
    currency: &str,
) -> OutgoingEmail {
    let when = format_local(event.starts_at, tz);
    let codes: Vec<&str> = tickets.iter().map(|t| t.code.as_str()).collect();
    let total = format!("{} {}", format_cents(order.total_cents), currency.to_uppercase());

    let text = format!(
        "Dear {name},\n\n\
         thank you for your purchase. Your tickets for \"{title}\" ({when}):\n\n\
         {codes}\n\n\
         Quantity: {qty}\nTotal paid: {total}\n\n\
         Show these codes at the entrance.\n",
        name = order.name,
        title = event.title,
        codes = codes.join("\n"),
        qty = order.quantity,
    );

    let items: String = codes
        .iter()
        .map(|c| format!("<li><code>{}</code></li>", escape_html(c)))
        .collect();
    let html = wrap_html(
        &event.title,
        &format!(
            "<p>Dear {name},</p><p>{when}</p><ul>{items}</ul>\
             <p>Quantity: {qty}<br>Total paid: {total}</p>\
             <p>Show these codes at the entrance.</p>",
            name = escape_html(&order.name),
            when = escape_html(&when),
            qty = order.quantity,
            total = escape_html(&total),
        ),
    );

    OutgoingEmail {
        to: order.email.clone(),
        subject: format!("{BRAND}: your tickets for {}", event.title),
        text,
        html: Some(html),
    }
}

pub fn order_confirmation(
    order: &Order,
    lines: &[OrderLine],
    tz: Tz,
    currency: &str,
) -> OutgoingEmail {
    let cur = currency.to_uppercase();
    let mut text = format!(
        "Dear {},\n\nwe received your payment for order {}.\n\n",
        order.customer_name, order.id
    );
    let mut rows = String::new();
    for line in lines {
        text.push_str(&format!(
            "{} x {}  {} {cur}\n",
            line.quantity,
            line.name,
            format_cents(line.line_total_cents())
        ));
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td style=\"text-align:right\">{} {cur}</td></tr>",
            line.quantity,
            escape_html(&line.name),
            format_cents(line.line_total_cents())
        ));
    }
    text.push_str(&format!("\nTotal: {} {cur}\n", format_cents(order.total_cents)));
    if let Some(pickup) = order.pickup_at {
        text.push_str(&format!("Pickup: {}\n", format_local(pickup, tz)));
    }

    let html = wrap_html(
        "Order confirmed",
        &format!(
            "<p>Dear {},</p><table>{rows}</table><p><strong>Total: {} {cur}</strong></p>",
            escape_html(&order.customer_name),
            format_cents(order.total_cents)
        ),
    );

    OutgoingEmail {
        to: order.email.clone(),
        subject: format!("{BRAND}: order {} confirmed", order.id),
        text,
        html: Some(html),
    }
}
