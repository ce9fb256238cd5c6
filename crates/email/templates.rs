use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Everything the booking emails need about a confirmed session.
#[derive(Debug, Clone)]
pub struct SessionDetails {
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub mentor_name: String,
    pub session_label: String,
    pub duration_minutes: u32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub meet_link: Option<String>,
    /// Whole rupees.
    pub price: i32,
}

#[derive(Debug, Clone)]
pub struct ReceiptDetails {
    pub user_name: String,
    pub invoice_id: String,
    pub order_id: String,
    pub payment_id: String,
    /// Paise.
    pub amount: i64,
    pub payment_method: String,
    pub paid_at: DateTime<Utc>,
    pub mentor_name: String,
    pub session_label: String,
}

#[derive(Debug, Clone, Default)]
pub struct BroadcastContent {
    pub subject: Option<String>,
    pub heading: Option<String>,
    pub body: Option<String>,
    pub cta_label: Option<String>,
    pub cta_url: Option<String>,
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Multi-line admin text becomes paragraphs.
fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p).replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn layout(heading: &str, inner: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #1f2937; max-width: 600px; margin: 0 auto;">
<h2 style="color: #4f46e5;">{heading}</h2>
{inner}
<p style="color: #6b7280; font-size: 12px;">Campus Connect</p>
</body>
</html>"#,
        heading = escape_html(heading),
    )
}

fn button(label: &str, url: &str) -> String {
    format!(
        r#"<p><a href="{}" style="background: #4f46e5; color: #ffffff; padding: 10px 18px; border-radius: 6px; text-decoration: none;">{}</a></p>"#,
        escape_html(url),
        escape_html(label)
    )
}

fn rupees(paise: i64) -> String {
    format!("₹{}.{:02}", paise / 100, paise % 100)
}

fn session_rows(details: &SessionDetails) -> String {
    format!(
        "<table cellpadding=\"4\">\n\
         <tr><td>Session</td><td>{} ({} min)</td></tr>\n\
         <tr><td>Date</td><td>{}</td></tr>\n\
         <tr><td>Time</td><td>{} - {}</td></tr>\n\
         <tr><td>Price</td><td>₹{}</td></tr>\n\
         </table>",
        escape_html(&details.session_label),
        details.duration_minutes,
        details.date.format("%A, %d %B %Y"),
        details.start_time.format("%I:%M %p"),
        details.end_time.format("%I:%M %p"),
        details.price,
    )
}

fn meet_link_block(meet_link: Option<&str>) -> String {
    match meet_link.filter(|link| !link.trim().is_empty()) {
        Some(link) => button("Join Google Meet", link),
        None => "<p>Your mentor will share the meeting link before the session.</p>".to_string(),
    }
}

pub fn booking_confirmation(details: &SessionDetails) -> RenderedEmail {
    let inner = format!(
        "<p>Hi {},</p>\n<p>Your session with <strong>{}</strong> is confirmed.</p>\n{}\n{}",
        escape_html(&details.user_name),
        escape_html(&details.mentor_name),
        session_rows(details),
        meet_link_block(details.meet_link.as_deref()),
    );

    RenderedEmail {
        subject: format!("Your session with {} is confirmed", details.mentor_name),
        html: layout("Booking confirmed", &inner),
    }
}

pub fn mentor_notification(details: &SessionDetails) -> RenderedEmail {
    let phone = details
        .user_phone
        .as_deref()
        .map(|phone| format!("<tr><td>Phone</td><td>{}</td></tr>\n", escape_html(phone)))
        .unwrap_or_default();

    let inner = format!(
        "<p>Hi {},</p>\n<p>A student booked a session with you.</p>\n\
         <table cellpadding=\"4\">\n\
         <tr><td>Student</td><td>{}</td></tr>\n\
         <tr><td>Email</td><td>{}</td></tr>\n\
         {}</table>\n{}\n{}",
        escape_html(&details.mentor_name),
        escape_html(&details.user_name),
        escape_html(&details.user_email),
        phone,
        session_rows(details),
        meet_link_block(details.meet_link.as_deref()),
    );

    RenderedEmail {
        subject: format!(
            "New booking: {} on {}",
            details.user_name,
            details.date.format("%d %b %Y")
        ),
        html: layout("New session booked", &inner),
    }
}

pub fn payment_receipt(receipt: &ReceiptDetails) -> RenderedEmail {
    let inner = format!(
        "<p>Hi {},</p>\n<p>Thanks for your payment. Keep this receipt for your records.</p>\n\
         <table cellpadding=\"4\">\n\
         <tr><td>Invoice</td><td>{}</td></tr>\n\
         <tr><td>Session</td><td>{} with {}</td></tr>\n\
         <tr><td>Amount</td><td>{}</td></tr>\n\
         <tr><td>Paid via</td><td>{}</td></tr>\n\
         <tr><td>Order ID</td><td>{}</td></tr>\n\
         <tr><td>Payment ID</td><td>{}</td></tr>\n\
         <tr><td>Date</td><td>{}</td></tr>\n\
         </table>",
        escape_html(&receipt.user_name),
        escape_html(&receipt.invoice_id),
        escape_html(&receipt.session_label),
        escape_html(&receipt.mentor_name),
        rupees(receipt.amount),
        escape_html(&receipt.payment_method),
        escape_html(&receipt.order_id),
        escape_html(&receipt.payment_id),
        receipt.paid_at.format("%d %b %Y %H:%M UTC"),
    );

    RenderedEmail {
        subject: format!("Payment receipt {}", receipt.invoice_id),
        html: layout("Payment receipt", &inner),
    }
}

pub fn nsat_request_received(student_name: &str, registration_id: &str) -> RenderedEmail {
    let inner = format!(
        "<p>Hi {},</p>\n<p>We received your free session request for NSAT registration <strong>{}</strong>. \
         Our team will review it and get back to you shortly.</p>",
        escape_html(student_name),
        escape_html(registration_id),
    );

    RenderedEmail {
        subject: "We received your NSAT free session request".to_string(),
        html: layout("Request received", &inner),
    }
}

pub fn nsat_approval(student_name: &str, referral_code: &str, site_url: &str) -> RenderedEmail {
    let inner = format!(
        "<p>Hi {},</p>\n<p>Your NSAT free session request is approved. Use this code at checkout \
         to book a session for free:</p>\n\
         <p style=\"font-size: 22px; letter-spacing: 2px;\"><strong>{}</strong></p>\n\
         <p>The code works once.</p>\n{}",
        escape_html(student_name),
        escape_html(referral_code),
        button("Book your session", &format!("{}/mentors", site_url.trim_end_matches('/'))),
    );

    RenderedEmail {
        subject: "Your free Campus Connect session is approved".to_string(),
        html: layout("Request approved", &inner),
    }
}

pub fn nsat_rejection(student_name: &str, admin_note: Option<&str>) -> RenderedEmail {
    let note = admin_note
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(|note| format!("\n<p>Note from our team: {}</p>", escape_html(note)))
        .unwrap_or_default();

    let inner = format!(
        "<p>Hi {},</p>\n<p>We could not approve your NSAT free session request.</p>{}\n\
         <p>You can still book a paid session any time.</p>",
        escape_html(student_name),
        note,
    );

    RenderedEmail {
        subject: "Update on your NSAT free session request".to_string(),
        html: layout("Request not approved", &inner),
    }
}

pub fn promotional(content: &BroadcastContent, site_url: &str) -> RenderedEmail {
    let heading = content
        .heading
        .clone()
        .unwrap_or_else(|| "Talk to a student from your dream college".to_string());
    let body = content.body.clone().unwrap_or_else(|| {
        "Book a 1:1 video session with mentors from top colleges and get honest answers \
         about admissions, campus life and placements."
            .to_string()
    });
    let cta_label = content
        .cta_label
        .clone()
        .unwrap_or_else(|| "Browse mentors".to_string());
    let cta_url = content
        .cta_url
        .clone()
        .unwrap_or_else(|| format!("{}/mentors", site_url.trim_end_matches('/')));

    RenderedEmail {
        subject: content.subject.clone().unwrap_or_else(|| heading.clone()),
        html: layout(&heading, &format!("{}\n{}", paragraphs(&body), button(&cta_label, &cta_url))),
    }
}

/// Subject and body are required for custom mail; callers validate that.
pub fn custom(subject: &str, content: &BroadcastContent) -> RenderedEmail {
    let heading = content.heading.clone().unwrap_or_else(|| subject.to_string());
    let mut inner = paragraphs(content.body.as_deref().unwrap_or_default());
    if let (Some(label), Some(url)) = (content.cta_label.as_deref(), content.cta_url.as_deref()) {
        inner.push('\n');
        inner.push_str(&button(label, url));
    }

    RenderedEmail {
        subject: subject.to_string(),
        html: layout(&heading, &inner),
    }
}

pub fn mentor_onboarding(mentor_name: Option<&str>, site_url: &str) -> RenderedEmail {
    let greeting = mentor_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(escape_html)
        .unwrap_or_else(|| "there".to_string());

    let inner = format!(
        "<p>Hi {},</p>\n<p>Welcome to Campus Connect as a mentor. Sign in to your dashboard to \
         add your availability, set your meeting link and complete your profile.</p>\n{}",
        greeting,
        button(
            "Open mentor dashboard",
            &format!("{}/mentor/dashboard", site_url.trim_end_matches('/'))
        ),
    );

    RenderedEmail {
        subject: "Welcome to Campus Connect".to_string(),
        html: layout("Welcome aboard", &inner),
    }
}
