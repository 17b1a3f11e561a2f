use chrono::{NaiveDate, NaiveTime};

use super::sendmail::{MailError, Mailer};

const AGENT_CONTACT_TEMPLATE: &str = include_str!("templates/agent-contact.html");
const CONTACT_MESSAGE_TEMPLATE: &str = include_str!("templates/contact-message.html");
const VISIT_REQUEST_TEMPLATE: &str = include_str!("templates/visit-request.html");
const VISIT_CONFIRMATION_TEMPLATE: &str = include_str!("templates/visit-confirmation.html");
const LOW_RATING_TEMPLATE: &str = include_str!("templates/low-rating.html");
const RESPONSE_TEMPLATE: &str = include_str!("templates/response.html");

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("-")
        .to_string()
}

pub fn format_visit_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn format_visit_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub struct AgentContactEmail<'a> {
    pub agent_name: &'a str,
    pub client_name: &'a str,
    pub client_email: &'a str,
    pub client_phone: Option<&'a str>,
    pub message: &'a str,
    pub property_title: Option<&'a str>,
}

pub async fn send_agent_contact_email(
    mailer: &Mailer,
    to_email: &str,
    app_url: &str,
    email: AgentContactEmail<'_>,
) -> Result<(), MailError> {
    let subject = format!("Nuevo contacto de {}", email.client_name);
    let property_line = email
        .property_title
        .map(|title| format!(" sobre la propiedad \"{}\"", title))
        .unwrap_or_default();
    let placeholders = vec![
        ("agent_name", email.agent_name.to_string()),
        ("client_name", email.client_name.to_string()),
        ("client_email", email.client_email.to_string()),
        ("client_phone", or_dash(email.client_phone)),
        ("message", email.message.to_string()),
        ("property_line", property_line),
        ("dashboard_link", format!("{}/dashboard/agent", app_url)),
    ];

    mailer
        .send_email(to_email, &subject, AGENT_CONTACT_TEMPLATE, &placeholders)
        .await
}

pub async fn send_contact_message_email(
    mailer: &Mailer,
    office_inbox: &str,
    name: &str,
    email: &str,
    phone: Option<&str>,
    subject: Option<&str>,
    message: &str,
) -> Result<(), MailError> {
    let mail_subject = format!(
        "Contacto web: {}",
        subject.filter(|s| !s.trim().is_empty()).unwrap_or("Sin asunto")
    );
    let placeholders = vec![
        ("name", name.to_string()),
        ("email", email.to_string()),
        ("phone", or_dash(phone)),
        ("subject", or_dash(subject)),
        ("message", message.to_string()),
    ];

    mailer
        .send_email(office_inbox, &mail_subject, CONTACT_MESSAGE_TEMPLATE, &placeholders)
        .await
}

pub struct VisitEmail<'a> {
    pub visitor_name: &'a str,
    pub visitor_email: &'a str,
    pub visitor_phone: Option<&'a str>,
    pub property_title: &'a str,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub message: Option<&'a str>,
}

pub async fn send_visit_request_email(
    mailer: &Mailer,
    agent_email: &str,
    agent_name: &str,
    app_url: &str,
    visit: &VisitEmail<'_>,
) -> Result<(), MailError> {
    let subject = format!("Solicitud de visita: {}", visit.property_title);
    let placeholders = vec![
        ("agent_name", agent_name.to_string()),
        ("visitor_name", visit.visitor_name.to_string()),
        ("visitor_email", visit.visitor_email.to_string()),
        ("visitor_phone", or_dash(visit.visitor_phone)),
        ("property_title", visit.property_title.to_string()),
        ("visit_date", format_visit_date(visit.date)),
        ("visit_time", format_visit_time(visit.time)),
        ("message", or_dash(visit.message)),
        ("dashboard_link", format!("{}/dashboard/agent", app_url)),
    ];

    mailer
        .send_email(agent_email, &subject, VISIT_REQUEST_TEMPLATE, &placeholders)
        .await
}

pub async fn send_visit_confirmation_email(
    mailer: &Mailer,
    visit: &VisitEmail<'_>,
) -> Result<(), MailError> {
    let subject = "Tu solicitud de visita fue recibida";
    let placeholders = vec![
        ("visitor_name", visit.visitor_name.to_string()),
        ("property_title", visit.property_title.to_string()),
        ("visit_date", format_visit_date(visit.date)),
        ("visit_time", format_visit_time(visit.time)),
    ];

    mailer
        .send_email(visit.visitor_email, subject, VISIT_CONFIRMATION_TEMPLATE, &placeholders)
        .await
}

pub async fn send_low_rating_email(
    mailer: &Mailer,
    to_email: &str,
    app_url: &str,
    agent_name: &str,
    rating: i16,
    reviewer_name: Option<&str>,
    comment: Option<&str>,
) -> Result<(), MailError> {
    let subject = format!("Calificación baja para {}", agent_name);
    let placeholders = vec![
        ("agent_name", agent_name.to_string()),
        ("rating", rating.to_string()),
        ("reviewer_name", reviewer_name.unwrap_or("un cliente").to_string()),
        ("comment", or_dash(comment)),
        ("dashboard_link", format!("{}/dashboard", app_url)),
    ];

    mailer
        .send_email(to_email, &subject, LOW_RATING_TEMPLATE, &placeholders)
        .await
}

pub async fn send_response_email(
    mailer: &Mailer,
    to_email: &str,
    subject: &str,
    recipient_name: Option<&str>,
    message: &str,
) -> Result<(), MailError> {
    let placeholders = vec![
        ("recipient_name", recipient_name.unwrap_or("cliente").to_string()),
        ("message", message.to_string()),
    ];

    mailer
        .send_email(to_email, subject, RESPONSE_TEMPLATE, &placeholders)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::sendmail::render_template;

    #[test]
    fn visit_dates_use_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let time = NaiveTime::from_hms_opt(9, 5, 0).unwrap();
        assert_eq!(format_visit_date(date), "07/03/2026");
        assert_eq!(format_visit_time(time), "09:05");
    }

    #[test]
    fn templates_contain_every_placeholder_they_are_filled_with() {
        let html = render_template(
            VISIT_REQUEST_TEMPLATE,
            &[
                ("agent_name", "Marta".to_string()),
                ("visitor_name", "Pablo".to_string()),
                ("visitor_email", "pablo@example.com".to_string()),
                ("visitor_phone", "-".to_string()),
                ("property_title", "Casa".to_string()),
                ("visit_date", "07/03/2026".to_string()),
                ("visit_time", "09:05".to_string()),
                ("message", "-".to_string()),
                ("dashboard_link", "x".to_string()),
            ],
        );
        assert!(!html.contains("{{"));
        assert!(html.contains("Marta"));
    }

    #[test]
    fn blank_optional_fields_render_as_dash() {
        assert_eq!(or_dash(Some("  ")), "-");
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("555")), "555");
    }
}
