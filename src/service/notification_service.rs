// service/notification_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{db::DBClient, profiledb::ProfileExt},
    mail::{
        mails::{
            send_agent_contact_email, send_contact_message_email, send_low_rating_email,
            send_visit_confirmation_email, send_visit_request_email, AgentContactEmail, VisitEmail,
        },
        sendmail::Mailer,
    },
    models::{
        leadmodel::{AgentLead, ContactMessage, Review, Visit},
        profilemodel::{Profile, Role},
    },
    service::error::ServiceError,
};

/// Ratings at or below this value alert the agent and the office staff.
pub const LOW_RATING_THRESHOLD: i16 = 2;

pub fn is_low_rating(rating: i16) -> bool {
    rating <= LOW_RATING_THRESHOLD
}

/// Agent first, then each staff member once.
pub fn low_rating_recipients(agent_id: Uuid, staff_ids: &[Uuid]) -> Vec<Uuid> {
    let mut recipients = vec![agent_id];
    for id in staff_ids {
        if !recipients.contains(id) {
            recipients.push(*id);
        }
    }
    recipients
}

pub struct LowRating<'a> {
    pub review_id: Option<Uuid>,
    pub agent_id: Uuid,
    pub rating: i16,
    pub reviewer_name: Option<&'a str>,
    pub comment: Option<&'a str>,
}

impl<'a> From<&'a Review> for LowRating<'a> {
    fn from(review: &'a Review) -> Self {
        LowRating {
            review_id: Some(review.id),
            agent_id: review.agent_id,
            rating: review.rating,
            reviewer_name: Some(&review.reviewer_name),
            comment: review.comment.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
    mailer: Arc<Mailer>,
    app_url: String,
    office_inbox: String,
}

impl NotificationService {
    pub fn new(
        db_client: Arc<DBClient>,
        mailer: Arc<Mailer>,
        app_url: String,
        office_inbox: String,
    ) -> Self {
        Self {
            db_client,
            mailer,
            app_url,
            office_inbox,
        }
    }

    pub async fn notify_agent_contact(
        &self,
        agent: &Profile,
        lead: &AgentLead,
        property_title: Option<&str>,
    ) -> Result<(), ServiceError> {
        tracing::info!("Agent contact: lead {} for agent {}", lead.id, agent.id);

        self.db_client
            .create_notification(
                agent.id,
                "agent_contact",
                "Nuevo contacto",
                &format!("{} quiere contactarte", lead.full_name),
                Some(lead.id),
            )
            .await?;

        if let Some(agent_email) = agent.email.as_deref() {
            let email = AgentContactEmail {
                agent_name: &agent.full_name,
                client_name: &lead.full_name,
                client_email: &lead.email,
                client_phone: lead.phone.as_deref(),
                message: &lead.message,
                property_title,
            };
            if let Err(e) = send_agent_contact_email(&self.mailer, agent_email, &self.app_url, email).await {
                tracing::warn!("Agent contact email for lead {} not sent: {}", lead.id, e);
            }
        }

        Ok(())
    }

    pub async fn notify_visit_requested(
        &self,
        agent: &Profile,
        visit: &Visit,
        property_title: &str,
    ) -> Result<(), ServiceError> {
        self.db_client
            .create_notification(
                agent.id,
                "visit_requested",
                "Solicitud de visita",
                &format!(
                    "{} quiere visitar {} el {}",
                    visit.visitor_name, property_title, visit.visit_date
                ),
                Some(visit.id),
            )
            .await?;

        let email = VisitEmail {
            visitor_name: &visit.visitor_name,
            visitor_email: &visit.visitor_email,
            visitor_phone: visit.visitor_phone.as_deref(),
            property_title,
            date: visit.visit_date,
            time: visit.visit_time,
            message: visit.message.as_deref(),
        };

        if let Some(agent_email) = agent.email.as_deref() {
            if let Err(e) =
                send_visit_request_email(&self.mailer, agent_email, &agent.full_name, &self.app_url, &email).await
            {
                tracing::warn!("Visit request email for {} not sent: {}", visit.id, e);
            }
        }

        if let Err(e) = send_visit_confirmation_email(&self.mailer, &email).await {
            tracing::warn!("Visit confirmation email for {} not sent: {}", visit.id, e);
        }

        Ok(())
    }

    /// Relays a contact-form message to the office inbox. Returns whether the
    /// email went out; the message itself is already stored.
    pub async fn relay_contact_message(&self, message: &ContactMessage) -> bool {
        match send_contact_message_email(
            &self.mailer,
            &self.office_inbox,
            &message.full_name,
            &message.email,
            message.phone.as_deref(),
            message.subject.as_deref(),
            &message.message,
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Contact message {} not relayed: {}", message.id, e);
                false
            }
        }
    }

    /// Returns the number of users notified; zero when the rating is not low.
    pub async fn notify_low_rating(&self, low_rating: LowRating<'_>) -> Result<usize, ServiceError> {
        if !is_low_rating(low_rating.rating) {
            return Ok(0);
        }

        let agent = self
            .db_client
            .get_profile(low_rating.agent_id)
            .await?
            .ok_or(ServiceError::ProfileNotFound(low_rating.agent_id))?;

        let staff_ids = self.db_client.get_user_ids_with_roles(&Role::STAFF).await?;
        let recipients = low_rating_recipients(agent.id, &staff_ids);

        let title = "Calificación baja";
        let message = format!(
            "{} recibió {} de 5 estrellas",
            agent.full_name, low_rating.rating
        );

        for user_id in &recipients {
            self.db_client
                .create_notification(*user_id, "low_rating", title, &message, low_rating.review_id)
                .await?;
        }

        if let Some(agent_email) = agent.email.as_deref() {
            if let Err(e) = send_low_rating_email(
                &self.mailer,
                agent_email,
                &self.app_url,
                &agent.full_name,
                low_rating.rating,
                low_rating.reviewer_name,
                low_rating.comment,
            )
            .await
            {
                tracing::warn!("Low rating email for agent {} not sent: {}", agent.id, e);
            }
        }

        tracing::info!(
            "Low rating {} for agent {} sent to {} user(s)",
            low_rating.rating,
            agent.id,
            recipients.len()
        );

        Ok(recipients.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_two_stars() {
        assert!(is_low_rating(1));
        assert!(is_low_rating(2));
        assert!(!is_low_rating(3));
        assert!(!is_low_rating(5));
    }

    #[test]
    fn recipients_start_with_agent_and_skip_duplicates() {
        let agent = Uuid::new_v4();
        let manager = Uuid::new_v4();
        let recipients = low_rating_recipients(agent, &[manager, agent, manager]);
        assert_eq!(recipients, vec![agent, manager]);
    }

    #[tokio::test]
    async fn high_rating_touches_nothing() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let service = NotificationService::new(
            Arc::new(DBClient::new(pool)),
            Arc::new(Mailer::new(None, "x@example.com".into(), std::time::Duration::from_secs(1))),
            "http://localhost:5173".into(),
            "contacto@example.com".into(),
        );

        let notified = service
            .notify_low_rating(LowRating {
                review_id: None,
                agent_id: Uuid::new_v4(),
                rating: 4,
                reviewer_name: None,
                comment: None,
            })
            .await
            .unwrap();
        assert_eq!(notified, 0);
    }
}
